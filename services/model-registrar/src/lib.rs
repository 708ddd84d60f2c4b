//! Registers a finished run's logged model as a new model version.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mlreg_core::{
    load_config_from, AwaitPolicy, ModelUri, ModelVersion, ModelVersionTag, RegisterOptions, RegistrarConfig,
    TrackingClient,
};

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "model-registrar")]
#[command(version = "0.1.0")]
#[command(about = "Register a run's model artifact as a new model version", long_about = None)]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON); same as MLREG_CONFIG_FILE
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tracking server address, e.g. http://127.0.0.1:5000
    #[arg(long)]
    pub tracking_uri: Option<String>,

    /// Registered model name
    #[arg(short = 'm', long)]
    pub model_name: Option<String>,

    /// Run whose logged model becomes the new version
    #[arg(short = 'r', long)]
    pub run_id: Option<String>,

    /// Path of the model inside the run's artifacts
    #[arg(long)]
    pub artifact_path: Option<String>,

    /// Version tag as key=value (repeatable)
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Link back to the run in the tracking UI
    #[arg(long)]
    pub run_link: Option<String>,

    /// Create the registered model first if it does not exist
    #[arg(long)]
    pub create_model: bool,

    /// Seconds to wait for the version to become READY (0 disables)
    #[arg(long)]
    pub await_timeout: Option<u64>,

    /// Print the created version as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Overlay command-line values on the loaded configuration.
    pub fn apply(&self, mut cfg: RegistrarConfig) -> RegistrarConfig {
        if let Some(v) = &self.tracking_uri { cfg.tracking_uri = v.clone(); }
        if let Some(v) = &self.model_name { cfg.model_name = v.clone(); }
        if let Some(v) = &self.run_id { cfg.run_id = Some(v.clone()); }
        if let Some(v) = &self.artifact_path { cfg.artifact_path = v.clone(); }
        if let Some(v) = self.await_timeout { cfg.await_timeout_secs = v; }
        cfg
    }

    pub fn register_options(&self, cfg: &RegistrarConfig) -> Result<RegisterOptions> {
        let run_id = cfg
            .run_id
            .clone()
            .context("no run id given: pass --run-id or set MLREG__RUN_ID")?;
        let mut opts = RegisterOptions::new(cfg.model_name.clone(), run_id);
        opts.artifact_path = cfg.artifact_path.clone();
        opts.tags = self
            .tags
            .iter()
            .map(|t| ModelVersionTag::parse(t))
            .collect::<Result<_, _>>()?;
        opts.description = self.description.clone();
        opts.run_link = self.run_link.clone();
        opts.create_model = self.create_model;
        opts.await_policy = AwaitPolicy { timeout: cfg.await_timeout(), poll_interval: cfg.poll_interval() };
        Ok(opts)
    }
}

/// Configuration from the process environment, with `--config` standing in for `MLREG_CONFIG_FILE`.
pub fn load(cli: &Cli) -> Result<RegistrarConfig> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    if let Some(path) = &cli.config {
        env.insert("MLREG_CONFIG_FILE".into(), path.display().to_string());
    }
    load_config_from(env).context("failed to load configuration")
}

/// Load configuration from the process environment, then register.
pub async fn run(cli: Cli) -> Result<ModelVersion> {
    let cfg = load(&cli)?;
    register_with(&cli, cfg).await
}

pub async fn register_with(cli: &Cli, cfg: RegistrarConfig) -> Result<ModelVersion> {
    let cfg = cli.apply(cfg);
    let opts = cli.register_options(&cfg)?;
    let client = TrackingClient::new(&cfg.tracking()?)?;
    let source = ModelUri::for_run(opts.run_id.as_str(), &opts.artifact_path);
    info!(endpoint = %client.endpoint(), model = %opts.model_name, %source, "registering_model_version");

    let mv = client
        .register(&opts)
        .await
        .with_context(|| format!("failed to register {source} as a version of {}", opts.model_name))?;
    info!(model = %mv.name, version = %mv.version, status = ?mv.status, "registered");
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&mv)?);
    }
    Ok(mv)
}
