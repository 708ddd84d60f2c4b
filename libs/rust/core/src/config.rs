//! Layered registrar configuration.
//!
//! Precedence, lowest first: built-in defaults, the file named by
//! `MLREG_CONFIG_FILE`, `MLREG__*` environment keys, then the conventional
//! `MLFLOW_TRACKING_*` variables. A named config file must exist. Command-line flags are applied by the
//! binary on top of the result.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::RegistryError;
use crate::tracking::{TrackingAuth, TrackingConfig};

pub const DEFAULT_TRACKING_URI: &str = "http://127.0.0.1:5000";
pub const DEFAULT_MODEL_NAME: &str = "credit-scoring";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_AWAIT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RegistrarConfig {
    pub tracking_uri: String,
    pub model_name: String,
    #[serde(default)]
    pub run_id: Option<String>,
    pub artifact_path: String,
    pub request_timeout_secs: u64,
    pub await_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub log_level: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            tracking_uri: DEFAULT_TRACKING_URI.into(),
            model_name: DEFAULT_MODEL_NAME.into(),
            run_id: None,
            artifact_path: crate::model_uri::DEFAULT_ARTIFACT_PATH.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            await_timeout_secs: DEFAULT_AWAIT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_level: "info".into(),
            token: None,
            username: None,
            password: None,
        }
    }
}

impl RegistrarConfig {
    /// Client settings for the configured endpoint. Token auth wins over basic auth.
    pub fn tracking(&self) -> Result<TrackingConfig, RegistryError> {
        let auth = match (&self.token, &self.username) {
            (Some(token), _) => TrackingAuth::Bearer(token.clone()),
            (None, Some(user)) => TrackingAuth::Basic { username: user.clone(), password: self.password.clone() },
            (None, None) => TrackingAuth::None,
        };
        let mut cfg = TrackingConfig::new(&self.tracking_uri)?;
        cfg.auth = auth;
        cfg.request_timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(cfg)
    }

    pub fn await_timeout(&self) -> Duration { Duration::from_secs(self.await_timeout_secs) }
    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<RegistrarConfig, RegistryError> {
    load_config_from(std::env::vars().collect())
}

/// Load configuration from an explicit environment map.
pub fn load_config_from(env: HashMap<String, String>) -> Result<RegistrarConfig, RegistryError> {
    let defaults = RegistrarConfig::default();
    let mut builder = config::Config::builder()
        .set_default("tracking_uri", defaults.tracking_uri)?
        .set_default("model_name", defaults.model_name)?
        .set_default("artifact_path", defaults.artifact_path)?
        .set_default("request_timeout_secs", defaults.request_timeout_secs)?
        .set_default("await_timeout_secs", defaults.await_timeout_secs)?
        .set_default("poll_interval_ms", defaults.poll_interval_ms)?
        .set_default("log_level", defaults.log_level)?;

    if let Some(file) = env.get("MLREG_CONFIG_FILE") {
        builder = builder.add_source(config::File::with_name(file).required(true));
    }
    let prefixed: HashMap<String, String> = env
        .iter()
        .filter(|(k, _)| k.starts_with("MLREG__"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    builder = builder.add_source(
        config::Environment::with_prefix("MLREG")
            .separator("__")
            .source(Some(prefixed)),
    );

    let timeout = env
        .get("MLFLOW_HTTP_REQUEST_TIMEOUT")
        .and_then(|v| v.trim().parse::<u64>().ok());
    builder = builder
        .set_override_option("tracking_uri", non_empty(&env, "MLFLOW_TRACKING_URI"))?
        .set_override_option("token", non_empty(&env, "MLFLOW_TRACKING_TOKEN"))?
        .set_override_option("username", non_empty(&env, "MLFLOW_TRACKING_USERNAME"))?
        .set_override_option("password", non_empty(&env, "MLFLOW_TRACKING_PASSWORD"))?
        .set_override_option("request_timeout_secs", timeout)?;

    let cfg: RegistrarConfig = builder.build()?.try_deserialize()?;
    tracing::debug!(tracking_uri = %cfg.tracking_uri, model = %cfg.model_name, "config_loaded");
    Ok(cfg)
}

fn non_empty(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
