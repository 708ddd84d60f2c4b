//! Core shared utilities for the model registrar: configuration, tracing,
//! and the tracking-server registry client.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::prelude::*;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Install the global subscriber once. `RUST_LOG` wins over `default_level`;
/// `MLREG_JSON_LOG=1` switches to flattened JSON lines.
pub fn init_tracing(service: &str, default_level: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let json = std::env::var("MLREG_JSON_LOG").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let (json_layer, text_layer) = if json {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(std::io::stderr);
            (Some(layer), None)
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .with_writer(std::io::stderr);
            (None, Some(layer))
        };
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))?;
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .with(text_layer)
            .try_init()?;
        Ok(())
    })?;
    info!(target: "mlreg", service, "tracing initialized");
    Ok(())
}

pub mod config;
pub mod error;
pub mod model_registry;
pub mod model_uri;
pub mod tracking;

pub use config::{load_config, load_config_from, RegistrarConfig};
pub use error::RegistryError;
pub use model_registry::{ModelVersion, ModelVersionStatus, ModelVersionTag, RegisteredModel};
pub use model_uri::ModelUri;
pub use tracking::{register_model_version, AwaitPolicy, RegisterOptions, TrackingAuth, TrackingClient, TrackingConfig};
