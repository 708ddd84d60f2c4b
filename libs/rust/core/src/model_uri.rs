//! `runs:/<run_id>/<artifact_path>` model source URIs.

use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

pub const RUNS_SCHEME: &str = "runs:/";
pub const DEFAULT_ARTIFACT_PATH: &str = "model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUri {
    run_id: String,
    artifact_path: String,
}

impl ModelUri {
    pub fn for_run(run_id: impl Into<String>, artifact_path: &str) -> Self {
        Self { run_id: run_id.into(), artifact_path: artifact_path.trim_matches('/').to_string() }
    }

    /// Default layout: the model logged under `model` in the run's artifacts.
    pub fn run_model(run_id: impl Into<String>) -> Self { Self::for_run(run_id, DEFAULT_ARTIFACT_PATH) }

    pub fn run_id(&self) -> &str { &self.run_id }
    pub fn artifact_path(&self) -> &str { &self.artifact_path }
}

impl fmt::Display for ModelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", RUNS_SCHEME, self.run_id, self.artifact_path)
    }
}

impl FromStr for ModelUri {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(RUNS_SCHEME)
            .ok_or_else(|| RegistryError::InvalidInput(format!("not a runs:/ uri: {s}")))?;
        let (run_id, path) = rest
            .trim_start_matches('/')
            .split_once('/')
            .ok_or_else(|| RegistryError::InvalidInput(format!("missing artifact path in {s}")))?;
        let path = path.trim_matches('/');
        if run_id.is_empty() || path.is_empty() {
            return Err(RegistryError::InvalidInput(format!("malformed runs:/ uri: {s}")));
        }
        Ok(Self::for_run(run_id, path))
    }
}
