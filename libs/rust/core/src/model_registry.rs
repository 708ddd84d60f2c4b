//! Model registry records and request payloads (MLflow REST 2.0 shapes).

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

static RUN_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_\-]{0,255}$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelVersionStatus {
    PendingRegistration,
    FailedRegistration,
    Ready,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersionTag { pub key: String, pub value: String }

impl ModelVersionTag {
    /// Parses `key=value`; the value may itself contain `=`.
    pub fn parse(s: &str) -> Result<Self, RegistryError> {
        match s.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok(Self { key: k.trim().to_string(), value: v.to_string() }),
            _ => Err(RegistryError::InvalidInput(format!("tag must be key=value, got {s:?}"))),
        }
    }
}

/// A registered version as returned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
    #[serde(default)]
    pub last_updated_timestamp: Option<i64>,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub status: Option<ModelVersionStatus>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub run_link: Option<String>,
    #[serde(default)]
    pub tags: Vec<ModelVersionTag>,
}

impl ModelVersion {
    pub fn version_number(&self) -> Option<u64> { self.version.parse().ok() }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.creation_timestamp.and_then(DateTime::from_timestamp_millis)
    }

    /// Servers that omit `status` only ever return finished versions.
    pub fn is_pending(&self) -> bool { self.status == Some(ModelVersionStatus::PendingRegistration) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
    #[serde(default)]
    pub last_updated_timestamp: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub latest_versions: Vec<ModelVersion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateModelVersionRequest {
    pub name: String,
    pub source: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<ModelVersionTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateModelVersionRequest {
    pub fn new(name: impl Into<String>, source: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self { name: name.into(), source: source.into(), run_id: run_id.into(), tags: Vec::new(), run_link: None, description: None }
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        validate_model_name(&self.name)?;
        validate_run_id(&self.run_id)?;
        if self.source.trim().is_empty() {
            return Err(RegistryError::InvalidInput("model source cannot be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateRegisteredModelRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelVersionEnvelope { pub model_version: ModelVersion }

#[derive(Debug, Deserialize)]
pub(crate) struct RegisteredModelEnvelope { pub registered_model: RegisteredModel }

pub fn validate_model_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidInput("registered model name cannot be empty".into()));
    }
    if name.contains('/') {
        return Err(RegistryError::InvalidInput(format!("registered model name {name:?} must not contain '/'")));
    }
    Ok(())
}

pub fn validate_run_id(run_id: &str) -> Result<(), RegistryError> {
    if !RUN_ID_RE.is_match(run_id) {
        return Err(RegistryError::InvalidInput(format!("invalid run id {run_id:?}")));
    }
    Ok(())
}
