//! HTTP client for the tracking server's model registry.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::model_registry::{
    validate_model_name, validate_run_id, CreateModelVersionRequest, CreateRegisteredModelRequest, ModelVersion,
    ModelVersionEnvelope, ModelVersionStatus, ModelVersionTag, RegisteredModel, RegisteredModelEnvelope,
};
use crate::model_uri::ModelUri;

const API_PREFIX: &str = "api/2.0/mlflow";
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingAuth {
    None,
    Bearer(String),
    Basic { username: String, password: Option<String> },
}

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub endpoint: Url,
    pub auth: TrackingAuth,
    pub request_timeout: Duration,
}

impl TrackingConfig {
    pub fn new(endpoint: &str) -> Result<Self, RegistryError> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| RegistryError::InvalidInput(format!("tracking uri {endpoint:?}: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidInput(format!(
                "tracking uri must be http(s), got scheme {:?}",
                endpoint.scheme()
            )));
        }
        Ok(Self { endpoint, auth: TrackingAuth::None, request_timeout: Duration::from_secs(120) })
    }
}

/// How long to wait for a freshly created version to leave `PENDING_REGISTRATION`.
#[derive(Debug, Clone, Copy)]
pub struct AwaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl AwaitPolicy {
    pub fn disabled() -> Self { Self { timeout: Duration::ZERO, poll_interval: Duration::ZERO } }
}

impl Default for AwaitPolicy {
    fn default() -> Self { Self { timeout: Duration::from_secs(300), poll_interval: Duration::from_secs(1) } }
}

/// Everything needed to register one run's model as a new version.
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    pub model_name: String,
    pub run_id: String,
    pub artifact_path: String,
    pub tags: Vec<ModelVersionTag>,
    pub description: Option<String>,
    pub run_link: Option<String>,
    pub create_model: bool,
    pub await_policy: AwaitPolicy,
}

impl RegisterOptions {
    pub fn new(model_name: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            run_id: run_id.into(),
            artifact_path: crate::model_uri::DEFAULT_ARTIFACT_PATH.into(),
            tags: Vec::new(),
            description: None,
            run_link: None,
            create_model: false,
            await_policy: AwaitPolicy::disabled(),
        }
    }
}

#[derive(Clone)]
pub struct TrackingClient {
    client: Client,
    base_url: String,
    auth: TrackingAuth,
}

impl TrackingClient {
    pub fn new(cfg: &TrackingConfig) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(RegistryError::Client)?;
        Ok(Self {
            client,
            base_url: cfg.endpoint.as_str().trim_end_matches('/').to_string(),
            auth: cfg.auth.clone(),
        })
    }

    pub fn endpoint(&self) -> &str { &self.base_url }

    /// Register `runs:/<run_id>/<artifact_path>` as a new version of `model_name`.
    pub async fn register(&self, opts: &RegisterOptions) -> Result<ModelVersion, RegistryError> {
        validate_model_name(&opts.model_name)?;
        validate_run_id(&opts.run_id)?;
        if opts.create_model {
            self.ensure_registered_model(&opts.model_name).await?;
        }
        let source = ModelUri::for_run(opts.run_id.as_str(), &opts.artifact_path);
        let mut req = CreateModelVersionRequest::new(opts.model_name.as_str(), source.to_string(), opts.run_id.as_str());
        req.tags = opts.tags.clone();
        req.description = opts.description.clone();
        req.run_link = opts.run_link.clone();
        let created = self.create_model_version(&req).await?;
        if opts.await_policy.timeout.is_zero() {
            return Ok(created);
        }
        self.await_model_version_ready(created, opts.await_policy).await
    }

    pub async fn create_model_version(&self, req: &CreateModelVersionRequest) -> Result<ModelVersion, RegistryError> {
        req.validate()?;
        debug!(model = %req.name, run_id = %req.run_id, source = %req.source, "create_model_version");
        let resp = self
            .send(self.request(Method::POST, "model-versions/create").json(req))
            .await?;
        let env: ModelVersionEnvelope = self.decode(resp).await?;
        let mv = env.model_version;
        info!(model = %mv.name, version = %mv.version, status = ?mv.status, "model_version_created");
        Ok(mv)
    }

    pub async fn get_model_version(&self, name: &str, version: &str) -> Result<ModelVersion, RegistryError> {
        let resp = self
            .send(self.request(Method::GET, "model-versions/get").query(&[("name", name), ("version", version)]))
            .await?;
        let env: ModelVersionEnvelope = self.decode(resp).await?;
        Ok(env.model_version)
    }

    pub async fn create_registered_model(&self, name: &str, description: Option<&str>) -> Result<RegisteredModel, RegistryError> {
        validate_model_name(name)?;
        let body = CreateRegisteredModelRequest { name, description };
        let resp = self
            .send(self.request(Method::POST, "registered-models/create").json(&body))
            .await?;
        let env: RegisteredModelEnvelope = self.decode(resp).await?;
        info!(model = %env.registered_model.name, "registered_model_created");
        Ok(env.registered_model)
    }

    /// Create the registered model unless it already exists.
    pub async fn ensure_registered_model(&self, name: &str) -> Result<(), RegistryError> {
        match self.create_registered_model(name, None).await {
            Ok(_) => Ok(()),
            Err(RegistryError::AlreadyExists { .. }) => {
                debug!(model = %name, "registered_model_exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll until the version leaves `PENDING_REGISTRATION` or the policy's deadline passes.
    /// A timeout too large to represent waits without a deadline.
    pub async fn await_model_version_ready(&self, mut mv: ModelVersion, policy: AwaitPolicy) -> Result<ModelVersion, RegistryError> {
        let deadline = Instant::now().checked_add(policy.timeout);
        let poll_interval = policy.poll_interval.max(MIN_POLL_INTERVAL);
        loop {
            match mv.status {
                Some(ModelVersionStatus::FailedRegistration) => {
                    return Err(RegistryError::RegistrationFailed {
                        name: mv.name,
                        version: mv.version,
                        message: mv.status_message.unwrap_or_default(),
                    });
                }
                Some(ModelVersionStatus::PendingRegistration) => {}
                _ => return Ok(mv),
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(model = %mv.name, version = %mv.version, "await_ready_timeout");
                return Err(RegistryError::Timeout { name: mv.name, version: mv.version });
            }
            debug!(model = %mv.name, version = %mv.version, "waiting_for_ready");
            sleep(poll_interval).await;
            mv = self.get_model_version(&mv.name, &mv.version).await?;
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let rb = self.client.request(method, format!("{}/{}/{}", self.base_url, API_PREFIX, path));
        match &self.auth {
            TrackingAuth::None => rb,
            TrackingAuth::Bearer(token) => rb.bearer_auth(token),
            TrackingAuth::Basic { username, password } => rb.basic_auth(username, password.as_ref()),
        }
    }

    async fn send(&self, rb: RequestBuilder) -> Result<Response, RegistryError> {
        rb.send().await.map_err(|source| RegistryError::Connectivity { endpoint: self.base_url.clone(), source })
    }

    async fn decode<T: DeserializeOwned>(&self, resp: Response) -> Result<T, RegistryError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|source| RegistryError::Connectivity { endpoint: self.base_url.clone(), source })?;
        if !status.is_success() {
            return Err(RegistryError::from_response(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| RegistryError::Decode(e.to_string()))
    }
}

/// One-shot registration of `runs:/<run_id>/model` under `model_name`.
pub async fn register_model_version(endpoint: &str, model_name: &str, run_id: &str) -> Result<ModelVersion, RegistryError> {
    let client = TrackingClient::new(&TrackingConfig::new(endpoint)?)?;
    client.register(&RegisterOptions::new(model_name, run_id)).await
}
