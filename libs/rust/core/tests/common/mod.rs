//! In-process fake of the tracking server's model-registry endpoints.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Default)]
pub struct FakeRegistry {
    /// run id -> artifact paths logged by that run
    pub runs: HashMap<String, Vec<String>>,
    pub models: HashSet<String>,
    pub versions: Vec<Value>,
    /// create-version calls that reached the server
    pub create_calls: usize,
    pub get_calls: usize,
    /// polls a new version stays PENDING_REGISTRATION for
    pub pending_polls: u32,
    pub fail_registration: bool,
}

pub type Shared = Arc<Mutex<FakeRegistry>>;

impl FakeRegistry {
    pub fn with_run(mut self, run_id: &str, artifact: &str) -> Self {
        self.runs.entry(run_id.to_string()).or_default().push(artifact.to_string());
        self
    }

    pub fn with_model(mut self, name: &str) -> Self {
        self.models.insert(name.to_string());
        self
    }

    pub fn versions_of(&self, name: &str) -> Vec<Value> {
        self.versions.iter().filter(|v| v["name"] == name).cloned().collect()
    }
}

fn api_error(status: StatusCode, code: &str, message: String) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error_code": code, "message": message })))
}

async fn create_version(State(st): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut st = st.lock();
    st.create_calls += 1;
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let source = body["source"].as_str().unwrap_or_default().to_string();
    let run_id = body["run_id"].as_str().unwrap_or_default().to_string();
    if name.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "INVALID_PARAMETER_VALUE", "Registered model name cannot be empty.".into());
    }
    if !st.models.contains(&name) {
        return api_error(StatusCode::NOT_FOUND, "RESOURCE_DOES_NOT_EXIST", format!("Registered Model with name={name} not found"));
    }
    let Some(artifacts) = st.runs.get(&run_id) else {
        return api_error(StatusCode::NOT_FOUND, "RESOURCE_DOES_NOT_EXIST", format!("Run '{run_id}' not found"));
    };
    let logged = artifacts.iter().any(|a| source == format!("runs:/{run_id}/{a}"));
    if !logged {
        return api_error(StatusCode::NOT_FOUND, "RESOURCE_DOES_NOT_EXIST", format!("No model artifact at {source}"));
    }
    let version = st.versions_of(&name).len() + 1;
    let status = if st.pending_polls > 0 { "PENDING_REGISTRATION" } else { "READY" };
    let mv = json!({
        "name": name,
        "version": version.to_string(),
        "creation_timestamp": 1_700_000_000_000i64 + version as i64,
        "current_stage": "None",
        "source": source,
        "run_id": run_id,
        "status": status,
        "tags": body.get("tags").cloned().unwrap_or_else(|| json!([])),
        "description": body.get("description").cloned().unwrap_or(Value::Null),
    });
    st.versions.push(mv.clone());
    (StatusCode::OK, Json(json!({ "model_version": mv })))
}

async fn get_version(State(st): State<Shared>, Query(q): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let mut st = st.lock();
    st.get_calls += 1;
    let (name, version) = (q.get("name").cloned().unwrap_or_default(), q.get("version").cloned().unwrap_or_default());
    if st.pending_polls > 0 {
        st.pending_polls -= 1;
    }
    let (pending, failed) = (st.pending_polls > 0, st.fail_registration);
    let Some(mv) = st.versions.iter_mut().find(|v| v["name"] == name.as_str() && v["version"] == version.as_str()) else {
        return api_error(StatusCode::NOT_FOUND, "RESOURCE_DOES_NOT_EXIST", format!("{name}/{version} not found"));
    };
    if !pending {
        if failed {
            mv["status"] = json!("FAILED_REGISTRATION");
            mv["status_message"] = json!("artifact copy failed");
        } else {
            mv["status"] = json!("READY");
        }
    }
    (StatusCode::OK, Json(json!({ "model_version": mv.clone() })))
}

async fn create_model(State(st): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut st = st.lock();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if !st.models.insert(name.clone()) {
        return api_error(StatusCode::BAD_REQUEST, "RESOURCE_ALREADY_EXISTS", format!("Registered Model (name={name}) already exists."));
    }
    (StatusCode::OK, Json(json!({ "registered_model": { "name": name, "creation_timestamp": 1_700_000_000_000i64 } })))
}

/// Serve the fake on an ephemeral port and return its base URL.
pub async fn spawn(registry: FakeRegistry) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(registry));
    let app = Router::new()
        .route("/api/2.0/mlflow/model-versions/create", post(create_version))
        .route("/api/2.0/mlflow/model-versions/get", get(get_version))
        .route("/api/2.0/mlflow/registered-models/create", post(create_model))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

/// An address nothing is listening on.
pub fn dead_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}
