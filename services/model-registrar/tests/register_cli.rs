//! Drives `register_with` against a minimal fake registry.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use clap::Parser;
use serde_json::{json, Value};

use mlreg_core::RegistrarConfig;
use model_registrar::{register_with, Cli};

type Seen = Arc<Mutex<Vec<Value>>>;

async fn create(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    let mut seen = seen.lock().unwrap();
    seen.push(body.clone());
    Json(json!({ "model_version": {
        "name": body["name"],
        "version": seen.len().to_string(),
        "source": body["source"],
        "run_id": body["run_id"],
        "status": "READY",
    }}))
}

async fn serve() -> (String, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/api/2.0/mlflow/model-versions/create", post(create))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), seen)
}

#[tokio::test]
async fn cli_flags_drive_a_single_registration() {
    let (url, seen) = serve().await;
    let cli = Cli::parse_from([
        "model-registrar",
        "--tracking-uri", url.as_str(),
        "--run-id", "68a91c645d914bdebc67835c4c78b07b",
        "--tag", "team=risk",
        "--await-timeout", "0",
    ]);

    let mv = register_with(&cli, RegistrarConfig::default()).await.unwrap();
    assert_eq!(mv.name, "credit-scoring");
    assert_eq!(mv.version, "1");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["source"], "runs:/68a91c645d914bdebc67835c4c78b07b/model");
    assert_eq!(seen[0]["run_id"], "68a91c645d914bdebc67835c4c78b07b");
    assert_eq!(seen[0]["tags"], json!([{ "key": "team", "value": "risk" }]));
}

#[tokio::test]
async fn config_supplies_run_when_flags_do_not() {
    let (url, seen) = serve().await;
    let cfg = RegistrarConfig {
        tracking_uri: url,
        model_name: "fraud".into(),
        run_id: Some("abc123".into()),
        await_timeout_secs: 0,
        ..Default::default()
    };
    let mv = register_with(&Cli::default(), cfg).await.unwrap();
    assert_eq!(mv.name, "fraud");
    assert_eq!(seen.lock().unwrap()[0]["source"], "runs:/abc123/model");
}

#[tokio::test]
async fn empty_model_name_fails_without_request() {
    let (url, seen) = serve().await;
    let cli = Cli::parse_from(["model-registrar", "--tracking-uri", url.as_str(), "-m", "", "-r", "abc"]);
    let err = register_with(&cli, RegistrarConfig::default()).await.unwrap_err();
    assert!(format!("{err:#}").contains("name cannot be empty"), "{err:#}");
    assert!(seen.lock().unwrap().is_empty());
}
