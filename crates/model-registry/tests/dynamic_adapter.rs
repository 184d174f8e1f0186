//! Models served by the `dummy` adapter library loaded from the adapters
//! directory, through the C ABI.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use model_registry::{
    build_router, AdapterLoader, AppState, Device, LoadOutcome, ModelCatalog, ModelRegistry,
};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

static DUMMY_LIBRARY: OnceLock<PathBuf> = OnceLock::new();

/// Path of the built `dummy` library, building it next to this test binary
/// (`target/<profile>/`) when it is not there yet.
fn dummy_library() -> &'static Path {
    DUMMY_LIBRARY.get_or_init(|| {
        let exe = std::env::current_exe().unwrap();
        // target/<profile>/deps/<test binary>
        let profile_dir = exe.parent().and_then(Path::parent).unwrap().to_path_buf();
        let library = profile_dir.join(libloading::library_filename("dummy"));

        if !library.is_file() {
            let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
            let mut cmd = Command::new(cargo);
            cmd.args(["build", "-p", "dummy-adapter"])
                .env("CARGO_TARGET_DIR", profile_dir.parent().unwrap());
            if profile_dir.ends_with("release") {
                cmd.arg("--release");
            }
            let status = cmd.status().unwrap();
            assert!(status.success(), "building dummy-adapter failed");
        }

        assert!(library.is_file(), "missing {}", library.display());
        library
    })
}

struct Fixture {
    dir: TempDir,
    registry: ModelRegistry,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("models/a")).unwrap();
    fs::create_dir_all(root.join("models/b")).unwrap();
    fs::create_dir_all(root.join("adapters")).unwrap();

    let mut loader = AdapterLoader::new(root.join("adapters"));
    fs::copy(dummy_library(), loader.library_path("dummy")).unwrap();

    let catalog = ModelCatalog::from_entries(vec![
        (
            "sentiment",
            json!({"adapter": "dummy", "path": root.join("models/a"), "config": {"k": 1}}),
        ),
        ("s2", json!({"adapter": "dummy", "path": root.join("models/b")})),
        ("absent", json!({"adapter": "dummy", "path": root.join("models/nope")})),
    ]);
    let registry = ModelRegistry::initialize(&catalog, &mut loader, &Device::cpu()).await;

    Fixture { dir, registry }
}

#[tokio::test]
async fn test_models_share_the_library_adapter() {
    let f = fixture().await;

    assert_eq!(f.registry.len(), 2);
    for name in ["sentiment", "s2"] {
        assert_eq!(
            f.registry.report().outcome(name),
            Some(&LoadOutcome::Loaded {
                adapter: "dummy".to_string()
            })
        );
        let entry = f.registry.get(name).unwrap();
        assert!(entry.origin().starts_with(&f.dir.path().display().to_string()));

        let meta = entry.adapter().metadata();
        assert_eq!(meta.adapter, "dummy");
        assert_eq!(meta.version, "0.1.0");
        assert!(!meta.reentrant);
    }

    let a = f.registry.get("sentiment").unwrap().adapter() as *const _ as *const u8;
    let b = f.registry.get("s2").unwrap().adapter() as *const _ as *const u8;
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_library_adapter_reports_byte_length() {
    let f = fixture().await;

    let out = f.registry.run_inference("sentiment", "hello").await.unwrap();
    assert_eq!(Value::Object(out), json!({"length": 5}));

    let out = f.registry.run_inference("s2", "h\u{e9}llo").await.unwrap();
    assert_eq!(Value::Object(out), json!({"length": 6}));
}

#[tokio::test]
async fn test_library_adapter_over_http() {
    let f = fixture().await;
    let app = build_router(AppState::new(f.registry), Duration::from_secs(10));

    let req = Request::builder()
        .method("POST")
        .uri("/inference/s2")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"text": "hello"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, json!({"length": 5}));
}

#[tokio::test]
async fn test_library_setup_error_reaches_load_report() {
    let f = fixture().await;

    assert!(f.registry.get("absent").is_none());
    match f.registry.report().outcome("absent") {
        Some(LoadOutcome::Skipped { kind, reason }) => {
            assert_eq!(kind, "setup_failed");
            assert!(reason.contains("model artifact not found"), "reason: {}", reason);
            assert!(reason.contains("nope"), "reason: {}", reason);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}
