use std::io::Write;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use super::*;

async fn spawn_config_server() -> Result<Url> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route(
            "/addresses.json",
            get(|| async { Json(json!({ "TestnetV2": { "Matic": {}, "Main": {} } })) }),
        )
        .route("/broken.json", get(|| async { "{ not json" }))
        .route("/missing.json", get(|| async { StatusCode::NOT_FOUND }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Url::parse(&format!("http://{addr}/"))?)
}

#[tokio::test]
async fn http_source_returns_published_document() {
    let base = spawn_config_server().await.expect("server");
    let source = HttpConfigSource::new(base.join("addresses.json").expect("url"), Duration::from_secs(5))
        .expect("source");

    let document = source.fetch_document().await.expect("document");

    assert!(document["TestnetV2"]["Matic"].is_object());
    assert!(source.describe().ends_with("/addresses.json"));
}

#[tokio::test]
async fn http_source_rejects_error_status_and_invalid_json() {
    let base = spawn_config_server().await.expect("server");

    for path in ["missing.json", "broken.json"] {
        let source = HttpConfigSource::with_client(Client::new(), base.join(path).expect("url"));
        let err = source.fetch_document().await.expect_err("fetch fails");
        assert!(format!("{err:#}").contains(path), "{err:#}");
    }
}

#[tokio::test]
async fn file_source_reads_local_document() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{ "TestnetV2": {{}} }}"#).expect("write");
    let source = FileConfigSource::new(file.path());

    let document = source.fetch_document().await.expect("document");

    assert!(document.get("TestnetV2").is_some());
}

#[tokio::test]
async fn file_source_reports_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = FileConfigSource::new(dir.path().join("absent.json"));

    assert!(source.fetch_document().await.is_err());
}

#[tokio::test]
async fn static_source_hands_back_its_document() {
    let source = StaticConfigSource::new(json!({ "Mainnet": {} }));
    assert_eq!(
        source.fetch_document().await.expect("document"),
        json!({ "Mainnet": {} })
    );
}
