mod common;

use anyhow::Result;
use axum::http::StatusCode;

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let app = common::TestApp::new()?;
    let (status, body) = app.get("/", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "StudyHub API");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = common::TestApp::new()?;
    let (status, body) = app.get("/health", None).await?;

    // No database is listening in tests; liveness still answers with JSON
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        status
    );
    assert!(body["data"]["status"].is_string());
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_json_404() -> Result<()> {
    let app = common::TestApp::new()?;
    let (status, body) = app.get("/nope", None).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}
