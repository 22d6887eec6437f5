//! LiveChat weather widget server
//!
//! Axum host for the compiled WASM widget. The agent app loads the widget
//! from here; the bundle then reads its settings from `/config.json`.
//!
//! ```text
//!  agent app iframe ──▶ GET /            ──▶ static/index.html + wasm
//!                       GET /config.json ──▶ WidgetConfig (from env / .env)
//!                       GET /health
//! ```

mod handlers;
mod state;

use std::path::Path;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use widget_core::WidgetConfig;

use crate::handlers::{health_check, widget_config};
use crate::state::AppState;

fn router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/config.json", get(widget_config))
        // WASM frontend
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = WidgetConfig::from_env()?;
    if config.direct_charge_test {
        tracing::info!("✓ Direct charges created in test mode");
    } else {
        tracing::warn!("⚠ Direct charges are live - set DIRECT_CHARGE_TEST=1 for test purchases");
    }

    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".into());
    let app = router(AppState::new(config), &static_dir);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 widget server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health      - Health check");
    tracing::info!("  GET  /config.json - Widget settings");
    tracing::info!("  GET  /*           - Widget bundle from {}", static_dir);
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;

    fn config() -> WidgetConfig {
        serde_json::from_value(serde_json::json!({
            "client_id": "client",
            "app_url": "https://widget.example.com/",
            "billing_api_url": "https://billing.livechatinc.com",
            "weather_api_key": "key",
            "direct_charge_test": true
        }))
        .unwrap()
    }

    fn app() -> Router {
        let dir = std::env::temp_dir().join(format!("widget-server-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>widget</html>").unwrap();
        router(AppState::new(config()), dir)
    }

    async fn get_body(uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_config_json_round_trips() {
        let (status, body) = get_body("/config.json").await;
        assert_eq!(status, StatusCode::OK);

        let published: WidgetConfig = serde_json::from_slice(&body).unwrap();
        assert_eq!(published, config());
        assert_eq!(published.poll_interval_secs, 15);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_body("/health").await;
        assert_eq!(status, StatusCode::OK);

        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["direct_charge_test"], true);
    }

    #[tokio::test]
    async fn test_serves_bundle() {
        let (status, body) = get_body("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<html>widget</html>");

        let (status, _) = get_body("/missing.wasm").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
