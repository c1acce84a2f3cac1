//! HTTP status API with Axum

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::pipeline::{PipelineStats, StatsSnapshot};
use crate::types::ObjectTurn;

/// Create the Axum router with all endpoints
pub fn create_router(stats: Arc<PipelineStats>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/stats", get(get_stats))
        .route("/api/turns/recent", get(recent_turns))
        .layer(cors)
        .with_state(stats)
}

/// Bind the status API listener
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "status API listening");
    Ok(listener)
}

/// Serve the status API on `listener` in a background task
pub fn spawn_server(listener: TcpListener, stats: Arc<PipelineStats>) -> JoinHandle<()> {
    let app = create_router(stats);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "status API stopped");
        }
    })
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn get_stats(State(stats): State<Arc<PipelineStats>>) -> Json<StatsSnapshot> {
    Json(stats.snapshot())
}

async fn recent_turns(State(stats): State<Arc<PipelineStats>>) -> Json<Vec<ObjectTurn>> {
    Json(stats.recent_turns())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Turn;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(Arc::new(PipelineStats::new(1)));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_bind_reports_address_in_use() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let err = bind(addr).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);

        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server = spawn_server(listener, Arc::new(PipelineStats::new(1)));
        assert!(!server.is_finished());
        server.abort();
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let stats = Arc::new(PipelineStats::new(2));
        stats.record_event();
        stats.set_live_objects(1, 3);
        let app = create_router(stats);

        let response = app
            .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["events"], 1);
        assert_eq!(json["live_objects"], 3);
        assert_eq!(json["partitions"], serde_json::json!([0, 3]));
    }

    #[tokio::test]
    async fn test_recent_turns_endpoint() {
        let stats = Arc::new(PipelineStats::new(1));
        stats.record_turn(&ObjectTurn::new("cam/1", Turn::Straight));
        let app = create_router(stats);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/turns/recent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json[0]["object_id"], "cam/1");
        assert_eq!(json[0]["turn"], "straight");
    }
}
