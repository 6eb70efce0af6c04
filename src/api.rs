//! REST API server for the query engine
//!
//! Thin HTTP wrapper over [`QueryService`]. Shape validation only.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::QueryService;
use crate::models::Mode;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub client_id: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub fallback_tool: Option<String>,
    #[serde(default)]
    pub fallback_params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DirectRequest {
    pub tool: String,
    pub client_id: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParseRequest {
    pub query: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<QueryService>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Query Endpoints
/// =============================

async fn run_query(
    State(state): State<ApiState>,
    Json(req): Json<QueryRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.client_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("clientId is required".into())),
        );
    }

    let mode = match req.mode.as_deref() {
        None => Mode::Auto,
        Some(raw) => match raw.parse::<Mode>() {
            Ok(mode) => mode,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())));
            }
        },
    };

    info!(client_id = %req.client_id, mode = mode.as_str(), "Received query request");

    match state
        .service
        .query(
            &req.query,
            &req.client_id,
            mode,
            req.fallback_tool.as_deref(),
            req.fallback_params,
        )
        .await
    {
        Ok(result) => (StatusCode::OK, Json(ApiResponse::success(result))),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string()))),
    }
}

async fn run_direct(
    State(state): State<ApiState>,
    Json(req): Json<DirectRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.client_id.trim().is_empty() || req.tool.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("tool and clientId are required".into())),
        );
    }

    info!(client_id = %req.client_id, tool = %req.tool, "Received direct request");

    let result = state
        .service
        .direct_call(&req.tool, &req.client_id, req.params)
        .await;
    (StatusCode::OK, Json(ApiResponse::success(result)))
}

async fn test_parse(
    State(state): State<ApiState>,
    Json(req): Json<ParseRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let report = state.service.test_parse(&req.query);
    (StatusCode::OK, Json(ApiResponse::success(report)))
}

/// =============================
/// Router
/// =============================

pub fn create_router(service: Arc<QueryService>) -> Router {
    let state = ApiState { service };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/query", post(run_query))
        .route("/api/direct", post(run_direct))
        .route("/api/test-parse", post(test_parse))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    service: Arc<QueryService>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(service);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextResolver, InMemoryClientStore};
    use crate::execution::Executor;
    use crate::gateway::scripted::{Reply, ScriptedGateway};
    use crate::planner::StrategyBuilder;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router(gateway: ScriptedGateway) -> Router {
        let service = QueryService::new(
            ContextResolver::new(Arc::new(InMemoryClientStore::new()), Duration::from_secs(1)),
            StrategyBuilder::new(),
            Executor::new(Arc::new(gateway)),
        );
        create_router(Arc::new(service))
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(ScriptedGateway::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_query_endpoint() {
        let gateway = ScriptedGateway::new()
            .on("segments.list", Reply::Success(json!({"data": [{"id": "s1"}]})));

        let (status, body) = post_json(
            router(gateway),
            "/api/query",
            json!({"query": "show segments", "clientId": "acme", "mode": "intelligent"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["mode"], json!("intelligent"));
        assert_eq!(body["data"]["successfulStrategies"], json!(1));
    }

    #[tokio::test]
    async fn test_query_rejects_unknown_mode() {
        let (status, body) = post_json(
            router(ScriptedGateway::new()),
            "/api/query",
            json!({"query": "show segments", "clientId": "acme", "mode": "clever"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_direct_endpoint() {
        let gateway = ScriptedGateway::new()
            .on("metrics.list", Reply::Success(json!({"data": [{"id": "m1"}]})));

        let (status, body) = post_json(
            router(gateway),
            "/api/direct",
            json!({"tool": "metrics.list", "clientId": "acme"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["mode"], json!("direct"));
        assert_eq!(body["data"]["results"][0]["data"], json!({"data": [{"id": "m1"}]}));
    }

    #[tokio::test]
    async fn test_parse_endpoint() {
        let (status, body) = post_json(
            router(ScriptedGateway::new()),
            "/api/test-parse",
            json!({"query": "List all segments"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["strategies"][0]["tool"], json!("segments.list"));
        assert_eq!(body["data"]["directToolGuess"]["tool"], json!("segments.list"));
    }
}
