//! # REST API HTTP Server
//!
//! Axum-based HTTP server exposing the engine's operation surface under
//! `/api/v1`, plus a WebSocket change feed and a health route.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::engine::EntityEngine;
use crate::observability::Logger;
use crate::realtime::EntityEvent;
use crate::schema::EntitySchema;
use crate::store::EntityRecord;

use super::errors::{ApiError, ApiResult};
use super::response::{
    DeleteResponse, ListResponse, ResetAllResponse, ResetResponse, SingleResponse,
};

/// Server binding configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address
    pub bind_address: String,
    /// Listen port
    pub port: u16,
    /// Allowed CORS origins; empty means permissive
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8470,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Full socket address string.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// REST API server over a shared engine.
pub struct ApiServer {
    config: ApiConfig,
    engine: Arc<EntityEngine>,
}

impl ApiServer {
    /// Create a server with the given engine and configuration.
    pub fn new(engine: Arc<EntityEngine>, config: ApiConfig) -> Self {
        Self { config, engine }
    }

    /// Build the router for this server's engine.
    pub fn router(&self) -> Router {
        build_router(self.engine.clone(), &self.config.cors_origins)
    }

    /// Start serving; runs until the process exits.
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let router = self.router();
        Logger::info("SERVER_STARTED", &[("addr", &addr.to_string())]);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router).await
    }
}

/// Build the full API router over an engine.
pub fn build_router(engine: Arc<EntityEngine>, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/schemas", post(create_schema_handler))
        .route("/api/v1/schemas", get(list_schemas_handler))
        .route("/api/v1/schemas/:name", get(get_schema_handler))
        .route("/api/v1/schemas/:name", axum::routing::put(update_schema_handler))
        .route("/api/v1/schemas/:name", delete(delete_schema_handler))
        .route("/api/v1/entities/:entity_type", post(create_entity_handler))
        .route("/api/v1/entities/:entity_type", get(list_entities_handler))
        .route("/api/v1/entities/:entity_type/fetch-next", post(fetch_next_handler))
        .route("/api/v1/entities/:entity_type/reset", post(reset_all_handler))
        .route("/api/v1/entities/:entity_type/:id", get(get_entity_handler))
        .route("/api/v1/entities/:entity_type/:id", patch(update_entity_handler))
        .route("/api/v1/entities/:entity_type/:id", delete(delete_entity_handler))
        .route("/api/v1/entities/:entity_type/:id/reset", post(reset_handler))
        .route("/api/v1/events/ws", get(events_ws_handler))
        .layer(cors)
        .with_state(engine)
}

/// Shared state type
type AppState = State<Arc<EntityEngine>>;

// ==================
// Request Types
// ==================

/// Body for entity creation
#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub environment: Option<String>,
}

/// Body for entity update
#[derive(Debug, Deserialize)]
pub struct UpdateEntityRequest {
    pub fields: Map<String, Value>,
}

/// Query parameters for listing/filtering
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub field: Option<String>,
    pub value: Option<String>,
    pub environment: Option<String>,
}

/// Query parameter for scoped operations
#[derive(Debug, Default, Deserialize)]
pub struct ScopeParams {
    pub environment: Option<String>,
}

/// Filter values arrive as raw query strings; take JSON when it parses
/// (`42`, `true`) and fall back to the literal string.
fn parse_filter_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_id(entity_type: &str, raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId {
        entity_type: entity_type.to_string(),
        id: raw.to_string(),
    })
}

// ==================
// Handlers
// ==================

async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_schema_handler(
    State(engine): AppState,
    Json(schema): Json<EntitySchema>,
) -> ApiResult<(StatusCode, Json<SingleResponse<EntitySchema>>)> {
    let created = engine.create_schema(schema)?;
    Ok((StatusCode::CREATED, Json(SingleResponse::new(created))))
}

async fn list_schemas_handler(
    State(engine): AppState,
) -> ApiResult<Json<ListResponse<EntitySchema>>> {
    Ok(Json(ListResponse::new(engine.list_schemas()?)))
}

async fn get_schema_handler(
    State(engine): AppState,
    Path(name): Path<String>,
) -> ApiResult<Json<SingleResponse<EntitySchema>>> {
    Ok(Json(SingleResponse::new(engine.get_schema(&name)?)))
}

async fn update_schema_handler(
    State(engine): AppState,
    Path(name): Path<String>,
    Json(schema): Json<EntitySchema>,
) -> ApiResult<Json<SingleResponse<EntitySchema>>> {
    Ok(Json(SingleResponse::new(engine.update_schema(&name, schema)?)))
}

async fn delete_schema_handler(
    State(engine): AppState,
    Path(name): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    engine.delete_schema(&name)?;
    Ok(Json(DeleteResponse::ok()))
}

async fn create_entity_handler(
    State(engine): AppState,
    Path(entity_type): Path<String>,
    Json(body): Json<CreateEntityRequest>,
) -> ApiResult<(StatusCode, Json<SingleResponse<EntityRecord>>)> {
    let created = engine.create_entity(&entity_type, &body.fields, body.environment)?;
    Ok((StatusCode::CREATED, Json(SingleResponse::new(created))))
}

async fn list_entities_handler(
    State(engine): AppState,
    Path(entity_type): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListResponse<EntityRecord>>> {
    let parsed_value = params.value.as_deref().map(parse_filter_value);
    let filter = match (&params.field, &parsed_value) {
        (Some(field), Some(value)) => Some((field.as_str(), value)),
        _ => None,
    };

    let records = engine.list_entities(&entity_type, filter, params.environment.as_deref())?;
    Ok(Json(ListResponse::new(records)))
}

async fn get_entity_handler(
    State(engine): AppState,
    Path((entity_type, id)): Path<(String, String)>,
) -> ApiResult<Json<SingleResponse<EntityRecord>>> {
    let id = parse_id(&entity_type, &id)?;
    Ok(Json(SingleResponse::new(engine.get_by_id(&entity_type, id)?)))
}

async fn update_entity_handler(
    State(engine): AppState,
    Path((entity_type, id)): Path<(String, String)>,
    Json(body): Json<UpdateEntityRequest>,
) -> ApiResult<Json<SingleResponse<EntityRecord>>> {
    let id = parse_id(&entity_type, &id)?;
    let updated = engine.update_entity(&entity_type, id, &body.fields)?;
    Ok(Json(SingleResponse::new(updated)))
}

async fn delete_entity_handler(
    State(engine): AppState,
    Path((entity_type, id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_id(&entity_type, &id)?;
    engine.delete_entity(&entity_type, id)?;
    Ok(Json(DeleteResponse::ok()))
}

async fn fetch_next_handler(
    State(engine): AppState,
    Path(entity_type): Path<String>,
    Query(params): Query<ScopeParams>,
) -> ApiResult<Json<SingleResponse<EntityRecord>>> {
    let claimed = engine.fetch_next(&entity_type, params.environment.as_deref())?;
    Ok(Json(SingleResponse::new(claimed)))
}

async fn reset_handler(
    State(engine): AppState,
    Path((entity_type, id)): Path<(String, String)>,
) -> ApiResult<Json<ResetResponse>> {
    let id = parse_id(&entity_type, &id)?;
    engine.reset(&entity_type, id)?;
    Ok(Json(ResetResponse::ok()))
}

async fn reset_all_handler(
    State(engine): AppState,
    Path(entity_type): Path<String>,
    Query(params): Query<ScopeParams>,
) -> ApiResult<Json<ResetAllResponse>> {
    let reset_count = engine.reset_all(&entity_type, params.environment.as_deref())?;
    Ok(Json(ResetAllResponse { reset_count }))
}

// ==================
// WebSocket feed
// ==================

async fn events_ws_handler(State(engine): AppState, ws: WebSocketUpgrade) -> impl IntoResponse {
    let rx = engine.notifier().subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, rx))
}

/// Forwards the change feed to one client until it disconnects. Lagged
/// receivers skip missed events and keep going: delivery is best-effort.
async fn stream_events(socket: WebSocket, mut rx: broadcast::Receiver<EntityEvent>) {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let text = event.to_wire_format().to_string();
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    Logger::warn("WS_CLIENT_LAGGED", &[("missed", &missed.to_string())]);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
        }
    }
}
