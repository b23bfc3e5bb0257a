//! The mock backend served over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::search::codec;

use super::MockBackend;
use super::backend::{not_found_body, rejection_body};

type Pairs = Vec<(String, String)>;

/// Routes mirroring the REST contract.
pub fn router(backend: Arc<MockBackend>) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/health", get(health))
        .fallback(unhandled)
        .layer(TraceLayer::new_for_http())
        .with_state(backend)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve(
    backend: Arc<MockBackend>,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, backend, shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve_on(
    listener: TcpListener,
    backend: Arc<MockBackend>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "mock backend listening");
    axum::serve(listener, router(backend))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn list_users(State(backend): State<Arc<MockBackend>>, Query(pairs): Query<Pairs>) -> Response {
    let params = codec::decode(pairs);
    Json(backend.list(&params)).into_response()
}

async fn get_user(State(backend): State<Arc<MockBackend>>, Path(id): Path<String>) -> Response {
    match backend.get(&id) {
        Some(user) => Json(user).into_response(),
        None => (StatusCode::NOT_FOUND, Json(not_found_body())).into_response(),
    }
}

async fn create_user(State(backend): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Response {
    match backend.create_from_json(&body) {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(err) => (StatusCode::UNPROCESSABLE_ENTITY, Json(rejection_body(&err))).into_response(),
    }
}

async fn update_user(
    State(backend): State<Arc<MockBackend>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    match backend.update_from_json(&id, &body) {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(not_found_body())).into_response(),
        Err(err) => (StatusCode::UNPROCESSABLE_ENTITY, Json(rejection_body(&err))).into_response(),
    }
}

async fn delete_user(State(backend): State<Arc<MockBackend>>, Path(id): Path<String>) -> Response {
    if backend.delete(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(not_found_body())).into_response()
    }
}

async fn health(State(backend): State<Arc<MockBackend>>) -> Json<crate::models::HealthReport> {
    Json(backend.health())
}

async fn unhandled(uri: axum::http::Uri) -> StatusCode {
    tracing::warn!(%uri, "unhandled request");
    StatusCode::NOT_FOUND
}
