use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::json;

use crate::core::SyncError;
use crate::query::{QueryState, SortDirection};
use crate::remote::Remote;
use crate::remote::wire::Pagination;
use crate::store::{Fields, RecordId};

use super::MemoryRemote;

/// Serves a [`MemoryRemote`] with the JSON envelopes of the real endpoints.
/// Failures injected with `fail_next` come back as the matching status; a
/// `Parse` failure is sent as a truncated 200 body.
pub fn router(remote: Arc<MemoryRemote>) -> Router {
    Router::new()
        .route("/{resource}", get(list).post(create))
        .route("/{resource}/{id}", put(update).delete(delete))
        .with_state(remote)
}

/// Bind an ephemeral local port and serve [`router`] on it in the background.
pub async fn serve(remote: Arc<MemoryRemote>) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(remote)).await;
    });
    Ok(addr)
}

struct ErrorBody(SyncError);

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            SyncError::Parse(_) => {
                return (StatusCode::OK, "{\"success\": tru").into_response();
            }
            SyncError::Validation { message, fields } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"success": false, "message": message, "errors": fields}),
            ),
            SyncError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({"success": false, "message": message}),
            ),
            SyncError::Conflict(message) => (
                StatusCode::CONFLICT,
                json!({"success": false, "message": message}),
            ),
            SyncError::Server { status, message } => (
                status
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                json!({"success": false, "message": message}),
            ),
            other => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"success": false, "error": other.to_string()}),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn query_from_params(mut params: HashMap<String, String>) -> QueryState {
    let limit = params
        .remove("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let page = params
        .remove("page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let order = match params.remove("order").as_deref() {
        Some("desc") => SortDirection::Desc,
        _ => SortDirection::Asc,
    };
    let mut query = QueryState::new(limit);
    if let Some(field) = params.remove("sort") {
        query = query.with_sort(field, order);
    }
    for (key, value) in params {
        query = query.with_filter(key, value);
    }
    query.with_page(page)
}

async fn list(
    State(remote): State<Arc<MemoryRemote>>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ErrorBody> {
    let query = query_from_params(params);
    let page = remote.list(&resource, &query).await.map_err(ErrorBody)?;
    let pagination = Pagination {
        page: page.page,
        limit: page.page_size,
        total: page.total,
        total_pages: Some(page.total_pages()),
    };
    Ok(Json(json!({
        "success": true,
        "data": page.records,
        "pagination": pagination,
    }))
    .into_response())
}

async fn create(
    State(remote): State<Arc<MemoryRemote>>,
    Path(resource): Path<String>,
    Json(fields): Json<Fields>,
) -> Result<Response, ErrorBody> {
    let record = remote.create(&resource, &fields).await.map_err(ErrorBody)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "data": record})),
    )
        .into_response())
}

async fn update(
    State(remote): State<Arc<MemoryRemote>>,
    Path((resource, id)): Path<(String, RecordId)>,
    Json(fields): Json<Fields>,
) -> Result<Response, ErrorBody> {
    let record = remote
        .update(&resource, id, &fields)
        .await
        .map_err(ErrorBody)?;
    Ok(Json(json!({"success": true, "data": record})).into_response())
}

async fn delete(
    State(remote): State<Arc<MemoryRemote>>,
    Path((resource, id)): Path<(String, RecordId)>,
) -> Result<Response, ErrorBody> {
    remote.delete(&resource, id).await.map_err(ErrorBody)?;
    Ok(Json(json!({"success": true, "message": "Deleted successfully"})).into_response())
}
