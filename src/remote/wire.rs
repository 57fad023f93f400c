//! Wire format of the resource endpoints and the single decode step that turns
//! a response into a trusted value or an error.
//!
//! ```text
//! GET    /{resource}?page&limit&sort&order&<filters> -> { success, data: [..], pagination?: {..} }
//! POST   /{resource}        -> { success, data: {..} }
//! PUT    /{resource}/{id}   -> { success, data: {..} }
//! DELETE /{resource}/{id}   -> { success, message }
//! ```

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{FieldErrors, SyncError};
use crate::query::QueryState;
use crate::store::{PageResult, Record};

const RESERVED_PARAMS: [&str; 4] = ["page", "limit", "sort", "order"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<Vec<Record>>,
    #[serde(default)]
    pagination: Option<Pagination>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<Record>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AckEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Option<Value>,
}

/// Query parameters for a list request. Filters named like a paging or
/// sort parameter are dropped.
pub fn list_params(query: &QueryState) -> Vec<(String, String)> {
    let mut params = vec![
        ("page".to_string(), query.page().to_string()),
        ("limit".to_string(), query.page_size().to_string()),
    ];
    if let Some(field) = query.sort_field() {
        params.push(("sort".to_string(), field.to_string()));
        params.push(("order".to_string(), query.sort_direction().to_string()));
    }
    for (key, value) in query.filters() {
        if RESERVED_PARAMS.contains(&key.as_str()) {
            warn!("ignoring filter '{}': clashes with a paging parameter", key);
            continue;
        }
        params.push((key.clone(), value.clone()));
    }
    params
}

pub fn decode_page(status: u16, body: &[u8], query: &QueryState) -> Result<PageResult, SyncError> {
    if !is_success(status) {
        return Err(error_from_response(status, body));
    }
    let envelope: ListEnvelope = serde_json::from_slice(body)?;
    if !envelope.success {
        return Err(server_error(status, envelope.message.or(envelope.error)));
    }
    let records = envelope
        .data
        .ok_or_else(|| SyncError::Parse("list response has no data".into()))?;

    match envelope.pagination {
        Some(p) => {
            if p.page == 0 || p.limit == 0 {
                return Err(SyncError::Parse(format!(
                    "invalid pagination: page {} limit {}",
                    p.page, p.limit
                )));
            }
            Ok(PageResult {
                records,
                total: p.total,
                page: p.page,
                page_size: p.limit,
            })
        }
        None => Ok(PageResult {
            total: records.len() as u64,
            records,
            page: query.page(),
            page_size: query.page_size(),
        }),
    }
}

pub fn decode_record(status: u16, body: &[u8]) -> Result<Record, SyncError> {
    if !is_success(status) {
        return Err(error_from_response(status, body));
    }
    let envelope: RecordEnvelope = serde_json::from_slice(body)?;
    if !envelope.success {
        return Err(server_error(status, envelope.message.or(envelope.error)));
    }
    envelope
        .data
        .ok_or_else(|| SyncError::Parse("response has no data".into()))
}

pub fn decode_ack(status: u16, body: &[u8]) -> Result<(), SyncError> {
    if !is_success(status) {
        return Err(error_from_response(status, body));
    }
    // Some endpoints answer a delete with an empty 204.
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    let envelope: AckEnvelope = serde_json::from_slice(body)?;
    if !envelope.success {
        return Err(server_error(status, envelope.message.or(envelope.error)));
    }
    Ok(())
}

/// Map a non-2xx response to an error, keeping whatever message the server sent.
pub fn error_from_response(status: u16, body: &[u8]) -> SyncError {
    let envelope: ErrorEnvelope = serde_json::from_slice(body).unwrap_or_default();
    let message = envelope
        .message
        .or(envelope.error)
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty() && !text.starts_with('{')).then_some(text)
        })
        .unwrap_or_else(|| format!("request failed with status {status}"));

    match status {
        400 | 422 => SyncError::Validation {
            message,
            fields: envelope.errors.map(field_errors).unwrap_or_default(),
        },
        404 => SyncError::NotFound(message),
        409 => SyncError::Conflict(message),
        _ => SyncError::Server {
            status: Some(status),
            message,
        },
    }
}

fn server_error(status: u16, message: Option<String>) -> SyncError {
    SyncError::Server {
        status: Some(status),
        message: message.unwrap_or_else(|| "request was not successful".into()),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Accepts `{ "field": "msg" | ["msg", ..] }` or
/// `[{ "field" | "path" | "param": .., "message" | "msg": .. }]`.
fn field_errors(errors: Value) -> FieldErrors {
    let mut fields = FieldErrors::new();
    match errors {
        Value::Object(map) => {
            for (field, messages) in map {
                fields.entry(field).or_default().extend(messages_of(messages));
            }
        }
        Value::Array(items) => {
            for item in items {
                let Value::Object(item) = item else { continue };
                let field = ["field", "path", "param"]
                    .iter()
                    .find_map(|k| item.get(*k).and_then(Value::as_str));
                let message = ["message", "msg"]
                    .iter()
                    .find_map(|k| item.get(*k).and_then(Value::as_str));
                if let (Some(field), Some(message)) = (field, message) {
                    fields
                        .entry(field.to_string())
                        .or_default()
                        .push(message.to_string());
                }
            }
        }
        _ => {}
    }
    fields
}

fn messages_of(value: Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
