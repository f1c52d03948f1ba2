// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request handlers. JSON bodies use camelCase keys.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use photoprint_core::error::{PhotoprintError, Result};
use photoprint_core::troubleshooting::guidance_for;
use photoprint_core::types::{MAX_COPIES, MediaKind, PageSize, PrintJob};
use photoprint_print::advertise::PHOTOPRINT_SERVICE_TYPE;

use super::state::AppState;

/// Body of `POST /print`, read leniently from whatever JSON arrived.
///
/// Optional fields of the wrong type fall back to their defaults with a
/// warning; only `data` can turn a request into a 400.
#[derive(Debug, Default)]
pub struct PrintRequest {
    pub copies: u32,
    pub mime_type: Option<String>,
    pub data: Option<String>,
    pub target_printer: Option<String>,
    pub has_access: bool,
    pub template: Option<PageSize>,
}

impl PrintRequest {
    pub fn from_json(body: &Value) -> Self {
        let field = |key: &str| body.get(key).filter(|v| !v.is_null());
        let text = |key: &str| {
            let value = field(key)?;
            match value.as_str() {
                Some(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(_) => None,
                None => {
                    warn!(field = key, %value, "ignoring non-string field");
                    None
                }
            }
        };

        Self {
            copies: parse_copies(field("copies")),
            mime_type: text("mimeType"),
            data: field("data")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(String::from),
            target_printer: text("targetPrinter"),
            has_access: field("hasAccess").is_some_and(parse_access),
            template: field("template").and_then(parse_template),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintersResponse {
    pub default_printer: String,
    pub available_printers: Vec<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn printers_response(state: &AppState, success: Option<bool>) -> PrintersResponse {
    PrintersResponse {
        default_printer: state.orchestrator.default_printer_label(),
        available_printers: state.orchestrator.snapshot().known_printers.clone(),
        timestamp: timestamp(),
        success,
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message, "success": false })),
    )
        .into_response()
}

/// GET /printers
pub async fn printers(State(state): State<Arc<AppState>>) -> Json<PrintersResponse> {
    Json(printers_response(&state, None))
}

/// GET /printers/refresh
pub async fn refresh_printers(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.refresh().await {
        Ok(_) => Json(printers_response(&state, Some(true))).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to refresh printers", "success": false })),
        )
            .into_response(),
    }
}

/// POST /print
///
/// The body is taken as raw bytes so a missing `Content-Type` or a badly
/// typed optional field still gets a JSON answer from the relay.
pub async fn print(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let body: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "print body is not JSON");
                return bad_request("Invalid JSON body");
            }
        }
    };
    let req = PrintRequest::from_json(&body);

    let Some(data) = req.data.as_deref() else {
        return bad_request("Missing base64 data");
    };

    let (inline_mime, encoded) = split_data_url(data);
    let payload = match decode_payload(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "rejecting print request");
            return bad_request("Invalid base64 data");
        }
    };

    let mime = req.mime_type.as_deref().or(inline_mime).unwrap_or("image/png");
    let mut job = PrintJob::new(payload, MediaKind::from_mime(mime));
    job.copies = req.copies;
    job.requested_printer = req.target_printer;
    job.restricted = !req.has_access;
    job.target_page_size = req.template;
    debug!(job_id = %job.id, mime, bytes = job.payload.len(), "print request accepted");

    match state.orchestrator.submit(job).await {
        Ok(report) => Json(json!({
            "jobId": report.job_id.to_string(),
            "copies": report.copies,
            "printer": report.printer,
            "success": true,
        }))
        .into_response(),
        Err(failure) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to print",
                "jobId": failure.job_id.to_string(),
                "printer": failure.printer,
                "success": false,
                "troubleshooting": guidance_for(&failure.error),
            })),
        )
            .into_response(),
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "printer": state.orchestrator.default_printer_label(),
        "timestamp": timestamp(),
    }))
}

/// GET /info
pub async fn info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "name": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "service": PHOTOPRINT_SERVICE_TYPE,
        "endpoints": ["/print", "/printers", "/printers/refresh", "/health", "/info"],
        "supportedFormats": [MediaKind::Png.mime_type(), MediaKind::Jpeg.mime_type()],
        "platform": state.platform.name(),
    }))
}

/// Strip a `data:<mime>;base64,` prefix, returning its MIME type if any.
fn split_data_url(data: &str) -> (Option<&str>, &str) {
    let Some(rest) = data.trim_start().strip_prefix("data:") else {
        return (None, data);
    };
    match rest.split_once(',') {
        Some((header, body)) => {
            let mime = header.split(';').next().filter(|m| !m.is_empty());
            (mime, body)
        }
        None => (None, data),
    }
}

fn decode_payload(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| PhotoprintError::InvalidPayload(format!("base64: {e}")))?;
    if bytes.is_empty() {
        return Err(PhotoprintError::InvalidPayload("decoded payload is empty".into()));
    }
    Ok(bytes)
}

/// Missing, zero, negative or non-numeric copies print once; large counts
/// are capped at [`MAX_COPIES`].
fn parse_copies(value: Option<&Value>) -> u32 {
    let requested = value
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 1.0).map(|f| f as u64)))
        .unwrap_or(1);
    let copies = u32::try_from(requested).unwrap_or(u32::MAX).clamp(1, MAX_COPIES);
    if u64::from(copies) < requested {
        warn!(requested, copies, "copy count capped");
    }
    copies
}

/// `true`, or the string `"true"` in any case. Anything else is restricted.
fn parse_access(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        other => {
            warn!(value = %other, "ignoring malformed hasAccess");
            false
        }
    }
}

/// A well-formed template within [`PageSize::is_valid`], otherwise ignored.
fn parse_template(value: &Value) -> Option<PageSize> {
    match serde_json::from_value::<PageSize>(value.clone()) {
        Ok(page) if page.is_valid() => Some(page),
        Ok(page) => {
            warn!(?page, "ignoring out-of-range template size");
            None
        }
        Err(e) => {
            warn!(error = %e, "ignoring malformed template");
            None
        }
    }
}
