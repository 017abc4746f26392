//! Input sanitization.
//!
//! - Query strings: repeated parameters collapse to their last value and
//!   operator-style keys (`$gt`, `a.b`) are dropped.
//! - JSON bodies: the same keys are stripped at every depth and `<` / `>`
//!   in string values are HTML-escaped.

use crate::error::ApiError;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, HeaderValue, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::debug;

/// Largest JSON body the sanitizer will buffer.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn sanitize_request(request: Request<Body>, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    if let Some(query) = parts.uri.query() {
        let cleaned = dedupe_query(query);
        if cleaned != query {
            match rebuild_uri(&parts.uri, &cleaned) {
                Some(uri) => parts.uri = uri,
                None => return ApiError::validation("Malformed query string").into_response(),
            }
        }
    }

    if !is_json_content_type(&parts.headers) {
        return next.run(Request::from_parts(parts, body)).await;
    }

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return ApiError::validation("Request body too large").into_response(),
    };

    // Unparseable bodies go through untouched; the JSON extractor reports them
    let bytes = match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut value) => {
            sanitize_value(&mut value);
            match serde_json::to_vec(&value) {
                Ok(clean) => clean.into(),
                Err(_) => bytes,
            }
        }
        Err(_) => bytes,
    };

    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Same acceptance rule as axum's `Json` extractor: `application/json` or
/// any `application/*+json`, case-insensitive, parameters ignored.
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(mime) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
    else {
        return false;
    };

    mime.type_() == "application"
        && (mime.subtype() == "json" || mime.suffix().is_some_and(|name| name == "json"))
}

/// Strip operator-injection keys and escape markup, recursively.
pub fn sanitize_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| {
                let keep = !is_operator_key(key);
                if !keep {
                    debug!("Stripped key from request body: {}", key);
                }
                keep
            });
            for v in map.values_mut() {
                sanitize_value(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize_value),
        Value::String(s) => {
            if s.contains(['<', '>']) {
                *s = s.replace('<', "&lt;").replace('>', "&gt;");
            }
        }
        _ => {}
    }
}

fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

/// Keep the last value of each parameter, in first-seen order.
pub fn dedupe_query(query: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = Vec::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let key = pair.split('=').next().unwrap_or(pair);
        if is_operator_key(&percent_decode_lossy(key)) {
            continue;
        }
        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = pair,
            None => pairs.push((key, pair)),
        }
    }

    pairs
        .into_iter()
        .map(|(_, pair)| pair)
        .collect::<Vec<_>>()
        .join("&")
}

// Only needs to reveal `$` and `.` hidden behind escapes
fn percent_decode_lossy(raw: &str) -> String {
    raw.replace("%24", "$")
        .replace("%2E", ".")
        .replace("%2e", ".")
}

fn rebuild_uri(uri: &Uri, query: &str) -> Option<Uri> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}
