//! Dynamic route dispatch.
//!
//! Every request under `/v1/api` lands here. Dispatch looks the request up
//! in the compiled route table, merges parameters from query string, JSON
//! body, and path captures, validates them against the route's
//! declarations, and hands the route to the task engine.
//!
//! # Example request
//! ```text
//! GET /v1/api/users/42?verbose=true
//! ```
//!
//! # Example response
//! ```json
//! {
//!   "status": "success",
//!   "result": {"id": 42, "name": "Alice"},
//!   "took_ms": 12
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, warn};
use serde_json::Value as JsonValue;
use sqlgate_commons::GatewayError;
use sqlgate_core::{params, ParamMap};

use crate::models::{status_for, ApiResponse};
use crate::state::ApiState;

/// Catch-all handler for declared routes. Registered as the default
/// service of the `/api` scope, so the method/path space is entirely
/// table-driven.
pub async fn dispatch(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<Arc<ApiState>>,
) -> HttpResponse {
    let start = Instant::now();
    let method = req.method().as_str();
    let path = route_tail(&req);

    let table = state.table();
    let (route, path_params) = match table.lookup(method, &path) {
        Some(hit) => hit,
        None => {
            debug!("no route for {} {}", method, path);
            let took_ms = start.elapsed().as_millis() as u64;
            return HttpResponse::NotFound().json(ApiResponse::error(
                "ROUTE_NOT_FOUND",
                format!("no route matches {} {}", method, path),
                took_ms,
            ));
        }
    };

    let query_params = parse_query(req.query_string());
    let body_params = match parse_body(&body) {
        Ok(map) => map,
        Err(message) => {
            let took_ms = start.elapsed().as_millis() as u64;
            return HttpResponse::BadRequest().json(ApiResponse::error(
                "INVALID_BODY",
                message,
                took_ms,
            ));
        }
    };

    let merged = params::merge(query_params, body_params, path_params);
    let validated = match params::validate(&route.def.params, &merged) {
        Ok(map) => map,
        Err(fields) => {
            let took_ms = start.elapsed().as_millis() as u64;
            let err = GatewayError::ParameterValidation(fields);
            return HttpResponse::build(status_for(&err))
                .json(ApiResponse::from_gateway_error(&err, took_ms));
        }
    };

    match state.engine.execute_route(&route.def, &validated).await {
        Ok(outcome) => {
            let took_ms = start.elapsed().as_millis() as u64;
            debug!("route '{}' completed in {}ms", route.def.id, took_ms);
            let result = match serde_json::to_value(&outcome) {
                Ok(value) => value,
                Err(e) => {
                    warn!("route '{}' result not serializable: {}", route.def.id, e);
                    return HttpResponse::InternalServerError().json(ApiResponse::error(
                        "INTERNAL",
                        "result serialization failed",
                        took_ms,
                    ));
                }
            };
            HttpResponse::Ok()
                .content_type(route.def.content_type.clone())
                .json(ApiResponse::success(result, took_ms))
        }
        Err(err) => {
            let took_ms = start.elapsed().as_millis() as u64;
            warn!("route '{}' failed: {}", route.def.id, err);
            HttpResponse::build(status_for(&err))
                .json(ApiResponse::from_gateway_error(&err, took_ms))
        }
    }
}

/// Path remainder after the `/api` scope prefix.
fn route_tail(req: &HttpRequest) -> String {
    let tail = req.match_info().unprocessed();
    if !tail.is_empty() {
        return tail.to_string();
    }
    req.path()
        .strip_prefix("/v1/api")
        .unwrap_or_else(|| req.path())
        .to_string()
}

/// Query-string parameters, percent-decoded, as JSON strings. Validation
/// coerces them to their declared types afterwards.
///
/// A key repeated in the query string resolves to its LAST occurrence —
/// the same last-wins rule the merge applies across sources (path over
/// body over query).
fn parse_query(query: &str) -> ParamMap {
    let mut map = ParamMap::new();
    if query.is_empty() {
        return map;
    }
    match web::Query::<Vec<(String, String)>>::from_query(query) {
        Ok(pairs) => {
            for (key, value) in pairs.into_inner() {
                map.insert(key, JsonValue::String(value));
            }
        }
        Err(e) => debug!("unparseable query string ignored: {}", e),
    }
    map
}

/// JSON body parameters. An empty body is no parameters; anything else
/// must be a JSON object.
fn parse_body(body: &[u8]) -> Result<ParamMap, String> {
    if body.is_empty() {
        return Ok(ParamMap::new());
    }
    let value: JsonValue =
        serde_json::from_slice(body).map_err(|e| format!("request body is not valid JSON: {e}"))?;
    match value {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Ok(ParamMap::new()),
        other => Err(format!(
            "request body must be a JSON object, got {}",
            type_name(&other)
        )),
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
