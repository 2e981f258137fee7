//! Health check handler.

use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::state::ApiState;

/// GET /v1/healthcheck - Server liveness plus per-datasource pool status.
///
/// No authentication required - designed for load balancer health checks.
/// Returns 200 even when individual datasources are down; their state is
/// reported in the `datasources` array.
pub async fn healthcheck(state: web::Data<Arc<ApiState>>) -> impl Responder {
    let pools = state.engine.pools().status();
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "routes": state.table().len(),
        "datasources": pools,
    }))
}
