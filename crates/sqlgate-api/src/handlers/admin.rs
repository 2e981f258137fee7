//! Admin CRUD for route definitions under `/v1/admin/routes`.
//!
//! Every mutation persists to the route document first, then recompiles
//! and swaps the dispatch table. A failed persist leaves the live table
//! untouched.

use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use log::info;
use serde::Deserialize;
use serde_json::json;
use sqlgate_commons::RouteDef;

use crate::state::ApiState;
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
pub struct StatementUpdate {
    pub sql: String,
}

/// GET /v1/admin/routes - List all route definitions
#[get("")]
pub async fn list_routes(state: web::Data<Arc<ApiState>>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "success",
        "routes": state.store.list(),
    }))
}

/// GET /v1/admin/routes/{id} - Fetch one route definition
#[get("/{id}")]
pub async fn get_route(
    path: web::Path<String>,
    state: web::Data<Arc<ApiState>>,
) -> impl Responder {
    let id = path.into_inner();
    match state.store.get(&id) {
        Some(route) => HttpResponse::Ok().json(json!({
            "status": "success",
            "route": route,
        })),
        None => store_error_response(&StoreError::NotFound(id)),
    }
}

/// POST /v1/admin/routes - Create a route definition
#[post("")]
pub async fn create_route(
    route: web::Json<RouteDef>,
    state: web::Data<Arc<ApiState>>,
) -> impl Responder {
    let route = route.into_inner();
    let id = route.id.clone();
    match state.store.create(route) {
        Ok(()) => {
            info!("route '{}' created", id);
            rebuild_and_respond(&state, HttpResponse::Created().json(json!({
                "status": "success",
                "id": id,
            })))
        }
        Err(e) => store_error_response(&e),
    }
}

/// PUT /v1/admin/routes/{id} - Replace a route definition
#[put("/{id}")]
pub async fn update_route(
    path: web::Path<String>,
    route: web::Json<RouteDef>,
    state: web::Data<Arc<ApiState>>,
) -> impl Responder {
    let id = path.into_inner();
    match state.store.update(&id, route.into_inner()) {
        Ok(()) => {
            info!("route '{}' updated", id);
            rebuild_and_respond(&state, ok_json(&id))
        }
        Err(e) => store_error_response(&e),
    }
}

/// DELETE /v1/admin/routes/{id} - Remove a route definition
#[delete("/{id}")]
pub async fn delete_route(
    path: web::Path<String>,
    state: web::Data<Arc<ApiState>>,
) -> impl Responder {
    let id = path.into_inner();
    match state.store.delete(&id) {
        Ok(()) => {
            info!("route '{}' deleted", id);
            rebuild_and_respond(&state, ok_json(&id))
        }
        Err(e) => store_error_response(&e),
    }
}

/// PUT /v1/admin/routes/{id}/statements/{sid} - Replace one statement's SQL
#[put("/{id}/statements/{sid}")]
pub async fn update_statement(
    path: web::Path<(String, String)>,
    update: web::Json<StatementUpdate>,
    state: web::Data<Arc<ApiState>>,
) -> impl Responder {
    let (route_id, statement_id) = path.into_inner();
    match state
        .store
        .update_statement(&route_id, &statement_id, update.into_inner().sql)
    {
        Ok(()) => {
            info!("statement '{}/{}' updated", route_id, statement_id);
            rebuild_and_respond(&state, ok_json(&route_id))
        }
        Err(e) => store_error_response(&e),
    }
}

/// DELETE /v1/admin/routes/{id}/statements/{sid} - Remove one statement
#[delete("/{id}/statements/{sid}")]
pub async fn delete_statement(
    path: web::Path<(String, String)>,
    state: web::Data<Arc<ApiState>>,
) -> impl Responder {
    let (route_id, statement_id) = path.into_inner();
    match state.store.delete_statement(&route_id, &statement_id) {
        Ok(()) => {
            info!("statement '{}/{}' deleted", route_id, statement_id);
            rebuild_and_respond(&state, ok_json(&route_id))
        }
        Err(e) => store_error_response(&e),
    }
}

fn ok_json(id: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "success",
        "id": id,
    }))
}

/// The store persisted; the dispatch table must follow. A rebuild failure
/// here means the document on disk no longer compiles, which is a server
/// bug, not a client error.
fn rebuild_and_respond(state: &web::Data<Arc<ApiState>>, ok: HttpResponse) -> HttpResponse {
    match state.rebuild_table() {
        Ok(()) => ok,
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "status": "error",
            "error": {
                "code": "ROUTE_TABLE_REBUILD",
                "message": e,
            }
        })),
    }
}

fn store_error_response(err: &StoreError) -> HttpResponse {
    let (mut builder, code) = match err {
        StoreError::NotFound(_) => (HttpResponse::NotFound(), "ROUTE_NOT_FOUND"),
        StoreError::Conflict(_) => (HttpResponse::Conflict(), "ROUTE_CONFLICT"),
        StoreError::Invalid(_) => (HttpResponse::BadRequest(), "ROUTE_INVALID"),
        StoreError::Io(_) | StoreError::Parse(_) => {
            (HttpResponse::InternalServerError(), "ROUTE_STORE")
        }
    };
    builder.json(json!({
        "status": "error",
        "error": {
            "code": code,
            "message": err.to_string(),
        }
    }))
}
