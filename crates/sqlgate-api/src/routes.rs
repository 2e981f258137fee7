//! API routes configuration
//!
//! All endpoints use the /v1 version prefix:
//! - GET  /v1/healthcheck - Health check endpoint
//! - /v1/admin/routes - Route definition CRUD
//! - /v1/api/* - Dynamic dispatch of declared routes (any method)

use actix_web::web;

use crate::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .route("/healthcheck", web::get().to(handlers::healthcheck))
            .service(
                web::scope("/admin/routes")
                    .service(handlers::list_routes)
                    .service(handlers::create_route)
                    .service(handlers::update_statement)
                    .service(handlers::delete_statement)
                    .service(handlers::get_route)
                    .service(handlers::update_route)
                    .service(handlers::delete_route),
            )
            .service(web::scope("/api").default_service(web::route().to(handlers::dispatch))),
    );
}
