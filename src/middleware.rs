//! Server-wide middleware configuration helpers.
//!
//! Keeps the Actix application setup focused by providing
//! reusable constructors for the CORS and logging layers.

use actix_web::http::{header::HeaderName, Method};
use actix_web::middleware;
use actix_cors::Cors;
use log::debug;

use crate::config::CorsSettings;

/// Build CORS middleware from server configuration using actix-cors.
///
/// Maps all CorsSettings options to actix-cors builder methods.
/// See: https://docs.rs/actix-cors/latest/actix_cors/struct.Cors.html
pub fn build_cors_from_config(cors_config: &CorsSettings) -> Cors {
    let mut cors = Cors::default();

    // Configure allowed origins
    if cors_config.allowed_origins.is_empty()
        || cors_config.allowed_origins.contains(&"*".to_string())
    {
        cors = cors.allow_any_origin();
        debug!("CORS: Allowing any origin");
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
        debug!("CORS: Allowed origins: {:?}", cors_config.allowed_origins);
    }

    // Configure allowed methods
    let methods: Vec<Method> = cors_config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    if !methods.is_empty() {
        cors = cors.allowed_methods(methods);
    }

    // Configure allowed headers
    if cors_config.allowed_headers.is_empty()
        || cors_config.allowed_headers.contains(&"*".to_string())
    {
        cors = cors.allow_any_header();
    } else {
        let headers: Vec<HeaderName> = cors_config
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        if !headers.is_empty() {
            cors = cors.allowed_headers(headers);
        }
    }

    // Configure credentials
    if cors_config.allow_credentials {
        cors = cors.supports_credentials();
    }

    // Configure max age
    cors = cors.max_age(cors_config.max_age as usize);

    cors
}

/// Build the request logger middleware.
pub fn request_logger() -> middleware::Logger {
    middleware::Logger::default()
}
