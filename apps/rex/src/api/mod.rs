//! # HTTP API
//!
//! ```text
//! GET    /health          unauthenticated liveness check
//! POST   /fork            {source_id, status?}
//! POST   /save            {id?, post_type?, data}
//! POST   /publish         {staging_id}
//! GET    /posts/{id}      item view
//! DELETE /posts/{id}      ?force=bool
//! ```
//!
//! Every route but `/health` requires Basic (login + application password)
//! or Bearer (API key) authentication and is subject to the rate limit.

pub mod auth;
pub mod handlers;
pub mod payload;
pub mod rate_limit;

use crate::backend::Backend;
use crate::config::Config;
use crate::directory::SharedDirectory;
use crate::error::AppError;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::routing::{get, post};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<Backend>,
    pub directory: SharedDirectory,
}

impl AppState {
    pub fn new(backend: Backend, directory: SharedDirectory) -> Self {
        Self {
            backend: Arc::new(backend),
            directory,
        }
    }
}

/// Build the application router.
pub fn create_router(state: AppState, config: &Config) -> Result<Router, AppError> {
    let mut api = Router::new()
        .route("/fork", post(handlers::fork))
        .route("/save", post(handlers::save))
        .route("/publish", post(handlers::publish))
        .route(
            "/posts/{id}",
            get(handlers::get_post).delete(handlers::delete_post),
        );
    if let Some(limiter) = rate_limit::limiter(config.rate_limit_per_second) {
        api = api.route_layer(middleware::from_fn_with_state(limiter, rate_limit::enforce));
    }

    let router = Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors_origins)?),
        )
        .with_state(state);
    Ok(router)
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, AppError> {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let parsed = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| AppError::Config(format!("invalid CORS origin '{}'", origin)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(parsed)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}
