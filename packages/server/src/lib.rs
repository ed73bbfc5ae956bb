pub mod config;
pub mod documents;
pub mod error;
pub mod extractors;
pub mod graphql;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Eseuri API",
        version = "1.0.0",
        description = "Backend for the Eseuri essay-sharing platform"
    ),
    tags(
        (name = "Works", description = "Uploading essays and characterizations"),
        (name = "Users", description = "Current user information"),
        (name = "Notifications", description = "Review status emails"),
        (name = "Health", description = "Liveness"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let configured = &config.server.cors.allow_origins;
    let origins: Vec<String> = if configured.is_empty() {
        vec![config.deployment.client_url()]
    } else {
        configured.clone()
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-eseuri-show-graphql-logs"),
        ])
        .max_age(Duration::from_secs(config.server.cors.max_age))
}

/// Build the application router.
///
/// When deployed on the hosting platform the API is mounted under the functions
/// base path; locally it is served from the root.
pub fn build_router(state: AppState) -> axum::Router {
    let config = state.config.clone();
    let routes = routes::api_routes(&config.server);

    let base = OpenApiRouter::with_openapi(ApiDoc::openapi());
    let router = match config.deployment.functions_base_path() {
        Some(prefix) => base.nest(prefix, routes),
        None => base.merge(routes),
    };
    let (router, api) = router.split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
}
