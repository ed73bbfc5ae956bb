use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::ServerConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &ServerConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::upload::upload_work))
        .layer(handlers::upload::upload_body_limit(config.upload_limit));

    OpenApiRouter::new()
        .routes(routes!(
            handlers::health::health,
            handlers::notify::notify_user
        ))
        .routes(routes!(handlers::user::user_info))
        .routes(routes!(handlers::user::is_registered))
        .merge(upload)
}
