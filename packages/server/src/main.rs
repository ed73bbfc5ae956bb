use std::sync::Arc;

use anyhow::Context;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::documents::tika::TikaClient;
use server::graphql::GraphQLClient;
use server::mail::SendGridMailer;
use server::state::AppState;
use server::utils::jwt::TokenVerifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    server::error::install_panic_hook();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("eseuri-server/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let verifier = TokenVerifier::from_secret_json(&config.graphql.jwt_secret)
        .context("Invalid JWT secret")?;

    let state = AppState {
        verifier: Arc::new(verifier),
        graphql: GraphQLClient::new(http.clone(), &config.graphql),
        documents: Arc::new(TikaClient::new(http.clone(), &config.documents.url)),
        mailer: Arc::new(SendGridMailer::new(http, config.email.clone())),
        config: config.clone(),
    };

    let app = server::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        %addr,
        context = %config.deployment.context,
        client = %config.deployment.client_url(),
        "Server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
