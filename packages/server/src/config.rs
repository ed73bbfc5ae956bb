use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const LOCAL_CLIENT_URL: &str = "http://localhost:3000";

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty means "the client app URL".
    #[serde(default)]
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
    /// Maximum accepted size of an upload request body, in bytes.
    pub upload_limit: usize,
}

/// Where and how the service is deployed.
#[derive(Debug, Deserialize, Clone)]
pub struct DeploymentConfig {
    /// Running on the hosting platform rather than on a developer machine.
    pub hosted: bool,
    /// Deployment context: `production`, `preview` or `development`.
    pub context: String,
    /// Public URL of the client app when hosted.
    pub url: Option<String>,
    /// Prefix under which the hosting platform mounts the functions.
    pub base_path: String,
}

impl DeploymentConfig {
    pub fn is_hosted(&self) -> bool {
        self.hosted
    }

    pub fn is_production(&self) -> bool {
        self.context == "production"
    }

    pub fn is_development(&self) -> bool {
        !self.is_production()
    }

    pub fn is_preview(&self) -> bool {
        self.context == "preview"
    }

    /// Address at which the client app lives.
    pub fn client_url(&self) -> String {
        match (&self.url, self.hosted) {
            (Some(url), true) if url.starts_with("http") => url.clone(),
            (Some(url), true) => format!("https://{url}"),
            _ => LOCAL_CLIENT_URL.to_string(),
        }
    }

    /// Route prefix, only applied when hosted.
    pub fn functions_base_path(&self) -> Option<&str> {
        let base = self.base_path.trim_end_matches('/');
        (self.is_hosted() && !base.is_empty()).then_some(base)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphQLConfig {
    /// Base URL of the GraphQL engine, without the `/v1/graphql` suffix.
    pub endpoint: String,
    pub admin_secret: String,
    /// JSON key material used to verify bearer tokens, e.g.
    /// `{"type": "RS256", "key": "-----BEGIN PUBLIC KEY-----..."}`.
    pub jwt_secret: String,
}

impl GraphQLConfig {
    pub fn url(&self) -> String {
        format!("{}/v1/graphql", self.endpoint.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    /// Base URL of the text extraction service.
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub api_url: String,
    pub sender_address: String,
    pub sender_name: String,
    pub approved_template: String,
    pub rejected_template: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub deployment: DeploymentConfig,
    pub graphql: GraphQLConfig,
    pub documents: DocumentsConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 4000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("server.upload_limit", 32_i64 * 1024 * 1024)?
            .set_default("deployment.hosted", false)?
            .set_default("deployment.context", "development")?
            .set_default("deployment.base_path", "/api")?
            .set_default("email.api_url", "https://api.sendgrid.com")?
            .set_default("email.sender_address", "no-reply@eseuri.com")?
            .set_default("email.sender_name", "Eseuri")?
            .set_default("email.approved_template", "d-709b5b58f80543559068014c4e689bfc")?
            .set_default("email.rejected_template", "d-069856a4edc04fd7a0b5ba1709a09ebb")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ESEURI__GRAPHQL__ADMIN_SECRET)
            .add_source(
                Environment::with_prefix("ESEURI")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins"),
            )
            // Variables set by the hosting platform and the service dashboards
            .set_override_option("documents.url", env::var("TIKA_URL").ok())?
            .set_override_option("graphql.endpoint", env::var("HASURA_GRAPHQL_ENDPOINT").ok())?
            .set_override_option(
                "graphql.admin_secret",
                env::var("HASURA_GRAPHQL_ADMIN_SECRET").ok(),
            )?
            .set_override_option("graphql.jwt_secret", env::var("HASURA_GRAPHQL_JWT_SECRET").ok())?
            .set_override_option("email.api_key", env::var("SENDGRID_KEY").ok())?
            .set_override_option("deployment.hosted", env::var("VERCEL").ok().map(|v| v == "1"))?
            .set_override_option("deployment.context", env::var("VERCEL_ENV").ok())?
            .set_override_option("deployment.url", env::var("VERCEL_URL").ok())?
            .build()?;

        s.try_deserialize()
    }
}
