//! Minimal GraphQL client for the hosted database.
//!
//! Results are typed: a query rejected by the engine is a [`GraphQLError::Query`],
//! everything else (unreachable engine, unexpected status, undecodable body) is a
//! transport-level failure.

pub mod queries;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use crate::config::GraphQLConfig;
use crate::utils::jwt::Claims;

pub const ADMIN_SECRET_HEADER: &str = "X-Hasura-Admin-Secret";
pub const BACKEND_ONLY_HEADER: &str = "X-Hasura-Use-Backend-Only-Permissions";
pub const ROLE_HEADER: &str = "X-Hasura-Role";
pub const USER_ID_HEADER: &str = "X-Hasura-User-Id";
const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Debug, Error)]
pub enum GraphQLError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("{}", .0.join("; "))]
    Query(Vec<String>),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// A single GraphQL operation with its variables and per-call headers.
#[derive(Debug, Clone)]
pub struct GraphQLRequest {
    query: &'static str,
    variables: Map<String, Value>,
    headers: Vec<(&'static str, String)>,
    promote: bool,
    log: bool,
}

impl GraphQLRequest {
    pub fn new(query: &'static str) -> Self {
        Self {
            query,
            variables: Map::new(),
            headers: Vec::new(),
            promote: false,
            log: false,
        }
    }

    pub fn var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Run the operation as the given user.
    pub fn impersonate(self, claims: &Claims) -> Self {
        self.header(ROLE_HEADER, claims.role.as_str())
            .header(USER_ID_HEADER, claims.user_id.to_string())
    }

    /// Run the operation with the caller's own bearer token.
    pub fn authorize(self, bearer: &str) -> Self {
        self.header(AUTHORIZATION_HEADER, format!("Bearer {bearer}"))
    }

    /// Attach the admin secret and enable backend-only permissions for this call.
    pub fn promote(mut self) -> Self {
        self.promote = true;
        self
    }

    /// Log the operation and the raw response at debug level.
    pub fn log(mut self, enabled: bool) -> Self {
        self.log = enabled;
        self
    }

}

#[derive(Deserialize)]
struct Envelope {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<QueryError>,
}

#[derive(Deserialize)]
struct QueryError {
    message: String,
}

#[derive(Clone)]
pub struct GraphQLClient {
    http: reqwest::Client,
    url: String,
    admin_secret: String,
}

impl GraphQLClient {
    pub fn new(http: reqwest::Client, config: &GraphQLConfig) -> Self {
        Self {
            http,
            url: config.url(),
            admin_secret: config.admin_secret.clone(),
        }
    }

    pub async fn run<T: DeserializeOwned>(
        &self,
        request: GraphQLRequest,
    ) -> Result<T, GraphQLError> {
        if request.log {
            debug!(
                target: "graphql",
                query = request.query,
                variables = %serde_json::Value::Object(request.variables.clone()),
                "request"
            );
        }

        let mut builder = self.http.post(&self.url).json(&json!({
            "query": request.query,
            "variables": request.variables,
        }));
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if request.promote {
            builder = builder
                .header(ADMIN_SECRET_HEADER, &self.admin_secret)
                .header(BACKEND_ONLY_HEADER, "true");
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if request.log {
            debug!(
                target: "graphql",
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "response"
            );
        }

        decode_response(status.as_u16(), &body)
    }
}

fn decode_response<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, GraphQLError> {
    let success = (200..300).contains(&status);

    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if !success => return Err(GraphQLError::Status(status)),
        Err(e) => return Err(GraphQLError::Decode(e.to_string())),
    };

    if !envelope.errors.is_empty() {
        return Err(GraphQLError::Query(
            envelope.errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    if !success {
        return Err(GraphQLError::Status(status));
    }

    let data = envelope
        .data
        .ok_or_else(|| GraphQLError::Decode("response has neither data nor errors".into()))?;
    serde_json::from_value(data).map_err(|e| GraphQLError::Decode(e.to_string()))
}
