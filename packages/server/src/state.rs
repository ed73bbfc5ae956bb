use std::sync::Arc;

use crate::config::AppConfig;
use crate::documents::DocumentExtractor;
use crate::graphql::GraphQLClient;
use crate::mail::Mailer;
use crate::utils::jwt::TokenVerifier;

/// Dependencies shared by all handlers. Built once at startup and injected,
/// so tests can swap the external services for fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub verifier: Arc<TokenVerifier>,
    pub graphql: GraphQLClient,
    pub documents: Arc<dyn DocumentExtractor>,
    pub mailer: Arc<dyn Mailer>,
}
