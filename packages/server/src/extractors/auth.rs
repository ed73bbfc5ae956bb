use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::error::AppError;
use crate::graphql::queries::{self, UserRow};
use crate::graphql::GraphQLClient;
use crate::state::AppState;
use crate::utils::jwt::Claims;

/// Request header opting a single request into GraphQL client logs.
pub const SHOW_GRAPHQL_LOGS_HEADER: &str = "X-Eseuri-Show-GraphQL-Logs";

/// Caller authenticated by the `Authorization: Bearer <token>` header.
///
/// Registration state is only reported here; use [`RegisteredUser`] to require it.
#[derive(Debug)]
pub struct AuthUser {
    pub claims: Claims,
    /// The raw bearer token, for calls made with the caller's own permissions.
    pub token: String,
    /// Whether GraphQL traffic for this request should be logged.
    pub log_graphql: bool,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::TokenMissing)?;

        let claims = state.verifier.verify(token).map_err(|e| {
            debug!(error = %e, "token rejected");
            AppError::TokenInvalid
        })?;

        let log_graphql = parts
            .headers
            .get(SHOW_GRAPHQL_LOGS_HEADER)
            .is_some_and(|v| v.as_bytes() == b"true");

        debug!(
            user_id = claims.user_id,
            role = %claims.role,
            is_registered = claims.is_registered,
            "authenticated"
        );

        Ok(AuthUser {
            claims,
            token: token.to_string(),
            log_graphql,
        })
    }
}

/// Authenticated caller who has completed registration.
///
/// Trusts the token's registration claim when it is set; otherwise confirms
/// with one user lookup made with the caller's own token.
#[derive(Debug)]
pub struct RegisteredUser(pub AuthUser);

impl FromRequestParts<AppState> for RegisteredUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.claims.is_registered {
            return Ok(Self(user));
        }

        let row = find_user_as_caller(&state.graphql, &user).await?;
        if row.is_some_and(|r| r.is_registered()) {
            Ok(Self(user))
        } else {
            Err(AppError::Unregistered)
        }
    }
}

/// Look up the caller's own user row with the caller's permissions.
pub async fn find_user_as_caller(
    graphql: &GraphQLClient,
    user: &AuthUser,
) -> Result<Option<UserRow>, AppError> {
    let output: queries::UserOutput = graphql
        .run(
            queries::user_by_id(user.claims.user_id)
                .authorize(&user.token)
                .log(user.log_graphql),
        )
        .await?;
    Ok(output.users.into_iter().next())
}
