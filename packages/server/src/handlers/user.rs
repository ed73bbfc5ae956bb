use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, find_user_as_caller};
use crate::graphql::queries::{self, UserOutput};
use crate::models::user::{IsRegisteredResponse, UserInfoResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/user",
    tag = "Users",
    operation_id = "getUserInfo",
    summary = "Get the current user",
    description = "Returns the caller's ID, role and registration state as stored in the database.",
    responses(
        (status = 200, description = "Current user", body = UserInfoResponse),
        (status = 400, description = "Missing or malformed token", body = ErrorBody),
        (status = 401, description = "Invalid or expired token", body = ErrorBody),
        (status = 404, description = "User does not exist", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all, fields(user_id = user.claims.user_id))]
pub async fn user_info(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserInfoResponse>, AppError> {
    let output: UserOutput = state
        .graphql
        .run(
            queries::user_by_id(user.claims.user_id)
                .impersonate(&user.claims)
                .promote()
                .log(user.log_graphql),
        )
        .await?;

    let row = output
        .users
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("user does not exist".into()))?;

    Ok(Json(UserInfoResponse {
        id: user.claims.user_id,
        is_registered: row.is_registered(),
        role: row.role,
    }))
}

#[utoipa::path(
    get,
    path = "/isregistered",
    tag = "Users",
    operation_id = "isRegistered",
    summary = "Check whether the current user completed registration",
    responses(
        (status = 200, description = "Registration state", body = IsRegisteredResponse),
        (status = 400, description = "Missing or malformed token", body = ErrorBody),
        (status = 401, description = "Invalid or expired token", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all, fields(user_id = user.claims.user_id))]
pub async fn is_registered(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<IsRegisteredResponse>, AppError> {
    if user.claims.is_registered {
        return Ok(Json(IsRegisteredResponse {
            is_registered: true,
        }));
    }

    let row = find_user_as_caller(&state.graphql, &user).await?;

    Ok(Json(IsRegisteredResponse {
        is_registered: row.is_some_and(|r| r.is_registered()),
    }))
}
