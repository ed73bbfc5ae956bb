use axum::extract::State;
use axum::http::StatusCode;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::RegisteredUser;
use crate::extractors::body::AppJson;
use crate::mail::StatusEmail;
use crate::models::notify::{NotifyRequest, validate_notify_request};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Notifications",
    operation_id = "notifyUser",
    summary = "Email a student about the review of their work",
    request_body = NotifyRequest,
    responses(
        (status = 200, description = "Email accepted by the provider"),
        (status = 400, description = "Invalid body or missing token", body = ErrorBody),
        (status = 401, description = "Invalid or expired token, or unregistered user", body = ErrorBody),
        (status = 500, description = "Email provider failure", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all, fields(user_id = user.claims.user_id))]
pub async fn notify_user(
    State(state): State<AppState>,
    RegisteredUser(user): RegisteredUser,
    AppJson(payload): AppJson<NotifyRequest>,
) -> Result<StatusCode, AppError> {
    validate_notify_request(&payload)?;

    let email = StatusEmail::from(payload);
    state.mailer.send_status(&email).await?;

    info!(approved = email.approved, "status email sent");
    Ok(StatusCode::OK)
}
