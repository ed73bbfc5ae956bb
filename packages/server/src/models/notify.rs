use serde::Deserialize;

use crate::error::AppError;
use crate::mail::StatusEmail;

/// Outcome of a review, as reported to the student.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOutcome {
    Approved,
    Rejected,
}

/// Request body for notifying a student about the review of their work.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct NotifyRequest {
    pub status: ReviewOutcome,
    /// Link to the reviewed work.
    #[schema(example = "https://eseuri.com/work/42")]
    pub url: String,
    /// Student's first name.
    #[schema(example = "Ana")]
    pub name: String,
    /// Student's email address.
    #[schema(example = "ana@example.com")]
    pub email: String,
}

pub fn validate_notify_request(payload: &NotifyRequest) -> Result<(), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Name must not be empty".into()));
    }
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("Email address is invalid".into()));
    }
    if payload.url.trim().is_empty() {
        return Err(AppError::Validation("URL must not be empty".into()));
    }
    Ok(())
}

impl From<NotifyRequest> for StatusEmail {
    fn from(payload: NotifyRequest) -> Self {
        Self {
            to_name: payload.name.trim().to_string(),
            to_email: payload.email.trim().to_string(),
            approved: payload.status == ReviewOutcome::Approved,
            link: payload.url,
        }
    }
}
