use axum::body::Bytes;
use serde::Serialize;

use crate::error::AppError;

use super::work::WorkType;

/// Raw fields of the `multipart/form-data` upload form.
#[derive(Debug, Default)]
pub struct WorkForm {
    /// Contents of the `file` field.
    pub file: Option<Bytes>,
    /// `type` field: `essay` or `characterization`.
    pub work_type: Option<String>,
    /// `subject` field: title or character ID.
    pub subject: Option<String>,
    /// `requestedTeacher` field: optional reviewer user ID.
    pub requested_teacher: Option<String>,
}

impl WorkForm {
    pub fn work_type(&self) -> Result<WorkType, AppError> {
        self.work_type
            .as_deref()
            .map(str::trim)
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| AppError::Validation("invalid work type".into()))
    }

    pub fn subject_id(&self) -> Result<i32, AppError> {
        let raw = self
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("missing subject".into()))?;
        match raw.parse::<i32>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(AppError::Validation("invalid subject".into())),
        }
    }

    /// Empty and `0` both mean no teacher was requested.
    pub fn requested_teacher_id(&self) -> Result<Option<i32>, AppError> {
        let Some(raw) = self
            .requested_teacher
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return Ok(None);
        };
        match raw.parse::<i32>() {
            Ok(0) => Ok(None),
            Ok(id) if id > 0 => Ok(Some(id)),
            _ => Err(AppError::Validation("invalid requested teacher".into())),
        }
    }

    /// The uploaded document. Browsers send an empty part when no file was chosen.
    pub fn take_file(&mut self) -> Result<Bytes, AppError> {
        self.file
            .take()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| AppError::Validation("no file was uploaded".into()))
    }
}

/// Successful upload response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    /// ID of the newly created work.
    #[schema(example = 42)]
    pub id: i32,
}
