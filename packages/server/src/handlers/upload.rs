use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::de::IgnoredAny;
use tracing::{error, info, instrument, warn};

use crate::documents;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, RegisteredUser};
use crate::extractors::body::AppMultipart;
use crate::graphql::queries::{self, InsertWorkOutput, UserOutput};
use crate::graphql::{GraphQLClient, GraphQLRequest};
use crate::models::upload::{UploadResponse, WorkForm};
use crate::models::user::Role;
use crate::models::work::{WorkStatus, WorkType};
use crate::state::AppState;

pub fn upload_body_limit(limit: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(limit)
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Works",
    operation_id = "uploadWork",
    summary = "Upload a work",
    description = "Extracts the text of the uploaded document and stores it as a new work. \
        Fields: `file` (DOC, DOCX, RTF, ODT or TXT), `type` (`essay` or `characterization`), \
        `subject` (title or character ID) and an optional `requestedTeacher`. \
        Works uploaded by teachers are approved immediately.",
    request_body(content_type = "multipart/form-data", description = "Document and work details"),
    responses(
        (status = 201, description = "Work created", body = UploadResponse),
        (status = 400, description = "Invalid form, unsupported file type, unknown work type or missing token", body = ErrorBody),
        (status = 401, description = "Invalid or expired token, or unregistered user", body = ErrorBody),
        (status = 500, description = "Document or database service failure", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all, fields(user_id = user.claims.user_id))]
pub async fn upload_work(
    State(state): State<AppState>,
    RegisteredUser(user): RegisteredUser,
    AppMultipart(multipart): AppMultipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = read_work_form(multipart).await?;

    // Validated before anything is stored, so an unknown type never leaves a work behind.
    let work_type = form.work_type()?;
    let subject_id = form.subject_id()?;
    let requested_teacher = form.requested_teacher_id()?;
    let file = form.take_file()?;

    let content = documents::ingest(&*state.documents, file).await?;
    let status = resolve_status(&state.graphql, &user, requested_teacher).await?;

    let id = insert_work(
        &state.graphql,
        &user,
        NewWork {
            content,
            status,
            requested_teacher,
            work_type,
            subject_id,
        },
    )
    .await?;

    info!(work_id = id, %work_type, %status, "work uploaded");

    Ok((StatusCode::CREATED, Json(UploadResponse { id })))
}

async fn read_work_form(mut multipart: Multipart) -> Result<WorkForm, AppError> {
    let mut form = WorkForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid upload form: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                form.file = Some(field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("failed to read uploaded file: {e}"))
                })?);
            }
            "type" | "subject" | "requestedTeacher" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read '{name}': {e}")))?;
                match name.as_str() {
                    "type" => form.work_type = Some(text),
                    "subject" => form.subject = Some(text),
                    _ => form.requested_teacher = Some(text),
                }
            }
            _ => {} // Ignore unknown fields.
        }
    }

    Ok(form)
}

/// Initial status of a new work. A teacher's own upload wins; otherwise the
/// requested reviewer decides.
pub fn initial_status(caller: Role, requested_teacher: Option<Role>) -> WorkStatus {
    if caller.is_teacher() || requested_teacher.is_some_and(|r| r.is_teacher()) {
        WorkStatus::Approved
    } else {
        WorkStatus::Pending
    }
}

async fn resolve_status(
    graphql: &GraphQLClient,
    user: &AuthUser,
    requested_teacher: Option<i32>,
) -> Result<WorkStatus, AppError> {
    if user.claims.role.is_teacher() {
        return Ok(WorkStatus::Approved);
    }
    let Some(teacher_id) = requested_teacher else {
        return Ok(WorkStatus::Pending);
    };

    let output: UserOutput = graphql
        .run(
            queries::user_by_id(teacher_id)
                .promote()
                .log(user.log_graphql),
        )
        .await?;
    let requested_role = output.users.first().map(|u| u.role);

    Ok(initial_status(user.claims.role, requested_role))
}

struct NewWork {
    content: String,
    status: WorkStatus,
    requested_teacher: Option<i32>,
    work_type: WorkType,
    subject_id: i32,
}

/// Insert the work and its subtype row. If the subtype insert fails the work is
/// deleted again, so a work never exists without its subtype.
async fn insert_work(
    graphql: &GraphQLClient,
    user: &AuthUser,
    work: NewWork,
) -> Result<i32, AppError> {
    let inserted: InsertWorkOutput = graphql
        .run(
            GraphQLRequest::new(queries::INSERT_WORK)
                .var("content", work.content)
                .var("status", work.status.as_str())
                .var("requestedTeacherID", work.requested_teacher)
                .impersonate(&user.claims)
                .promote()
                .log(user.log_graphql),
        )
        .await?;
    let id = inserted.work.id;

    let subtype = graphql
        .run::<IgnoredAny>(
            GraphQLRequest::new(work.work_type.insert_query())
                .var("workID", id)
                .var("subjectID", work.subject_id)
                .impersonate(&user.claims)
                .promote()
                .log(user.log_graphql),
        )
        .await;

    if let Err(err) = subtype {
        warn!(work_id = id, error = %err, "subtype insert failed, removing work");
        if let Err(cleanup) = graphql
            .run::<IgnoredAny>(
                GraphQLRequest::new(queries::DELETE_WORK)
                    .var("id", id)
                    .promote()
                    .log(user.log_graphql),
            )
            .await
        {
            error!(work_id = id, error = %cleanup, "failed to remove work without subtype");
        }
        return Err(err.into());
    }

    Ok(id)
}
