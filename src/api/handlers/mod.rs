use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use uuid::Uuid;

use super::auth::{self, CurrentUser};
use crate::config::AuthConfig;
use crate::db::Database;
use crate::export::{self, ExportedFile};
use crate::llm::ContentService;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side; clients only see a generic message.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

/// Ids that are not UUIDs cannot name any record.
fn parse_id(raw: &str, what: &str) -> Result<Uuid, (StatusCode, String)> {
    Uuid::parse_str(raw).map_err(|_| not_found(what))
}

/// Load a section the user owns, or fail with 404.
fn owned_section(
    db: &Database,
    user: &User,
    id: &str,
) -> Result<SectionContext, (StatusCode, String)> {
    let id = parse_id(id, "Section")?;
    db.get_section(user.id, id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Section"))
}

// ============================================================
// Health
// ============================================================

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Backend running" }))
}

pub async fn health(State(content): State<Arc<ContentService>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model": content.active_model().unwrap_or("fallback"),
    }))
}

// ============================================================
// Auth
// ============================================================

pub async fn register(
    State(db): State<Database>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<UserOut>), (StatusCode, String)> {
    let email = input.email.trim();
    if email.is_empty() || input.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and password are required".to_string(),
        ));
    }

    let password_hash = auth::hash_password(&input.password);
    match db.create_user(email, &password_hash).map_err(internal_error)? {
        Some(user) => {
            tracing::info!("Registered user {}", user.id);
            Ok((StatusCode::CREATED, Json(user.into())))
        }
        None => Err((
            StatusCode::CONFLICT,
            "Email already registered".to_string(),
        )),
    }
}

pub async fn login(
    State(db): State<Database>,
    State(config): State<AuthConfig>,
    Form(form): Form<LoginForm>,
) -> Result<Json<Token>, (StatusCode, String)> {
    let user = db
        .get_user_by_email(form.username.trim())
        .map_err(internal_error)?
        .filter(|user| auth::verify_password(&form.password, &user.password_hash))
        .ok_or_else(|| {
            tracing::warn!("Failed login attempt");
            (
                StatusCode::UNAUTHORIZED,
                "Incorrect email or password".to_string(),
            )
        })?;

    auth::issue_token(&config, &user)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ProjectWithSections>>, (StatusCode, String)> {
    db.get_projects(user.id).map(Json).map_err(internal_error)
}

/// Create a project and generate the initial content of every section.
///
/// Sections are generated one at a time in the order given, then the project
/// and all sections are written in a single transaction.
pub async fn create_project(
    State(db): State<Database>,
    State(content): State<Arc<ContentService>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<ProjectWithSections>), (StatusCode, String)> {
    let mut sections = Vec::with_capacity(input.sections.len());
    for section in &input.sections {
        let body = content
            .generate_section(&input.main_topic, &section.title)
            .await;
        sections.push(NewSection {
            order_index: section.order_index,
            title: section.title.clone(),
            content: body,
        });
    }

    let project = db
        .create_project(user.id, &input, sections)
        .map_err(internal_error)?;

    tracing::info!(
        "Created project {} with {} sections",
        project.project.id,
        project.sections.len()
    );
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectWithSections>, (StatusCode, String)> {
    let id = parse_id(&id, "Project")?;
    db.get_project(user.id, id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Project"))
}

pub async fn delete_project(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id, "Project")?;
    if db.delete_project(user.id, id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Project"))
    }
}

// ============================================================
// Sections
// ============================================================

pub async fn get_section(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Section>, (StatusCode, String)> {
    owned_section(&db, &user, &id).map(|ctx| Json(ctx.section))
}

/// Refine a section's content and record the change.
pub async fn refine_section(
    State(db): State<Database>,
    State(content): State<Arc<ContentService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<RefineInput>,
) -> Result<Json<Section>, (StatusCode, String)> {
    let ctx = owned_section(&db, &user, &id)?;
    let old_content = ctx.section.content.clone().unwrap_or_default();

    let new_content = content
        .refine_text(&old_content, &input.prompt, &ctx.section.title, &ctx.main_topic)
        .await;

    db.apply_refinement(ctx.section.id, &input.prompt, &old_content, &new_content)
        .map_err(internal_error)?
        .map(Json)
        // The section was deleted while the backend was generating
        .ok_or_else(|| not_found("Section"))
}

pub async fn list_refinements(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Refinement>>, (StatusCode, String)> {
    let ctx = owned_section(&db, &user, &id)?;
    db.get_refinements(ctx.section.id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn give_feedback(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<FeedbackInput>,
) -> Result<Json<FeedbackResult>, (StatusCode, String)> {
    let ctx = owned_section(&db, &user, &id)?;
    db.record_feedback(ctx.section.id, input.is_like)
        .map(Json)
        .map_err(internal_error)
}

pub async fn list_feedback(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Feedback>>, (StatusCode, String)> {
    let ctx = owned_section(&db, &user, &id)?;
    db.get_feedback(ctx.section.id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Comments
// ============================================================

pub async fn add_comment(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), (StatusCode, String)> {
    let ctx = owned_section(&db, &user, &id)?;
    db.add_comment(ctx.section.id, &input.text)
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(internal_error)
}

pub async fn list_comments(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>, (StatusCode, String)> {
    let ctx = owned_section(&db, &user, &id)?;
    db.get_comments(ctx.section.id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Free-standing generation
// ============================================================

pub async fn refine_freeform(
    State(content): State<Arc<ContentService>>,
    CurrentUser(_user): CurrentUser,
    Json(input): Json<FreeformRefineInput>,
) -> Json<FreeformRefineResponse> {
    let refined_text = content
        .refine_freeform(&input.text, &input.instruction)
        .await;
    Json(FreeformRefineResponse { refined_text })
}

// ============================================================
// Export
// ============================================================

pub async fn export_docx(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    export_as(&db, &user, &id, DocumentType::Docx)
}

pub async fn export_pptx(
    State(db): State<Database>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    export_as(&db, &user, &id, DocumentType::Pptx)
}

fn export_as(
    db: &Database,
    user: &User,
    id: &str,
    format: DocumentType,
) -> Result<Response, (StatusCode, String)> {
    let id = parse_id(id, "Project")?;
    let project = db
        .get_project(user.id, id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Project"))?;

    let file = export::export_project(&project, format).map_err(internal_error)?;
    Ok(download(file))
}

fn download(file: ExportedFile) -> Response {
    (
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        file.bytes,
    )
        .into_response()
}
