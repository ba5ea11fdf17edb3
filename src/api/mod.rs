pub mod auth;
mod handlers;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AuthConfig;
use crate::db::Database;
use crate::llm::ContentService;

/// Shared request state. Everything in it is fixed at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub content: Arc<ContentService>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(db: Database, content: ContentService, auth: AuthConfig) -> Self {
        Self {
            db,
            content: Arc::new(content),
            auth,
        }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Arc<ContentService> {
    fn from_ref(state: &AppState) -> Self {
        state.content.clone()
    }
}

impl FromRef<AppState> for AuthConfig {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Router with permissive CORS, for local development and tests.
pub fn create_router(state: AppState) -> Router {
    build_router(state, CorsLayer::permissive())
}

/// Router that only accepts cross-origin requests from `origins`.
pub fn create_router_with_cors(state: AppState, origins: &[String]) -> Router {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION]);

    build_router(state, cors)
}

fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Auth
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        // Projects (the web client uses the trailing-slash form)
        .route("/projects", get(handlers::list_projects).post(handlers::create_project))
        .route("/projects/", get(handlers::list_projects).post(handlers::create_project))
        .route("/projects/{id}", get(handlers::get_project))
        .route("/projects/{id}", delete(handlers::delete_project))
        // Sections
        .route("/sections/{id}", get(handlers::get_section))
        .route("/sections/{id}/refine", post(handlers::refine_section))
        .route("/sections/{id}/refinements", get(handlers::list_refinements))
        .route("/sections/{id}/feedback", get(handlers::list_feedback).post(handlers::give_feedback))
        .route("/sections/{id}/comments", get(handlers::list_comments).post(handlers::add_comment))
        // Free-standing generation
        .route("/generate/refine", post(handlers::refine_freeform))
        // Export
        .route("/export/docx/{id}", get(handlers::export_docx))
        .route("/export/pptx/{id}", get(handlers::export_pptx))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
