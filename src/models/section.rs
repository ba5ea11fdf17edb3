use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ordered part of a project.
///
/// `content` is set once by the content generator when the project is created
/// and afterwards only replaced by refinements. `likes` and `dislikes` are
/// running counters maintained alongside the individual [`Feedback`] rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub project_id: Uuid,
    pub order_index: i64,
    pub title: String,
    pub content: Option<String>,
    pub likes: i64,
    pub dislikes: i64,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Append-only record of one refinement.
///
/// `old_content` is the section's content immediately before the change and
/// `new_content` what replaced it, so the latest refinement's `new_content`
/// always equals the section's current content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refinement {
    pub id: Uuid,
    pub section_id: Uuid,
    pub prompt: String,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for refining a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineInput {
    pub prompt: String,
}

/// Input for a free-standing refinement that is not stored anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeformRefineInput {
    pub text: String,
    pub instruction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeformRefineResponse {
    pub refined_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub section_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub text: String,
}

/// A single like or dislike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub section_id: Uuid,
    pub is_like: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackInput {
    pub is_like: bool,
}

/// Counters after a feedback vote has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResult {
    pub ok: bool,
    pub likes: i64,
    pub dislikes: i64,
}

/// A section loaded together with the project fields the content generator
/// needs.
#[derive(Debug, Clone)]
pub struct SectionContext {
    pub section: Section,
    pub main_topic: String,
}
