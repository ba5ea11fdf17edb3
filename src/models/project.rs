use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::section::Section;

/// A document outline owned by a user.
///
/// Deleting a project cascades to its sections, and from there to the
/// sections' refinements, comments and feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub document_type: DocumentType,
    pub main_topic: String,
    pub created_at: DateTime<Utc>,
}

/// The file format a project is exported to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Docx,
    Pptx,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pptx => "pptx",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }
}

/// One section of a new project's outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSectionInput {
    pub order_index: i64,
    pub title: String,
    /// Accepted for compatibility with older clients. Initial content is
    /// always generated, so this value is ignored.
    #[serde(default)]
    pub content: Option<String>,
}

/// Input for creating a project together with its outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub document_type: DocumentType,
    pub main_topic: String,
    #[serde(default)]
    pub sections: Vec<CreateSectionInput>,
}

/// A section title paired with the content generated for it.
///
/// Built by the request handler before the project is written so the whole
/// project lands in a single transaction.
#[derive(Debug, Clone)]
pub struct NewSection {
    pub order_index: i64,
    pub title: String,
    pub content: String,
}

/// A project with its sections, used for list and detail responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithSections {
    #[serde(flatten)]
    pub project: Project,
    pub sections: Vec<Section>,
}
