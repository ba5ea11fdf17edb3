//! Section content generation and refinement.
//!
//! A [`ContentService`] wraps the single backend chosen at startup by
//! [`select_backend`]. Both operations always return text: when there is no
//! backend, or the backend errors or answers with nothing, they fall back to
//! the deterministic templates in [`prompts`].

mod gemini;
pub mod prompts;
mod selector;

#[cfg(test)]
mod testing;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

pub use gemini::{GeminiConnector, DEFAULT_GEMINI_BASE_URL};
pub use selector::{select_backend, Connector, ModelSource};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to parse response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid backend configuration: {0}")]
    InvalidConfig(String),
    #[error("unexpected http status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("backend returned an empty response")]
    EmptyResponse,
}

/// A generative-text model that can be prompted.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Generate a completion for a single-turn prompt.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;

    /// Count the tokens in `text`. Used as a cheap liveness probe.
    async fn count_tokens(&self, text: &str) -> Result<u32, BackendError>;
}

/// The backend selected at startup, shared read-only by every request.
#[derive(Clone)]
pub struct ActiveBackend {
    pub model_id: String,
    pub handle: Arc<dyn TextBackend>,
}

impl fmt::Debug for ActiveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveBackend")
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

/// Outcome of one backend call.
#[derive(Debug)]
pub enum Completion {
    Text(String),
    Unavailable(Unavailable),
}

/// Why a call produced no usable text.
#[derive(Debug)]
pub enum Unavailable {
    NoBackend,
    Empty,
    Failed(BackendError),
}

/// Generates and refines section text through the active backend.
///
/// Holds no mutable state: the backend is fixed when the service is built.
#[derive(Debug, Clone, Default)]
pub struct ContentService {
    backend: Option<ActiveBackend>,
}

impl ContentService {
    pub fn new(backend: Option<ActiveBackend>) -> Self {
        Self { backend }
    }

    /// A service that always uses the fallback templates.
    pub fn fallback() -> Self {
        Self { backend: None }
    }

    /// Id of the live model, or `None` in fallback mode.
    pub fn active_model(&self) -> Option<&str> {
        self.backend.as_ref().map(|b| b.model_id.as_str())
    }

    /// Call the backend once. Errors and blank answers become
    /// [`Completion::Unavailable`].
    pub async fn complete(&self, prompt: &str) -> Completion {
        let Some(backend) = &self.backend else {
            return Completion::Unavailable(Unavailable::NoBackend);
        };

        match backend.handle.generate(prompt).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Completion::Unavailable(Unavailable::Empty)
                } else {
                    Completion::Text(text.to_string())
                }
            }
            Err(e) => Completion::Unavailable(Unavailable::Failed(e)),
        }
    }

    /// Initial body text for a new section.
    pub async fn generate_section(&self, main_topic: &str, section_title: &str) -> String {
        let prompt = prompts::section_prompt(main_topic, section_title);
        match self.complete(&prompt).await {
            Completion::Text(text) => text,
            Completion::Unavailable(reason) => {
                self.log_unavailable("generate_section", &reason);
                prompts::fallback_section(main_topic, section_title)
            }
        }
    }

    /// Revised text for `original` following `refinement_prompt`.
    ///
    /// Performs no persistence. The caller records the refinement and stores
    /// the returned text as the section's new content.
    pub async fn refine_text(
        &self,
        original: &str,
        refinement_prompt: &str,
        section_title: &str,
        main_topic: &str,
    ) -> String {
        let prompt = prompts::refine_prompt(original, refinement_prompt, section_title, main_topic);
        match self.complete(&prompt).await {
            Completion::Text(text) => text,
            Completion::Unavailable(reason) => {
                self.log_unavailable("refine_text", &reason);
                prompts::fallback_refine(original, refinement_prompt)
            }
        }
    }

    /// Refine text that does not belong to any section.
    pub async fn refine_freeform(&self, text: &str, instruction: &str) -> String {
        let prompt = prompts::freeform_refine_prompt(text, instruction);
        match self.complete(&prompt).await {
            Completion::Text(refined) => refined,
            Completion::Unavailable(reason) => {
                self.log_unavailable("refine_freeform", &reason);
                prompts::fallback_refine(text, instruction)
            }
        }
    }

    fn log_unavailable(&self, operation: &str, reason: &Unavailable) {
        match reason {
            Unavailable::NoBackend => {
                tracing::debug!("{}: no backend configured, using fallback text", operation)
            }
            Unavailable::Empty => tracing::warn!(
                model = self.active_model().unwrap_or("none"),
                "{}: backend returned empty text, using fallback",
                operation
            ),
            Unavailable::Failed(e) => tracing::warn!(
                model = self.active_model().unwrap_or("none"),
                "{}: backend call failed, using fallback: {}",
                operation,
                e
            ),
        }
    }
}
