use std::sync::Arc;

use super::prompts::PROBE_TEXT;
use super::{ActiveBackend, BackendError, TextBackend};

/// Entry point of a generative-text client library.
pub trait Connector: Send + Sync {
    /// Configure the client with a credential.
    fn configure(&self, api_key: &str) -> Result<Box<dyn ModelSource>, BackendError>;
}

/// A configured client that can hand out model handles.
pub trait ModelSource: Send + Sync {
    fn model(&self, model_id: &str) -> Result<Arc<dyn TextBackend>, BackendError>;
}

/// Pick the backend used for the rest of the process lifetime.
///
/// Returns `None` without touching `connector` when there is no credential.
/// Otherwise tries each candidate in order and keeps the first whose handle
/// opens and answers a token-count probe. Runs once at startup; a process that
/// starts without a backend keeps running on the fallback templates.
pub async fn select_backend(
    api_key: Option<&str>,
    candidates: &[String],
    connector: &dyn Connector,
) -> Option<ActiveBackend> {
    let api_key = match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => key,
        _ => {
            tracing::info!("No generative backend credential configured; using fallback mode");
            return None;
        }
    };

    let source = match connector.configure(api_key) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!("Failed to configure generative backend, using fallback mode: {}", e);
            return None;
        }
    };

    for model_id in candidates {
        match probe(source.as_ref(), model_id).await {
            Ok(handle) => {
                tracing::info!("Generative backend initialized: {}", model_id);
                return Some(ActiveBackend {
                    model_id: model_id.clone(),
                    handle,
                });
            }
            Err(e) => tracing::warn!("Model not usable: {} -> {}", model_id, e),
        }
    }

    tracing::warn!("No usable generative model found; using fallback mode");
    None
}

async fn probe(
    source: &dyn ModelSource,
    model_id: &str,
) -> Result<Arc<dyn TextBackend>, BackendError> {
    let handle = source.model(model_id)?;
    handle.count_tokens(PROBE_TEXT).await?;
    Ok(handle)
}
