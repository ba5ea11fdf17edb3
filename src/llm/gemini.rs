//! Google Gemini REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::selector::{Connector, ModelSource};
use super::{BackendError, TextBackend};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Builds Gemini clients from a credential.
#[derive(Debug, Clone)]
pub struct GeminiConnector {
    base_url: String,
    timeout: Duration,
}

impl GeminiConnector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

impl Default for GeminiConnector {
    fn default() -> Self {
        Self::new(DEFAULT_GEMINI_BASE_URL, Duration::from_secs(60))
    }
}

impl Connector for GeminiConnector {
    fn configure(&self, api_key: &str) -> Result<Box<dyn ModelSource>, BackendError> {
        if api_key.trim().is_empty() {
            return Err(BackendError::InvalidConfig(
                "Gemini api_key must not be empty".to_string(),
            ));
        }

        let base = self.base_url.trim().trim_end_matches('/');
        Url::parse(base)
            .map_err(|e| BackendError::InvalidConfig(format!("invalid base url `{}`: {}", base, e)))?;

        let client = Client::builder().timeout(self.timeout).build()?;

        Ok(Box::new(GeminiSource {
            client,
            base_url: base.to_string(),
            api_key: api_key.trim().to_string(),
        }))
    }
}

struct GeminiSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ModelSource for GeminiSource {
    fn model(&self, model_id: &str) -> Result<Arc<dyn TextBackend>, BackendError> {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Err(BackendError::InvalidConfig(
                "Gemini model id must not be empty".to_string(),
            ));
        }

        let path = model_path(model_id);
        Ok(Arc::new(GeminiModel {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            generate_url: format!("{}/{}:generateContent", self.base_url, path),
            count_url: format!("{}/{}:countTokens", self.base_url, path),
        }))
    }
}

/// Accepts both `gemini-2.0-flash` and `models/gemini-2.0-flash`.
fn model_path(model_id: &str) -> String {
    if model_id.starts_with("models/") {
        model_id.to_string()
    } else {
        format!("models/{}", model_id)
    }
}

struct GeminiModel {
    client: Client,
    api_key: String,
    generate_url: String,
    count_url: String,
}

impl GeminiModel {
    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, BackendError> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::HttpStatus { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl TextBackend for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let request = GenerateRequest {
            contents: vec![RequestContent::user(prompt)],
        };
        let response = self.post(&self.generate_url, &request).await?;
        let parsed: GenerateResponse = response.json().await?;
        parse_generate_response(parsed)
    }

    async fn count_tokens(&self, text: &str) -> Result<u32, BackendError> {
        let request = CountTokensRequest {
            contents: vec![RequestContent::user(text)],
        };
        let response = self.post(&self.count_url, &request).await?;
        let parsed: CountTokensResponse = response.json().await?;
        Ok(parsed.total_tokens)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct CountTokensRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

impl<'a> RequestContent<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: "user",
            parts: vec![RequestPart { text }],
        }
    }
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason", default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidatePart {
    Text { text: String },
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct CountTokensResponse {
    #[serde(rename = "totalTokens", default)]
    total_tokens: u32,
}

fn parse_generate_response(response: GenerateResponse) -> Result<String, BackendError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(BackendError::Rejected(format!("prompt blocked: {}", reason)));
    }

    for candidate in response.candidates {
        match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => tracing::warn!("Gemini response truncated due to max tokens"),
            Some("SAFETY") => tracing::warn!("Gemini response blocked by safety filters"),
            Some("RECITATION") => tracing::warn!("Gemini response blocked due to recitation"),
            _ => {}
        }

        if let Some(content) = candidate.content {
            let text: String = content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    CandidatePart::Text { text } => Some(text),
                    CandidatePart::Other(_) => None,
                })
                .collect();
            if !text.trim().is_empty() {
                return Ok(text);
            }
        }
    }

    Err(BackendError::EmptyResponse)
}
