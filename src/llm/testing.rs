//! In-process backends for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{BackendError, Connector, ModelSource, TextBackend};

/// Answers every prompt with a fixed reply or a fixed error.
pub struct ScriptedBackend {
    reply: Result<String, String>,
    probe_ok: bool,
    generate_calls: AtomicUsize,
    probe_calls: Arc<AtomicUsize>,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedBackend {
    pub fn replying(text: &str) -> Self {
        Self::build(Ok(text.to_string()), true)
    }

    pub fn failing(message: &str) -> Self {
        Self::build(Err(message.to_string()), true)
    }

    pub fn unprobeable() -> Self {
        Self::build(Ok(String::new()), false)
    }

    fn build(reply: Result<String, String>, probe_ok: bool) -> Self {
        Self {
            reply,
            probe_ok,
            generate_calls: AtomicUsize::new(0),
            probe_calls: Arc::new(AtomicUsize::new(0)),
            last_prompt: Mutex::new(None),
        }
    }

    fn with_probe_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.probe_calls = counter;
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        self.reply.clone().map_err(BackendError::Rejected)
    }

    async fn count_tokens(&self, text: &str) -> Result<u32, BackendError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe_ok {
            Ok(text.split_whitespace().count() as u32)
        } else {
            Err(BackendError::Rejected("model not found".to_string()))
        }
    }
}

/// How a fake model behaves when requested from [`FakeConnector`].
#[derive(Clone, Copy)]
pub enum FakeModel {
    Healthy,
    ProbeFails,
    CannotOpen,
}

/// Connector whose models are scripted per id. Counts every call so tests
/// can assert that nothing was touched.
pub struct FakeConnector {
    models: HashMap<String, FakeModel>,
    configure_fails: bool,
    pub configure_calls: Arc<AtomicUsize>,
    pub open_calls: Arc<AtomicUsize>,
    pub probe_calls: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new(models: &[(&str, FakeModel)]) -> Self {
        Self {
            models: models
                .iter()
                .map(|(id, model)| (id.to_string(), *model))
                .collect(),
            configure_fails: false,
            configure_calls: Arc::new(AtomicUsize::new(0)),
            open_calls: Arc::new(AtomicUsize::new(0)),
            probe_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn rejecting_credentials() -> Self {
        let mut connector = Self::new(&[]);
        connector.configure_fails = true;
        connector
    }

    pub fn total_calls(&self) -> usize {
        self.configure_calls.load(Ordering::SeqCst)
            + self.open_calls.load(Ordering::SeqCst)
            + self.probe_calls.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn configure(&self, api_key: &str) -> Result<Box<dyn ModelSource>, BackendError> {
        self.configure_calls.fetch_add(1, Ordering::SeqCst);
        if self.configure_fails {
            return Err(BackendError::InvalidConfig(format!(
                "credential `{}` rejected",
                api_key
            )));
        }
        Ok(Box::new(FakeSource {
            models: self.models.clone(),
            open_calls: self.open_calls.clone(),
            probe_calls: self.probe_calls.clone(),
        }))
    }
}

struct FakeSource {
    models: HashMap<String, FakeModel>,
    open_calls: Arc<AtomicUsize>,
    probe_calls: Arc<AtomicUsize>,
}

impl ModelSource for FakeSource {
    fn model(&self, model_id: &str) -> Result<Arc<dyn TextBackend>, BackendError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        let backend = match self.models.get(model_id) {
            Some(FakeModel::Healthy) => ScriptedBackend::replying(model_id),
            Some(FakeModel::ProbeFails) => ScriptedBackend::unprobeable(),
            Some(FakeModel::CannotOpen) | None => {
                return Err(BackendError::InvalidConfig(format!(
                    "unknown model {}",
                    model_id
                )))
            }
        };
        Ok(Arc::new(backend.with_probe_counter(self.probe_calls.clone())))
    }
}
