//! Scripted provider for tests and offline runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::LlmProvider;
use crate::AiError;

/// What the mock answers with.
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Failure(String),
}

/// Provider that returns a canned reply (or error) and counts calls.
pub struct MockProvider {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicU32,
    last_prompt: Mutex<Option<String>>,
}

impl MockProvider {
    /// A provider that always answers with `text`.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Reply::Text(text.into()),
            delay: None,
            calls: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// A provider that always fails with [`AiError::Provider`].
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Failure(message.into()),
            ..Self::replying(String::new())
        }
    }

    /// Sleeps for `delay` before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of completed or attempted calls.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt received.
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|prompt| prompt.clone())
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Failure(message) => Err(AiError::Provider {
                message: message.clone(),
            }),
        }
    }
}
