#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region insights from a generative model.
//!
//! Supports `OpenAI` GPT-4, Anthropic Claude, AWS Bedrock (feature-gated),
//! and any `OpenAI`-compatible local/self-hosted server (Ollama, vLLM,
//! llama.cpp, LM Studio) via the `AI_BASE_URL` environment variable.
//!
//! The pipeline is:
//!
//! 1. [`batcher`] describes every stored region in one prompt and asks
//!    the model for a JSON array of insights. No network call is made for
//!    an empty region list.
//! 2. [`extract`] recovers that array from the free-text reply, which may
//!    be wrapped in prose or markdown fences.
//! 3. [`pipeline`] drops insights whose id does not match a region that
//!    was part of the request.

pub mod batcher;
pub mod extract;
pub mod pipeline;
pub mod providers;

use thiserror::Error;

/// Errors that can occur while talking to an LLM provider.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The provider did not answer in time.
    #[error("LLM request timed out after {seconds}s")]
    Timeout {
        /// The configured timeout.
        seconds: u64,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Batch-level failure of an insight request.
///
/// None of these is fatal; the region store is left untouched and the
/// caller decides whether to retry.
#[derive(Debug, Error)]
pub enum InsightError {
    /// The generative model could not be reached or returned an error.
    #[error("Insight provider unavailable: {message}")]
    UpstreamUnavailable {
        /// Description of the upstream failure.
        message: String,
    },

    /// The model replied but no JSON array could be found in the reply.
    #[error("Failed to extract JSON from model response")]
    ExtractionFailed {
        /// The full reply text.
        raw: String,
    },

    /// An array-shaped substring was found but is not valid insight JSON.
    #[error("Failed to parse extracted JSON: {message}")]
    MalformedPayload {
        /// The extracted substring.
        raw: String,
        /// Parser error message.
        message: String,
    },
}

impl InsightError {
    /// The raw text preserved for display, if any.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::UpstreamUnavailable { .. } => None,
            Self::ExtractionFailed { raw } | Self::MalformedPayload { raw, .. } => Some(raw),
        }
    }
}

impl From<AiError> for InsightError {
    fn from(e: AiError) -> Self {
        Self::UpstreamUnavailable {
            message: e.to_string(),
        }
    }
}
