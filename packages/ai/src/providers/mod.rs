//! LLM provider abstraction and implementations.
//!
//! Supports `OpenAI`, Anthropic Claude and AWS Bedrock via a common trait.
//! Insight generation needs a single completion per batch, so the trait
//! is a plain prompt-in, text-out call.

pub mod anthropic;
#[cfg(feature = "bedrock")]
pub mod bedrock;
pub mod mock;
pub mod openai;

use crate::AiError;

/// Maximum tokens requested for one completion.
pub const MAX_TOKENS: u32 = 4096;

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name used in logs (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Sends `prompt` as a single user message and returns the text of
    /// the reply.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the reply has no text.
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

/// Creates an LLM provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `OPENAI_API_KEY` or `AI_BASE_URL` set -> `OpenAI` (or compatible)
/// 2. `ANTHROPIC_API_KEY` set -> Anthropic Claude
/// 3. AWS credentials available (`AWS_ACCESS_KEY_ID`, `AWS_PROFILE`,
///    or IAM role on EC2/ECS) -> Bedrock
///
/// `AI_MODEL` overrides the model; the `OpenAI` default is `gpt-4`.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
#[allow(clippy::unused_async)] // async is needed when bedrock feature is enabled
pub async fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| detect_provider());

    match provider.to_lowercase().as_str() {
        "openai" | "gpt" => {
            let base_url = std::env::var("AI_BASE_URL").ok();
            let api_key = match (std::env::var("OPENAI_API_KEY"), &base_url) {
                (Ok(key), _) => key,
                // Self-hosted OpenAI-compatible servers usually need no key.
                (Err(_), Some(_)) => String::new(),
                (Err(_), None) => {
                    return Err(AiError::Config {
                        message: "OPENAI_API_KEY environment variable not set".to_string(),
                    });
                }
            };
            let model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4".to_string());
            let mut provider = openai::OpenAiProvider::new(api_key, model);
            if let Some(url) = base_url {
                log::info!("Using OpenAI-compatible endpoint {url}");
                provider = provider.with_base_url(url);
            }
            Ok(Box::new(provider))
        }
        "anthropic" | "claude" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| AiError::Config {
                message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
            })?;
            let model = std::env::var("AI_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());
            Ok(Box::new(anthropic::AnthropicProvider::new(api_key, model)))
        }
        #[cfg(feature = "bedrock")]
        "bedrock" | "aws" => {
            let model = std::env::var("AI_MODEL")
                .unwrap_or_else(|_| "us.anthropic.claude-sonnet-4-20250514-v1:0".to_string());
            let region = std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .ok()
                .or_else(|| {
                    // Bearer token auth requires a region for endpoint resolution.
                    if std::env::var("AWS_BEARER_TOKEN_BEDROCK").is_ok() {
                        log::info!(
                            "No AWS_REGION set; defaulting to us-east-1 for Bedrock bearer token auth"
                        );
                        Some("us-east-1".to_string())
                    } else {
                        None
                    }
                });
            let provider = bedrock::BedrockProvider::new(model, region).await;
            Ok(Box::new(provider))
        }
        #[cfg(not(feature = "bedrock"))]
        "bedrock" | "aws" => Err(AiError::Config {
            message: "Bedrock support not compiled. Rebuild with --features bedrock".to_string(),
        }),
        other => Err(AiError::Config {
            message: format!(
                "Unknown AI provider: {other}. Use 'openai', 'anthropic', or 'bedrock'."
            ),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name string that matches the arms in
/// [`create_provider_from_env`].
fn detect_provider() -> String {
    if std::env::var("OPENAI_API_KEY").is_ok() || std::env::var("AI_BASE_URL").is_ok() {
        log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY or AI_BASE_URL found)");
        return "openai".to_string();
    }

    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return "anthropic".to_string();
    }

    let has_aws_token = std::env::var("AWS_BEARER_TOKEN_BEDROCK").is_ok();
    let has_aws_keys = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
    let has_aws_profile = std::env::var("AWS_PROFILE").is_ok();
    let has_aws_role = std::env::var("AWS_ROLE_ARN").is_ok()
        || std::env::var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI").is_ok();

    if has_aws_token || has_aws_keys || has_aws_profile || has_aws_role {
        log::info!("Auto-detected AI provider: Bedrock (AWS credentials found)");
        return "bedrock".to_string();
    }

    log::warn!(
        "No AI credentials detected. Set one of: OPENAI_API_KEY, AI_BASE_URL, \
         ANTHROPIC_API_KEY, or AWS credentials (AWS_ACCESS_KEY_ID/AWS_PROFILE). \
         You can also set AI_PROVIDER explicitly."
    );

    // Fall back to openai; this produces a clear error about the missing key
    "openai".to_string()
}
