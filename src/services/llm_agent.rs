use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, Role, CreateChatCompletionRequest,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent,
    },
    Client,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::models::{ColumnMap, ColumnStats, Trend};

pub const SUMMARY_FALLBACK: &str = "LLM summary unavailable.";
pub const ANSWER_FALLBACK: &str = "Unable to generate response.";
pub const NOT_CONFIGURED: &str = "LLM is not configured.";

const ANALYST_PERSONA: &str = "You are a data analyst.";

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.as_deref().ok_or(LlmError::Unavailable)?;
        if config.model.trim().is_empty() {
            return Err(LlmError::Request("model name is empty".to_string()));
        }

        let mut openai = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = &config.api_base {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(LlmError::Request(format!("invalid API base URL: {}", base)));
            }
            openai = openai.with_api_base(base);
        }

        Ok(Self {
            client: Client::with_config(openai),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ANALYST_PERSONA.to_string(),
                    name: None,
                    role: Role::System,
                }
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                    role: Role::User,
                }
            ),
        ];

        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.2),
            ..Default::default()
        };

        let response = self.client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let content = response.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}

/// Summary and Q&A over computed statistics.
///
/// Availability is fixed when the agent is built; an unavailable agent never
/// touches the network and answers with fixed fallback text.
#[derive(Clone)]
pub struct LlmAgent {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl LlmAgent {
    pub fn from_config(config: &LlmConfig) -> Self {
        if config.api_key.is_none() {
            tracing::info!("OPENAI_API_KEY not set, LLM features disabled");
            return Self::unavailable();
        }

        match OpenAiGenerator::new(config) {
            Ok(generator) => {
                tracing::info!("LLM connected, model: {}", config.model);
                Self::with_generator(Arc::new(generator), config.timeout)
            }
            Err(e) => {
                tracing::error!("Failed to initialize LLM client: {}", e);
                Self::unavailable()
            }
        }
    }

    pub fn unavailable() -> Self {
        Self {
            generator: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn with_generator(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            generator: Some(generator),
            timeout,
        }
    }

    pub fn is_available(&self) -> bool {
        self.generator.is_some()
    }

    /// `None` when the LLM is not configured, the fallback text when the call fails.
    pub async fn summarize(
        &self,
        stats: &ColumnMap<ColumnStats>,
        trends: &ColumnMap<Trend>,
        outliers: &ColumnMap<usize>,
    ) -> Option<String> {
        if !self.is_available() {
            return None;
        }

        let prompt = summary_prompt(stats, trends, outliers);
        match self.complete(&prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("LLM summary failed: {}", e);
                Some(SUMMARY_FALLBACK.to_string())
            }
        }
    }

    pub async fn answer(&self, question: &str, context: &Map<String, Value>) -> String {
        let prompt = answer_prompt(question, context);
        match self.complete(&prompt).await {
            Ok(text) => text,
            Err(LlmError::Unavailable) => NOT_CONFIGURED.to_string(),
            Err(e) => {
                tracing::warn!("LLM answer failed: {}", e);
                ANSWER_FALLBACK.to_string()
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let generator = self.generator.as_ref().ok_or(LlmError::Unavailable)?;
        tokio::time::timeout(self.timeout, generator.generate(prompt))
            .await
            .map_err(|_| LlmError::Timeout)?
    }
}

fn render<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn summary_prompt(
    stats: &ColumnMap<ColumnStats>,
    trends: &ColumnMap<Trend>,
    outliers: &ColumnMap<usize>,
) -> String {
    format!(
        r#"Statistics:
{}

Trends:
{}

Outliers:
{}

Write a concise 3-4 sentence summary explaining key patterns and what should be checked next."#,
        render(stats),
        render(trends),
        render(outliers)
    )
}

pub fn answer_prompt(question: &str, context: &Map<String, Value>) -> String {
    format!(
        r#"Here is statistical context:
{}

User question:
{}

Provide a concise and helpful answer."#,
        render(context),
        question
    )
}
