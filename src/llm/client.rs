use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;

/// A single-turn completion service: one system directive, one user message.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct LlmClient {
    chat_client: Client<OpenAIConfig>,
    chat_model: String,
    max_tokens: u32,
    temperature: f32,
}

impl LlmClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut chat_config = OpenAIConfig::new().with_api_base(&config.llm_url);

        if let Some(key) = &config.llm_api_key {
            chat_config = chat_config.with_api_key(key);
        } else {
            chat_config = chat_config.with_api_key("unused");
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        Ok(Self {
            chat_client: Client::with_config(chat_config).with_http_client(http_client),
            chat_model: config.llm_model.clone(),
            max_tokens: config.llm_max_tokens,
            temperature: config.llm_temperature,
        })
    }

    pub async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> anyhow::Result<String> {
        let request =
            completion_request(&self.chat_model, self.max_tokens, self.temperature, messages)?;

        let response = self.chat_client.chat().create(request).await?;

        // A missing choice or content is reported as an empty answer and
        // left to the caller to interpret.
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}

/// Local OpenAI-compatible servers honour `max_tokens` but not its newer
/// `max_completion_tokens` replacement.
#[allow(deprecated)]
fn completion_request(
    model: &str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatCompletionRequestMessage>,
) -> anyhow::Result<CreateChatCompletionRequest> {
    Ok(CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(messages)
        .max_tokens(max_tokens)
        .temperature(temperature)
        .build()?)
}

#[async_trait]
impl Completer for LlmClient {
    async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()?
                .into(),
        ];

        debug!("LLM: requesting completion from {}", self.chat_model);
        self.chat(messages).await
    }
}
