use crate::provider::ProviderCredentials;
use anyhow::{Context, Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
        ChatCompletionToolArgs, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
        FunctionObjectArgs,
    },
};
use async_trait::async_trait;
use serde_json::Value;

/// A function the model may choose to call, described for tool-calling.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the function's arguments.
    pub parameters: Value,
}

/// A tool call requested by the LLM: the function name and its raw JSON arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: String,
}

/// Represents the two possible outcomes of a tool-enabled turn.
#[derive(Debug, Clone, PartialEq)]
pub enum LLMAction {
    /// The LLM decided to respond directly with text.
    TextResponse(String),
    /// The LLM decided to call one or more tools.
    ToolCall(Vec<ToolInvocation>),
}

/// A generic client for interacting with an LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends a single user prompt and returns the generated text.
    async fn invoke(&self, prompt: &str) -> Result<String>;

    /// Offers the model a set of tools and returns what it decided to do.
    async fn decide_action(&self, prompt: &str, tools: &[ToolSpec]) -> Result<LLMAction>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The specific model identifier to use for chat completions (e.g., "gpt-4o").
    /// * `temperature` - Sampling temperature. Structural generation uses `0.0`.
    pub fn new(config: OpenAIConfig, model: String, temperature: f32) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            temperature,
        }
    }

    /// Creates a client from a provider profile's credential bundle.
    pub fn from_credentials(credentials: &ProviderCredentials, temperature: f32) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(credentials.api_key.clone())
            .with_api_base(credentials.base_url.clone());
        Self::new(config, credentials.model.clone(), temperature)
    }

    fn user_message(prompt: &str) -> Result<Vec<ChatCompletionRequestMessage>> {
        Ok(vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()?
                .into(),
        ])
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages(Self::user_message(prompt)?)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let answer = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;
        Ok(answer)
    }

    async fn decide_action(&self, prompt: &str, tools: &[ToolSpec]) -> Result<LLMAction> {
        let tools = tools
            .iter()
            .map(|t| {
                Ok(ChatCompletionToolArgs::default()
                    .function(
                        FunctionObjectArgs::default()
                            .name(t.name.clone())
                            .description(t.description.clone())
                            .parameters(t.parameters.clone())
                            .build()?,
                    )
                    .build()?)
            })
            .collect::<Result<Vec<ChatCompletionTool>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages(Self::user_message(prompt)?)
            .tools(tools)
            .tool_choice("auto")
            .build()?;

        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .first()
            .context("No response choice from LLM")?;

        if let Some(tool_calls) = &choice.message.tool_calls {
            Ok(LLMAction::ToolCall(
                tool_calls
                    .iter()
                    .map(|call| ToolInvocation {
                        name: call.function.name.clone(),
                        arguments: call.function.arguments.clone(),
                    })
                    .collect(),
            ))
        } else if let Some(content) = &choice.message.content {
            Ok(LLMAction::TextResponse(content.clone()))
        } else {
            Err(anyhow!(
                "LLM response had neither text content nor tool calls."
            ))
        }
    }
}
