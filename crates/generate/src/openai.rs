use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use extract::llm::ensure_success;
use extract::sse::sse_data;
use extract::{GenerationRequest, TextGenerator, TextStream};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Streaming chat-completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_completion_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn build_chat_request(request: GenerationRequest) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt,
        });

        ChatRequest {
            model: request.model,
            messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_output_tokens,
            stream: true,
        }
    }
}

fn delta_text(payload: &str) -> Result<String> {
    let chunk: StreamChunk = serde_json::from_str(payload)
        .context("Failed to parse OpenAI stream chunk")?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .unwrap_or_default())
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn stream(&self, request: GenerationRequest) -> Result<TextStream> {
        if request.attachment.is_some() {
            anyhow::bail!("OpenAI chat completions do not accept uploaded file attachments");
        }

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&Self::build_chat_request(request))
            .send()
            .await
            .context("Failed to send request to OpenAI")?;
        let response = ensure_success(response, "OpenAI chat completion").await?;

        let fragments = sse_data(response)
            .map(|payload| payload.and_then(|data| delta_text(&data)))
            .boxed();
        Ok(fragments)
    }
}
