use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;
use std::fmt;

use ingest::VideoSource;

/// Incremental text fragments from a streamed generation call.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Processing state of an uploaded remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
            FileState::Unspecified => "STATE_UNSPECIFIED",
        };
        f.write_str(name)
    }
}

/// Handle to a file held by the remote provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: FileState,
}

/// One streamed generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    /// Previously uploaded file to send alongside the prompt.
    pub attachment: Option<RemoteFile>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Fixed sampling settings for one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl ModelSettings {
    pub fn new(model: &str, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            temperature,
            max_output_tokens,
        }
    }

    /// Phase 1: video-capable model, near-deterministic.
    pub fn visual() -> Self {
        Self::new("gemini-2.5-pro", 0.2, 65536)
    }

    /// Phase 2: fast text model, same sampling as phase 1.
    pub fn synthesis() -> Self {
        Self::new("gemini-2.5-flash", 0.2, 65536)
    }

    pub fn request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            system: None,
            prompt,
            attachment: None,
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Start a streamed generation. Errors before the first fragment are
    /// returned here; errors mid-stream arrive as stream items.
    async fn stream(&self, request: GenerationRequest) -> Result<TextStream>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(&self, video: &VideoSource) -> Result<RemoteFile>;

    async fn get(&self, name: &str) -> Result<RemoteFile>;

    async fn delete(&self, name: &str) -> Result<()>;
}

/// A provider that can both hold uploaded media and generate from it.
pub trait MediaModel: FileStore + TextGenerator {}

impl<T: FileStore + TextGenerator> MediaModel for T {}

/// Turn a non-2xx response into an error carrying the status and body.
pub async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .context(format!("Failed to read {} error body", what))?;
    anyhow::bail!("{} request failed ({}): {}", what, status, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_from_api_json() {
        let json = r#"{
            "name": "files/abc123",
            "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
            "mimeType": "video/mp4",
            "state": "PROCESSING",
            "sizeBytes": "1024"
        }"#;
        let file: RemoteFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.name, "files/abc123");
        assert_eq!(file.mime_type, "video/mp4");
        assert_eq!(file.state, FileState::Processing);
    }

    #[test]
    fn test_unknown_or_missing_state() {
        let file: RemoteFile = serde_json::from_str(r#"{"name": "files/x"}"#).unwrap();
        assert_eq!(file.state, FileState::Unspecified);

        let state: FileState = serde_json::from_str(r#""STATE_UNSPECIFIED""#).unwrap();
        assert_eq!(state, FileState::Unspecified);
        assert_eq!(FileState::Failed.to_string(), "FAILED");
    }

    #[test]
    fn test_settings_build_request() {
        let request = ModelSettings::visual().request("prompt".to_string());
        assert_eq!(request.model, "gemini-2.5-pro");
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.max_output_tokens, 65536);
        assert!(request.attachment.is_none());
        assert!(request.system.is_none());
    }
}
