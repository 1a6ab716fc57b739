use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use ingest::{FileReader, VideoSource};

use crate::llm::{ensure_success, FileStore, GenerationRequest, RemoteFile, TextGenerator, TextStream};
use crate::sse::sse_data;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// REST client for the Gemini file and generation endpoints.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    thought: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    file_uri: String,
    mime_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct UploadStartRequest {
    file: UploadMetadata,
}

#[derive(Serialize)]
struct UploadMetadata {
    display_name: String,
}

#[derive(Deserialize)]
struct FileEnvelope {
    file: RemoteFile,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiClient {
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

    fn build_generate_request(request: &GenerationRequest) -> GenerateContentRequest {
        let mut parts = Vec::new();
        if let Some(file) = &request.attachment {
            parts.push(Part {
                file_data: Some(FileData {
                    file_uri: file.uri.clone(),
                    mime_type: file.mime_type.clone(),
                }),
                ..Part::default()
            });
        }
        parts.push(Part {
            text: Some(request.prompt.clone()),
            ..Part::default()
        });

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: request.system.as_ref().map(|system| Content {
                role: None,
                parts: vec![Part {
                    text: Some(system.clone()),
                    ..Part::default()
                }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

/// Text of one streamed chunk: the first candidate's non-thought parts, joined.
fn chunk_text(payload: &str) -> Result<String> {
    let chunk: StreamChunk = serde_json::from_str(payload)
        .context("Failed to parse Gemini stream chunk")?;

    let text = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

#[async_trait]
impl FileStore for GeminiClient {
    async fn upload(&self, video: &VideoSource) -> Result<RemoteFile> {
        let size = video.size_bytes.to_string();

        // Resumable upload: the start request returns the URL the bytes go to.
        let start_url = format!("{}/upload/v1beta/files", self.base_url);
        let response = self.client
            .post(&start_url)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", &size)
            .header("X-Goog-Upload-Header-Content-Type", &video.mime_type)
            .json(&UploadStartRequest {
                file: UploadMetadata {
                    display_name: video.display_name(),
                },
            })
            .send()
            .await
            .context("Failed to start Gemini upload")?;
        let response = ensure_success(response, "Gemini upload start").await?;

        let upload_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .context("Gemini upload start response has no x-goog-upload-url header")?
            .to_string();

        // Streamed from disk, never buffered whole.
        let file = FileReader::open_video(video).await?;
        let response = self.client
            .post(&upload_url)
            .header(reqwest::header::CONTENT_LENGTH, &size)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(reqwest::Body::from(file))
            .send()
            .await
            .context("Failed to upload video bytes to Gemini")?;

        let envelope: FileEnvelope = ensure_success(response, "Gemini upload")
            .await?
            .json()
            .await
            .context("Failed to parse Gemini upload response")?;

        Ok(envelope.file)
    }

    async fn get(&self, name: &str) -> Result<RemoteFile> {
        let url = format!("{}/v1beta/{}", self.base_url, name);

        let response = self.client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .context("Failed to fetch Gemini file state")?;

        ensure_success(response, "Gemini file lookup")
            .await?
            .json()
            .await
            .context("Failed to parse Gemini file resource")
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let url = format!("{}/v1beta/{}", self.base_url, name);

        let response = self.client
            .delete(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .context("Failed to delete Gemini file")?;

        ensure_success(response, "Gemini file delete").await?;
        Ok(())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn stream(&self, request: GenerationRequest) -> Result<TextStream> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_generate_request(&request))
            .send()
            .await
            .context("Failed to send request to Gemini")?;
        let response = ensure_success(response, "Gemini generation").await?;

        let fragments = sse_data(response)
            .map(|payload| payload.and_then(|data| chunk_text(&data)))
            .boxed();
        Ok(fragments)
    }
}
