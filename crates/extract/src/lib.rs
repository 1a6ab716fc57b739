pub mod fences;
pub mod gemini;
pub mod llm;
pub mod prompt;
pub mod schema;
pub mod sse;
pub mod stream;
pub mod synthesis;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod visual;

pub use fences::strip_fences;
pub use gemini::GeminiClient;
pub use llm::{
    FileState, FileStore, GenerationRequest, MediaModel, ModelSettings, RemoteFile,
    TextGenerator, TextStream,
};
pub use schema::{Synthesis, VisualAnalysis};
pub use stream::{accumulate, format_count, format_elapsed, Accumulated, StreamAccumulator};
pub use synthesis::Synthesizer;
pub use visual::VisualExtractor;

use anyhow::Result;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Video processing failed for {name}: {state}")]
    ProcessingFailed { name: String, state: FileState },

    #[error("{phase} response is not valid JSON: {source}")]
    MalformedResponse {
        phase: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Strip code fences and parse strictly. No repair, no re-prompt.
pub fn parse_model_json(phase: &'static str, raw: &str) -> Result<Value> {
    serde_json::from_str(strip_fences(raw))
        .map_err(|source| ExtractError::MalformedResponse { phase, source }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fenced_json() {
        let value = parse_model_json("Synthesis", "```json\n{\"pain_points\": []}\n```").unwrap();
        assert_eq!(value, json!({"pain_points": []}));
    }

    #[test]
    fn test_parse_failure_is_typed() {
        let err = parse_model_json("Synthesis", "Sure! Here is the JSON you asked for").unwrap_err();
        match err.downcast_ref::<ExtractError>() {
            Some(ExtractError::MalformedResponse { phase, .. }) => assert_eq!(*phase, "Synthesis"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
