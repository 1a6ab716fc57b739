use anyhow::Result;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tracing::info;

use crate::llm::TextStream;

/// Characters accumulated between two progress lines.
pub const PROGRESS_INTERVAL_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub chars: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Accumulated {
    pub text: String,
    pub chars: usize,
    pub elapsed: Duration,
}

/// Folds streamed fragments into one buffer and decides when to report progress.
pub struct StreamAccumulator {
    buffer: String,
    chars: usize,
    last_report: usize,
    started: Instant,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            chars: 0,
            last_report: 0,
            started: Instant::now(),
        }
    }

    pub fn chars(&self) -> usize {
        self.chars
    }

    /// Append a fragment. Returns a progress event once at least
    /// `PROGRESS_INTERVAL_CHARS` have arrived since the previous one.
    pub fn push(&mut self, fragment: &str) -> Option<Progress> {
        if fragment.is_empty() {
            return None;
        }

        self.buffer.push_str(fragment);
        self.chars += fragment.chars().count();

        if self.chars - self.last_report >= PROGRESS_INTERVAL_CHARS {
            self.last_report = self.chars;
            return Some(Progress {
                chars: self.chars,
                elapsed: self.started.elapsed(),
            });
        }
        None
    }

    pub fn finish(self) -> Accumulated {
        Accumulated {
            elapsed: self.started.elapsed(),
            chars: self.chars,
            text: self.buffer,
        }
    }
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain a fragment stream, logging progress under `label`.
pub async fn accumulate(mut stream: TextStream, label: &str) -> Result<Accumulated> {
    let mut accumulator = StreamAccumulator::new();

    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if let Some(progress) = accumulator.push(&fragment) {
            info!(
                "  ... {}: {} chars ({})",
                label,
                format_count(progress.chars),
                format_elapsed(progress.elapsed)
            );
        }
    }

    let accumulated = accumulator.finish();
    info!(
        "  ✓ {}: {} chars total ({})",
        label,
        format_count(accumulated.chars),
        format_elapsed(accumulated.elapsed)
    );
    Ok(accumulated)
}

/// `"42s"` under a minute, `"2m 5s"` otherwise. Sub-second parts are dropped.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Render a count with comma thousands separators.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0s");
        assert_eq!(format_elapsed(Duration::from_millis(59_900)), "59s");
        assert_eq!(format_elapsed(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "62m 5s");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(2000), "2,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_concatenation_ignores_fragment_boundaries() {
        let text = "The quick brown fox jumps over the lazy dog. Größe ✓";
        let expected: String = text.to_string();

        for size in [1, 3, 7, 64] {
            let chars: Vec<char> = text.chars().collect();
            let mut accumulator = StreamAccumulator::new();
            for piece in chars.chunks(size) {
                accumulator.push(&piece.iter().collect::<String>());
            }
            let done = accumulator.finish();
            assert_eq!(done.text, expected);
            assert_eq!(done.chars, text.chars().count());
        }
    }

    #[test]
    fn test_progress_threshold() {
        let mut accumulator = StreamAccumulator::new();

        assert!(accumulator.push(&"a".repeat(1999)).is_none());
        let progress = accumulator.push("b").unwrap();
        assert_eq!(progress.chars, 2000);

        // The next report needs another 2000 chars past the last one.
        assert!(accumulator.push(&"c".repeat(1500)).is_none());
        assert!(accumulator.push(&"d".repeat(499)).is_none());
        assert_eq!(accumulator.push("e").unwrap().chars, 4000);

        // A single large fragment reports once.
        assert_eq!(accumulator.push(&"f".repeat(5000)).unwrap().chars, 9000);
    }

    #[test]
    fn test_empty_fragments_are_ignored() {
        let mut accumulator = StreamAccumulator::new();
        assert!(accumulator.push("").is_none());
        accumulator.push("x");
        assert_eq!(accumulator.chars(), 1);
    }

    #[tokio::test]
    async fn test_accumulate_stream() {
        let fragments: TextStream = stream::iter(vec![
            Ok("{\"observations\"".to_string()),
            Ok(String::new()),
            Ok(": []}".to_string()),
        ])
        .boxed();

        let done = accumulate(fragments, "Visual analysis").await.unwrap();
        assert_eq!(done.text, "{\"observations\": []}");
        assert_eq!(done.chars, 20);
    }

    #[tokio::test]
    async fn test_accumulate_propagates_stream_error() {
        let fragments: TextStream = stream::iter(vec![
            Ok("partial".to_string()),
            Err(anyhow::anyhow!("connection reset")),
        ])
        .boxed();

        assert!(accumulate(fragments, "Synthesis").await.is_err());
    }
}
