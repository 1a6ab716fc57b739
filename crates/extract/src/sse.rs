use anyhow::Result;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;

const DONE_SENTINEL: &str = "[DONE]";

/// Incremental Server-Sent Events parser that yields `data:` payloads.
///
/// Bytes are buffered until a full line is available, so payloads split across
/// network chunks (including inside a multi-byte character) decode intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a `[DONE]` event has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.handle_line(&line, &mut events);
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        events
    }

    /// Flush a trailing line and event left without a terminating blank line.
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        let rest = std::mem::take(&mut self.buffer);
        if !rest.is_empty() {
            self.handle_line(&rest, &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn handle_line(&mut self, raw: &[u8], events: &mut Vec<String>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);

        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data_lines.push(value.to_string());
        }
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if self.data_lines.is_empty() {
            return;
        }

        let payload = self.data_lines.join("\n");
        self.data_lines.clear();
        if payload == DONE_SENTINEL {
            self.done = true;
        } else {
            events.push(payload);
        }
    }
}

struct DecodeState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    ended: bool,
}

/// Adapt a byte stream into a stream of SSE data payloads.
pub fn decode_sse<S, B, E>(bytes: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = DecodeState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        ended: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                return Some((Ok(payload), state));
            }
            if state.ended || state.decoder.is_done() {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.ended = true;
                    let err = anyhow::Error::new(e).context("Failed to read streamed response");
                    return Some((Err(err), state));
                }
                None => {
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                    state.ended = true;
                }
            }
        }
    })
    .boxed()
}

/// SSE data payloads of an HTTP response body.
pub fn sse_data(response: reqwest::Response) -> BoxStream<'static, Result<String>> {
    decode_sse(response.bytes_stream().boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_events_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(b"data: {\"a\"");
        assert!(events.is_empty());
        events.extend(decoder.push(b": 1}\r\n\r\ndata: {\"b\": 2}\n\n"));

        assert_eq!(events, vec!["{\"a\": 1}", "{\"b\": 2}"]);
    }

    #[test]
    fn test_multibyte_char_split_between_chunks() {
        let payload = "data: \"caf\u{e9}\"\n\n".as_bytes();
        let split = payload.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(&payload[..split]);
        events.extend(decoder.push(&payload[split..]));
        assert_eq!(events, vec!["\"caf\u{e9}\""]);
    }

    #[test]
    fn test_done_sentinel_stops_decoding() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\n\ndata: x\n\ndata: [DONE]\n\ndata: y\n\n");
        assert_eq!(events, vec!["x"]);
        assert!(decoder.is_done());
        assert!(decoder.push(b"data: z\n\n").is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: message\ndata: tail").is_empty());
        assert_eq!(decoder.finish(), vec!["tail"]);
    }

    #[tokio::test]
    async fn test_decode_byte_stream() {
        let chunks: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: one\n".to_vec()),
            Ok(b"\ndata: two\n\n".to_vec()),
            Ok(b"data: [DONE]\n\n".to_vec()),
        ];

        let payloads: Vec<String> = decode_sse(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_transport_error_is_surfaced() {
        let chunks: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: one\n\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];

        let items: Vec<Result<String>> = decode_sse(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "one");
        assert!(items[1].is_err());
    }
}
