//! Server-sent events framing for streamed chat completions.

/// Splits a byte stream into `data:` payloads.
///
/// Network chunks may end mid-line (or mid-character), so bytes are buffered
/// until a full line is available.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                out.push(data.trim_start().to_string());
            }
        }
        out
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseLine {
    Done,
    Skip,
    Chunk {
        id: Option<String>,
        delta: Option<String>,
    },
}

pub(crate) fn parse_data(data: &str) -> SseLine {
    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(evt) = serde_json::from_str::<serde_json::Value>(data) else {
        return SseLine::Skip;
    };

    let id = evt["id"].as_str().map(str::to_string);
    let delta = evt["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    SseLine::Chunk { id, delta }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_buffers_partial_lines() {
        let mut d = SseDecoder::default();
        assert!(d.push(b"data: {\"a\"").is_empty());
        assert_eq!(d.push(b":1}\n\n"), vec!["{\"a\":1}".to_string()]);
        assert_eq!(
            d.push(b": keep-alive\r\ndata: [DONE]\r\n"),
            vec!["[DONE]".to_string()]
        );
    }

    #[test]
    fn decoder_keeps_split_utf8_together() {
        let mut d = SseDecoder::default();
        let line = "data: ünïcode\n".as_bytes();
        let (a, b) = line.split_at(7);
        assert!(d.push(a).is_empty());
        assert_eq!(d.push(b), vec!["ünïcode".to_string()]);
    }

    #[test]
    fn parses_content_delta() {
        let data = r#"{"id":"chatcmpl-1","choices":[{"index":0,"delta":{"content":"Hel"}}]}"#;
        assert_eq!(
            parse_data(data),
            SseLine::Chunk {
                id: Some("chatcmpl-1".to_string()),
                delta: Some("Hel".to_string()),
            }
        );
    }

    #[test]
    fn role_only_and_finish_chunks_have_no_delta() {
        let data = r#"{"id":"chatcmpl-1","choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(
            parse_data(data),
            SseLine::Chunk {
                id: Some("chatcmpl-1".to_string()),
                delta: None,
            }
        );
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(
            parse_data(data),
            SseLine::Chunk {
                id: None,
                delta: None,
            }
        );
    }

    #[test]
    fn done_and_garbage() {
        assert_eq!(parse_data("[DONE]"), SseLine::Done);
        assert_eq!(parse_data("not json"), SseLine::Skip);
    }
}
