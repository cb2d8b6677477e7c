use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{SendMessageRequest, StreamRecord};
use crate::utils::url::construct_api_url;

/// Events forwarded from a stream task to the UI task. Records travel whole
/// because their fields are not mutually exclusive; the reconciler runs every
/// applicable branch for one record in one step.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    Record(StreamRecord),
    /// Request failure, non-success status, or a body read error. Carries the
    /// formatted text surfaced in the transcript.
    TransportFailed(String),
    /// The body ended without a `done` record.
    Closed,
}

/// Incremental newline framing over a chunked byte stream. Only complete
/// lines are released; a trailing partial line waits for the next chunk.
#[derive(Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the complete lines it unlocked, trimmed.
    /// Lines that are not valid UTF-8 are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(line) => lines.push(line.trim().to_string()),
                Err(e) => debug!("dropping non-utf8 stream line: {e}"),
            }
            self.buffer.drain(..=newline_pos);
        }
        lines
    }

    /// Bytes still waiting for a terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Parse one framed line. Non-marker lines and marker lines whose payload
/// does not parse are skipped silently; that is deliberate forward
/// compatibility, not an error path. Returns true when the record carried
/// `done`, which ends the read loop.
fn process_stream_line(
    line: &str,
    tx: &mpsc::UnboundedSender<(StreamEvent, u64)>,
    stream_id: u64,
) -> bool {
    let Some(payload) = extract_data_payload(line) else {
        return false;
    };
    if payload.is_empty() {
        return false;
    }

    match serde_json::from_str::<StreamRecord>(payload) {
        Ok(record) => {
            let done = record.done;
            let _ = tx.send((StreamEvent::Record(record), stream_id));
            done
        }
        Err(e) => {
            debug!("dropping unparseable stream record: {e}");
            false
        }
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// Render a non-success response body as a readable transcript block.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                if !summary.is_empty() {
                    return format!("API Error: {}\n```json\n{}\n```", summary, pretty_json);
                }
            }
            return format!("API Error:\n```json\n{}\n```", pretty_json);
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{}\n```", trimmed)
    } else {
        format!("API Error:\n```\n{}\n```", trimmed)
    }
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub request: SendMessageRequest,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamEvent, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamEvent, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = async {
                    let send_url = construct_api_url(&base_url, "send_message");
                    match client
                        .post(send_url)
                        .header("Content-Type", "application/json")
                        .json(&request)
                        .send()
                        .await
                    {
                        Ok(response) => {
                            if !response.status().is_success() {
                                let status = response.status();
                                let error_text = response
                                    .text()
                                    .await
                                    .unwrap_or_else(|_| "<no body>".to_string());
                                let formatted =
                                    format!("HTTP {status}\n{}", format_api_error(&error_text));
                                let _ = tx_clone
                                    .send((StreamEvent::TransportFailed(formatted), stream_id));
                                return;
                            }

                            let mut stream = response.bytes_stream();
                            let mut framer = LineFramer::new();

                            while let Some(chunk) = stream.next().await {
                                if cancel_token.is_cancelled() {
                                    return;
                                }

                                match chunk {
                                    Ok(chunk_bytes) => {
                                        for line in framer.push(&chunk_bytes) {
                                            if process_stream_line(&line, &tx_clone, stream_id) {
                                                return;
                                            }
                                        }
                                    }
                                    Err(e) => {
                                        let _ = tx_clone.send((
                                            StreamEvent::TransportFailed(format!(
                                                "stream read failed: {e}"
                                            )),
                                            stream_id,
                                        ));
                                        return;
                                    }
                                }
                            }

                            let _ = tx_clone.send((StreamEvent::Closed, stream_id));
                        }
                        Err(e) => {
                            let _ = tx_clone.send((
                                StreamEvent::TransportFailed(format!("request failed: {e}")),
                                stream_id,
                            ));
                        }
                    }
                } => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, event: StreamEvent, stream_id: u64) {
        let _ = self.tx.send((event, stream_id));
    }
}
