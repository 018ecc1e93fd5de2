//! Client-facing streaming of a finished answer.
//!
//! The run loop itself never streams. A rendered [`AgentResponse`] is cut
//! into small chunks and pushed through a bounded channel as
//! `response.append` events, followed by an optional `response.error` and a
//! final `response.done` carrying `[DONE]`.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::agent::AgentResponse;
use crate::error::HubError;

/// Data of the terminating event.
pub const DONE_SENTINEL: &str = "[DONE]";

pub const DEFAULT_CHUNK_CHARS: usize = 16;
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Append(AgentResponse),
    Error(String),
    Done,
}

impl StreamEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Append(_) => "response.append",
            Self::Error(_) => "response.error",
            Self::Done => "response.done",
        }
    }

    /// JSON payload, or the sentinel for `Done`.
    pub fn data(&self) -> String {
        match self {
            Self::Append(chunk) => serde_json::to_string(chunk).unwrap_or_default(),
            Self::Error(message) => serde_json::json!({ "error": message }).to_string(),
            Self::Done => DONE_SENTINEL.to_string(),
        }
    }

    /// Server-sent-events frame.
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event_type(), self.data())
    }
}

/// Push side of a stream; dropping it without [`StreamWriter::close`] ends
/// the stream without a `Done` event.
#[derive(Debug, Clone)]
pub struct StreamWriter {
    tx: mpsc::Sender<StreamEvent>,
}

impl StreamWriter {
    pub async fn send(&self, event: StreamEvent) -> Result<(), HubError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| HubError::Stream("stream reader dropped".into()))
    }

    pub async fn append(&self, chunk: AgentResponse) -> Result<(), HubError> {
        self.send(StreamEvent::Append(chunk)).await
    }

    pub async fn error(&self, message: impl Into<String>) -> Result<(), HubError> {
        self.send(StreamEvent::Error(message.into())).await
    }

    /// Send `Done` and release the writer.
    pub async fn close(self) -> Result<(), HubError> {
        self.send(StreamEvent::Done).await
    }
}

/// Pull side of a stream.
#[derive(Debug)]
pub struct StreamReader {
    inner: ReceiverStream<StreamEvent>,
}

impl StreamReader {
    /// Collect everything appended, for callers that want the whole text.
    pub async fn collect_text(self) -> Result<String, HubError> {
        let mut text = String::new();
        let mut events = self;
        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Append(chunk) => text.push_str(&chunk.content),
                StreamEvent::Error(message) => return Err(HubError::Stream(message)),
                StreamEvent::Done => break,
            }
        }
        Ok(text)
    }

    /// The events as SSE frames.
    pub fn into_sse(self) -> impl Stream<Item = String> + Send + 'static {
        self.map(|event| event.to_sse())
    }
}

impl Stream for StreamReader {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// A bounded writer/reader pair.
pub fn channel(capacity: usize) -> (StreamWriter, StreamReader) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        StreamWriter { tx },
        StreamReader {
            inner: ReceiverStream::new(rx),
        },
    )
}

/// `text` in pieces of at most `size` characters, never splitting a char.
pub fn chunks(text: String, size: usize) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        if size == 0 {
            if !text.is_empty() {
                yield text;
            }
        } else {
            let mut start = 0;
            for (count, (idx, _)) in text.char_indices().enumerate() {
                if count > 0 && count % size == 0 {
                    yield text[start..idx].to_string();
                    start = idx;
                }
            }
            if start < text.len() {
                yield text[start..].to_string();
            }
        }
    }
}

/// Re-emit a finished response as chunked events on a background task.
pub fn stream_answer(response: AgentResponse, chunk_chars: usize) -> StreamReader {
    let (writer, reader) = channel(DEFAULT_CAPACITY);
    tokio::spawn(async move {
        if let Err(e) = pump(writer, response, chunk_chars).await {
            tracing::debug!(error = %e, "answer stream abandoned");
        }
    });
    reader
}

async fn pump(
    writer: StreamWriter,
    response: AgentResponse,
    chunk_chars: usize,
) -> Result<(), HubError> {
    let mut pieces = std::pin::pin!(chunks(response.content, chunk_chars));
    while let Some(piece) = pieces.next().await {
        writer
            .append(AgentResponse {
                message: None,
                session: response.session.clone(),
                content: piece,
                error: None,
            })
            .await?;
    }
    if let Some(error) = response.error {
        writer.error(error).await?;
    }
    writer.close().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn chunks_respect_char_boundaries() {
        let pieces: Vec<String> = chunks("深圳天气晴".to_string(), 2).collect().await;
        assert_eq!(pieces, vec!["深圳", "天气", "晴"]);
    }

    #[tokio::test]
    async fn zero_size_yields_the_whole_text() {
        let pieces: Vec<String> = chunks("abc".to_string(), 0).collect().await;
        assert_eq!(pieces, vec!["abc"]);
    }

    #[test]
    fn sse_frames() {
        assert_eq!(
            StreamEvent::Done.to_sse(),
            "event: response.done\ndata: [DONE]\n\n"
        );
        assert_eq!(
            StreamEvent::Error("boom".into()).to_sse(),
            "event: response.error\ndata: {\"error\":\"boom\"}\n\n"
        );
    }
}
