//! Streaming types for provider responses

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::agents::domain::FunctionCall;
use crate::agents::error::{LlmError, LlmResult};

/// A decoded event of a provider response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of assistant text
    Text(String),
    /// A fully assembled function call
    FunctionCall(FunctionCall),
}

/// Raw response body as a stream of byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = LlmResult<Bytes>> + Send>>;

/// An undecoded provider response
pub struct RawResponse {
    status: u16,
    body: ByteStream,
}

impl RawResponse {
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self { status, body }
    }

    /// Wrap an HTTP response; the body is read lazily
    pub fn from_http(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| LlmError::Streaming(e.to_string())));
        Self::new(status, Box::pin(body))
    }

    /// Build a response from in-memory chunks
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<LlmResult<Bytes>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(200, Box::pin(futures::stream::iter(chunks)))
    }

    /// A response with no body
    pub fn empty() -> Self {
        Self::from_chunks(Vec::<Bytes>::new())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn into_stream(self) -> ByteStream {
        self.body
    }

    /// Read the whole body
    pub async fn bytes(self) -> LlmResult<Vec<u8>> {
        let mut body = self.body;
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

/// Splits a chunked byte stream into lines.
///
/// Bytes are buffered until a newline arrives, so a multi-byte character or a
/// JSON payload split across network chunks is decoded only once complete.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..line.len() - 1]));
        }
        lines
    }

    /// Take the trailing unterminated line, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        if line.trim().is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.trim_end_matches('\r').to_string()
}

/// Payload of an SSE `data:` line
pub fn sse_data(line: &str) -> Option<&str> {
    let line = line.trim();
    line.strip_prefix("data:").map(str::trim_start)
}

/// Decoding states of a function-call-capable stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Text,
    InFunctionCall,
    Done,
}

/// Reassembles a function call whose arguments arrive in fragments.
///
/// Entering a call switches to `InFunctionCall`; fragments accumulate until a
/// non-function delta arrives or the stream ends, at which point the buffered
/// call is flushed exactly once.
#[derive(Debug)]
pub struct FunctionCallDecoder {
    state: DecodeState,
    name: String,
    arguments: String,
}

impl Default for FunctionCallDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionCallDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Text,
            name: String::new(),
            arguments: String::new(),
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Feed a function-call fragment
    pub fn function_delta(&mut self, name: Option<&str>, arguments: Option<&str>) {
        if self.state == DecodeState::Done {
            return;
        }
        self.state = DecodeState::InFunctionCall;
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.name = name.to_string();
        }
        if let Some(arguments) = arguments {
            self.arguments.push_str(arguments);
        }
    }

    /// A non-function delta arrived
    pub fn other_delta(&mut self) -> Option<FunctionCall> {
        self.flush()
    }

    /// The stream ended
    pub fn finish(&mut self) -> Option<FunctionCall> {
        let call = self.flush();
        self.state = DecodeState::Done;
        call
    }

    fn flush(&mut self) -> Option<FunctionCall> {
        if self.state != DecodeState::InFunctionCall {
            return None;
        }
        self.state = DecodeState::Text;
        let name = std::mem::take(&mut self.name);
        let arguments = std::mem::take(&mut self.arguments);
        if name.is_empty() {
            tracing::warn!("Dropping function call fragment without a name");
            return None;
        }
        Some(FunctionCall::new(name, arguments))
    }
}

/// Vendor-specific interpretation of SSE `data:` payloads
pub trait SseDecoder: Send + 'static {
    /// Handle one payload. Returns `Ok(false)` when the vendor signalled the end
    fn decode(&mut self, payload: &Value, events: &mut Vec<StreamEvent>) -> LlmResult<bool>;

    /// Flush anything still buffered when the stream ends
    fn finish(&mut self, events: &mut Vec<StreamEvent>);
}

/// Decode an SSE body on a background task.
///
/// `[DONE]` and the decoder's own end signal terminate the stream; otherwise
/// it ends with the body. Unparseable lines are skipped.
pub fn spawn_sse_stream<D: SseDecoder>(response: RawResponse, mut decoder: D) -> LlmStream {
    LlmStream::spawn(100, |tx| async move {
        let mut body = response.into_stream();
        let mut lines = LineBuffer::new();
        let mut events = Vec::new();
        let mut ended = false;

        'read: loop {
            let chunk = match body.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    let _ = tx.send_error(e).await;
                    return;
                }
                None => break,
            };

            for line in lines.push(&chunk) {
                match decode_sse_line(&line, &mut decoder, &mut events) {
                    Ok(true) => {}
                    Ok(false) => {
                        ended = true;
                        break 'read;
                    }
                    Err(e) => {
                        let _ = tx.send_error(e).await;
                        return;
                    }
                }
                if !tx.send_all(events.drain(..)).await {
                    return;
                }
            }
        }

        if let Some(line) = lines.finish().filter(|_| !ended) {
            if let Err(e) = decode_sse_line(&line, &mut decoder, &mut events) {
                let _ = tx.send_error(e).await;
                return;
            }
        }
        decoder.finish(&mut events);
        tx.send_all(events.drain(..)).await;
    })
}

fn decode_sse_line<D: SseDecoder>(line: &str, decoder: &mut D, events: &mut Vec<StreamEvent>) -> LlmResult<bool> {
    let Some(data) = sse_data(line) else {
        return Ok(true);
    };
    if data == "[DONE]" {
        return Ok(false);
    }
    if data.is_empty() {
        return Ok(true);
    }
    match serde_json::from_str::<Value>(data) {
        Ok(payload) => decoder.decode(&payload, events),
        Err(e) => {
            tracing::warn!("Skipping unparseable stream line: {}", e);
            Ok(true)
        }
    }
}

/// Streaming response from a provider.
///
/// A stream built with [`LlmStream::spawn`] owns its producing task; dropping
/// the stream aborts the task together with the response body it reads.
pub struct LlmStream {
    receiver: mpsc::Receiver<LlmResult<StreamEvent>>,
    task: Option<JoinHandle<()>>,
}

impl LlmStream {
    /// Create a channel pair for building a stream
    pub fn channel(buffer: usize) -> (LlmStreamSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (LlmStreamSender { sender: tx }, Self { receiver: rx, task: None })
    }

    /// Run `produce` on a background task feeding the returned stream
    pub fn spawn<F, Fut>(buffer: usize, produce: F) -> Self
    where
        F: FnOnce(LlmStreamSender) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut stream) = Self::channel(buffer);
        stream.task = Some(tokio::spawn(produce(tx)));
        stream
    }

    /// A stream that yields the given events and ends
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // capacity covers every event
            let _ = tx.try_send(Ok(event));
        }
        Self { receiver: rx, task: None }
    }

    /// Drain the stream
    pub async fn collect_events(mut self) -> LlmResult<Vec<StreamEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            events.push(event?);
        }
        Ok(events)
    }
}

impl Drop for LlmStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Stream for LlmStream {
    type Item = LlmResult<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Sender half for building a stream
#[derive(Clone)]
pub struct LlmStreamSender {
    sender: mpsc::Sender<LlmResult<StreamEvent>>,
}

impl LlmStreamSender {
    /// Send an event; false once the receiver is gone
    pub async fn send(&self, event: StreamEvent) -> bool {
        self.sender.send(Ok(event)).await.is_ok()
    }

    pub async fn send_error(&self, error: LlmError) -> bool {
        self.sender.send(Err(error)).await.is_ok()
    }

    async fn send_all(&self, events: impl Iterator<Item = StreamEvent>) -> bool {
        for event in events {
            if !self.send(event).await {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_joins_split_lines() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"data: {\"a\":").is_empty());
        let lines = buffer.push(b"1}\r\ndata: [DO");
        assert_eq!(lines, vec!["data: {\"a\":1}".to_string()]);
        assert_eq!(buffer.finish().as_deref(), Some("data: [DO"));
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_line_buffer_keeps_multibyte_characters_intact() {
        let text = "data: สวัสดี\n".as_bytes();
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(&text[..8]).is_empty());
        let lines = buffer.push(&text[8..]);
        assert_eq!(lines, vec!["data: สวัสดี".to_string()]);
    }

    #[test]
    fn test_sse_data() {
        assert_eq!(sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data("data:[DONE]"), Some("[DONE]"));
        assert_eq!(sse_data("event: ping"), None);
        assert_eq!(sse_data(""), None);
    }

    #[test]
    fn test_decoder_flushes_on_other_delta() {
        let mut decoder = FunctionCallDecoder::new();
        assert_eq!(decoder.state(), DecodeState::Text);
        assert!(decoder.other_delta().is_none());

        decoder.function_delta(Some("weather"), Some("{\"city\":"));
        decoder.function_delta(None, Some("\"Bangkok\"}"));
        assert_eq!(decoder.state(), DecodeState::InFunctionCall);

        let call = decoder.other_delta().unwrap();
        assert_eq!(call, FunctionCall::new("weather", "{\"city\":\"Bangkok\"}"));
        assert_eq!(decoder.state(), DecodeState::Text);
        assert!(decoder.finish().is_none());
        assert_eq!(decoder.state(), DecodeState::Done);
    }

    #[test]
    fn test_decoder_flushes_on_finish() {
        let mut decoder = FunctionCallDecoder::new();
        decoder.function_delta(Some("weather"), Some("{}"));
        assert_eq!(decoder.finish(), Some(FunctionCall::new("weather", "{}")));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_drops_nameless_call() {
        let mut decoder = FunctionCallDecoder::new();
        decoder.function_delta(None, Some("{}"));
        assert!(decoder.finish().is_none());
    }

    #[tokio::test]
    async fn test_raw_response_bytes() {
        let response = RawResponse::from_chunks(vec!["ab", "cd"]);
        assert_eq!(response.status(), 200);
        assert_eq!(response.bytes().await.unwrap(), b"abcd".to_vec());
    }

    struct TextDecoder;

    impl SseDecoder for TextDecoder {
        fn decode(&mut self, payload: &Value, events: &mut Vec<StreamEvent>) -> LlmResult<bool> {
            if let Some(text) = payload.get("text").and_then(Value::as_str) {
                events.push(StreamEvent::Text(text.to_string()));
            }
            Ok(true)
        }

        fn finish(&mut self, _events: &mut Vec<StreamEvent>) {}
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_stalled_body() {
        let (body_alive, body_dropped) = tokio::sync::oneshot::channel::<()>();
        let first: LlmResult<Bytes> = Ok(Bytes::from_static(b"data: {\"text\":\"hi\"}\n\n"));
        let body = futures::stream::iter(vec![first])
            .chain(futures::stream::pending())
            .map(move |chunk| {
                let _held = &body_alive;
                chunk
            });

        let mut stream = spawn_sse_stream(RawResponse::new(200, Box::pin(body)), TextDecoder);
        assert_eq!(stream.next().await.unwrap().unwrap(), StreamEvent::Text("hi".into()));
        drop(stream);

        let released = tokio::time::timeout(std::time::Duration::from_secs(1), body_dropped).await;
        assert!(released.is_ok(), "body still held after the stream was dropped");
    }

    #[tokio::test]
    async fn test_from_events() {
        let stream = LlmStream::from_events(vec![StreamEvent::Text("hi".into())]);
        let events = stream.collect_events().await.unwrap();
        assert_eq!(events, vec![StreamEvent::Text("hi".into())]);
    }
}
