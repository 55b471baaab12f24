//! Generation sessions
//!
//! A [`GenerationSession`] owns one request from submission to the merged
//! document. It reads the normalized event stream from a
//! [`GenerationBackend`], forwards events to the caller in arrival order and,
//! once the stream completes, merges the accumulated content into the current
//! document. Cancellation goes through a [`CancellationToken`] checked at
//! every read; a cancelled session resolves to `Ok(None)` and sends nothing
//! further.
//!
//! [`Generator`] keeps at most one session in flight by cancelling the
//! previous one whenever a new one starts.

use axum::body::Bytes;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use pagesmith_proto::patch::{MergeKind, merge_response};
use pagesmith_proto::writer::EVENT_STREAM_CONTENT_TYPE;
use pagesmith_proto::{GenerateRequest, GenerationEvent, NormalizedDecoder, decode_stream};
use serde_json::Value;
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Raw response bytes as they come off the wire
pub type ByteStream = BoxStream<'static, Result<Bytes, GenerationError>>;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Generation endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The stream ended with an error event
    #[error("{0}")]
    Stream(String),

    #[error("A generation is in progress")]
    Busy,
}

/// Pull a readable message out of an error response body
pub(crate) fn error_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let candidates = [&value["error"], &value["error"]["message"], &value["message"]];
        if let Some(message) = candidates.iter().find_map(|v| v.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Request failed with status {}", status)
    } else {
        trimmed.chars().take(500).collect()
    }
}

/// Source of a normalized event stream for one request
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn open(&self, request: &GenerateRequest) -> Result<ByteStream, GenerationError>;
}

/// Talks to a `POST /api/generate` endpoint over HTTP
pub struct HttpBackend {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpBackend {
    pub fn new(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }
}

#[async_trait::async_trait]
impl GenerationBackend for HttpBackend {
    async fn open(&self, request: &GenerateRequest) -> Result<ByteStream, GenerationError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, EVENT_STREAM_CONTENT_TYPE)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message: error_message(&text, status.as_u16()),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(GenerationError::from))
            .boxed())
    }
}

/// Replays canned chunks; used by tests and offline demos
pub struct ScriptedBackend {
    chunks: Vec<Bytes>,
    failure: Option<(u16, String)>,
    hold_open: bool,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            failure: None,
            hold_open: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with an error status
    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        let mut backend = Self::new(Vec::<Bytes>::new());
        backend.failure = Some((status, message.into()));
        backend
    }

    /// Never end the stream after the canned chunks
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait::async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn open(&self, request: &GenerateRequest) -> Result<ByteStream, GenerationError> {
        lock(&self.requests).push(request.clone());

        if let Some((status, message)) = &self.failure {
            return Err(GenerationError::Status {
                status: *status,
                message: message.clone(),
            });
        }

        let chunks = stream::iter(self.chunks.clone().into_iter().map(Ok));
        if self.hold_open {
            Ok(chunks.chain(stream::pending()).boxed())
        } else {
            Ok(chunks.boxed())
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Request submitted, nothing received yet
    Sending,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, SessionState::Sending | SessionState::Streaming)
    }
}

pub struct GenerationSession {
    id: u64,
    state: SessionState,
    token: CancellationToken,
    content: String,
    reasoning: String,
}

impl GenerationSession {
    pub fn new(id: u64, token: CancellationToken) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            token,
            content: String::new(),
            reasoning: String::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle for aborting this session from elsewhere
    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    fn cancelled(&mut self) -> Option<String> {
        info!("Generation {} cancelled", self.id);
        self.state = SessionState::Cancelled;
        None
    }

    /// Run the request to completion.
    ///
    /// Events are forwarded to `events` as they arrive. On success the
    /// merged document is returned; `Ok(None)` means the session was
    /// cancelled. `document` is never modified in place.
    pub async fn run(
        &mut self,
        backend: &dyn GenerationBackend,
        request: &GenerateRequest,
        document: &str,
        events: &mpsc::UnboundedSender<GenerationEvent>,
    ) -> Result<Option<String>, GenerationError> {
        if self.state != SessionState::Idle {
            return Err(GenerationError::Busy);
        }
        if self.token.is_cancelled() {
            return Ok(self.cancelled());
        }

        self.state = SessionState::Sending;
        debug!(
            "Generation {} sending (follow-up: {})",
            self.id, request.is_follow_up
        );

        let token = self.token.clone();
        let source = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(self.cancelled()),
            opened = backend.open(request) => match opened {
                Ok(source) => source,
                Err(e) => {
                    warn!("Generation {} failed to start: {}", self.id, e);
                    self.state = SessionState::Failed;
                    return Err(e);
                }
            },
        };

        let mut stream = pin!(decode_stream(NormalizedDecoder::normalized(), source));
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(self.cancelled()),
                next = stream.next() => next,
            };
            let Some(event) = next else {
                break;
            };

            if self.state == SessionState::Sending {
                self.state = SessionState::Streaming;
            }

            let terminal = event.is_terminal();
            match &event {
                GenerationEvent::Content { text } => self.content.push_str(text),
                GenerationEvent::Thinking { text } => self.reasoning.push_str(text),
                GenerationEvent::Done => {}
                GenerationEvent::Error { message } => {
                    warn!("Generation {} failed: {}", self.id, message);
                    let message = message.clone();
                    let _ = events.send(event);
                    self.state = SessionState::Failed;
                    return Err(GenerationError::Stream(message));
                }
            }

            // a dropped receiver only means nobody is watching progress
            let _ = events.send(event);
            if terminal {
                break;
            }
        }

        let outcome = merge_response(document, &self.content, request.is_follow_up);
        match outcome.kind {
            MergeKind::Patched { applied, skipped } => info!(
                "Generation {} patched document ({} applied, {} skipped)",
                self.id, applied, skipped
            ),
            MergeKind::Replaced => info!("Generation {} replaced document", self.id),
            MergeKind::Unchanged => warn!("Generation {} left document unchanged", self.id),
        }

        self.state = SessionState::Completed;
        Ok(Some(outcome.document))
    }
}

struct ActiveSession {
    id: u64,
    token: CancellationToken,
}

/// Keeps at most one generation in flight
#[derive(Default)]
pub struct Generator {
    active: Mutex<Option<ActiveSession>>,
    next_id: AtomicU64,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the next session, cancelling whichever one was in flight
    pub fn start(&self) -> GenerationSession {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();

        let previous = lock(&self.active).replace(ActiveSession {
            id,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            info!("Cancelling generation {} for {}", previous.id, id);
            previous.token.cancel();
        }

        GenerationSession::new(id, token)
    }

    /// Cancel the in-flight session, if any
    pub fn cancel(&self) -> bool {
        match lock(&self.active).take() {
            Some(active) => {
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Forget `session` if it is still the active one
    pub fn finish(&self, session: &GenerationSession) {
        let mut active = lock(&self.active);
        if active.as_ref().is_some_and(|a| a.id == session.id()) {
            *active = None;
        }
    }

    /// Start a session, run it and release it
    pub async fn generate(
        &self,
        backend: &dyn GenerationBackend,
        request: &GenerateRequest,
        document: &str,
        events: &mpsc::UnboundedSender<GenerationEvent>,
    ) -> Result<Option<String>, GenerationError> {
        let mut session = self.start();
        let result = session.run(backend, request, document, events).await;
        self.finish(&session);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    const DOCUMENT: &str = "<!DOCTYPE html><html><body><h1>Old</h1></body></html>";

    fn frame(kind: &str, data: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "type": kind, "data": data })
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<GenerationEvent>) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_first_generation_extracts_document() {
        let backend = ScriptedBackend::new(vec![
            frame("thinking", "Planning a layout"),
            frame("content", "Here you go:\n```html\n<!DOCTYPE html><html>"),
            frame("content", "<body>New</body></html>\n```"),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = GenerationSession::new(1, CancellationToken::new());

        let result = session
            .run(&backend, &GenerateRequest::new("a page"), DOCUMENT, &tx)
            .await
            .unwrap();

        assert_eq!(
            result.as_deref(),
            Some("<!DOCTYPE html><html><body>New</body></html>")
        );
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.reasoning(), "Planning a layout");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], GenerationEvent::thinking("Planning a layout"));
        assert_eq!(events.last(), Some(&GenerationEvent::Done));
    }

    #[tokio::test]
    async fn test_follow_up_applies_patch() {
        let patch = "<<<<<<< SEARCH\n<h1>Old</h1>\n=======\n<h1>New</h1>\n>>>>>>> REPLACE";
        let backend = ScriptedBackend::new(vec![frame("content", patch)]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let request = GenerateRequest::follow_up("rename", DOCUMENT);
        let mut session = GenerationSession::new(1, CancellationToken::new());

        let result = session.run(&backend, &request, DOCUMENT, &tx).await.unwrap();
        assert_eq!(
            result.as_deref(),
            Some("<!DOCTYPE html><html><body><h1>New</h1></body></html>")
        );
        assert_eq!(backend.requests(), vec![request]);
    }

    #[tokio::test]
    async fn test_status_error_fails_session() {
        let backend = ScriptedBackend::failing(503, "No API key configured");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = GenerationSession::new(1, CancellationToken::new());

        let result = session
            .run(&backend, &GenerateRequest::new("x"), DOCUMENT, &tx)
            .await;
        assert!(matches!(
            result,
            Err(GenerationError::Status { status: 503, .. })
        ));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_error_frame_is_terminal() {
        let backend = ScriptedBackend::new(vec![
            frame("content", "<!DOCTYPE html><html>"),
            "data: {\"error\":\"rate limited\"}\n\n".to_string(),
            frame("content", "never seen"),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = GenerationSession::new(1, CancellationToken::new());

        let result = session
            .run(&backend, &GenerateRequest::new("x"), DOCUMENT, &tx)
            .await;
        match result {
            Err(GenerationError::Stream(message)) => assert_eq!(message, "rate limited"),
            other => panic!("unexpected result: {:?}", other),
        }

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], GenerationEvent::error("rate limited"));
    }

    #[tokio::test]
    async fn test_session_runs_once() {
        let backend = ScriptedBackend::new(vec![frame("content", "<p>hi</p>")]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = GenerationSession::new(1, CancellationToken::new());
        let request = GenerateRequest::new("x");

        session.run(&backend, &request, DOCUMENT, &tx).await.unwrap();
        let again = session.run(&backend, &request, DOCUMENT, &tx).await;
        assert!(matches!(again, Err(GenerationError::Busy)));
    }

    #[tokio::test]
    async fn test_cancel_stops_reading() {
        let backend = Arc::new(ScriptedBackend::new(vec![frame("content", "partial")]).hold_open());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let mut session = GenerationSession::new(7, token.clone());

        let task = tokio::spawn({
            let backend = backend.clone();
            async move {
                let result = session
                    .run(backend.as_ref(), &GenerateRequest::new("x"), DOCUMENT, &tx)
                    .await;
                (result, session.state())
            }
        });

        // wait for the partial content to arrive before cancelling
        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(first, Some(GenerationEvent::content("partial")));

        token.cancel();
        let (result, state) = task.await.unwrap();
        assert!(matches!(result, Ok(None)));
        assert_eq!(state, SessionState::Cancelled);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_pre_cancelled_session_never_opens() {
        let backend = ScriptedBackend::new(vec![frame("content", "x")]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        token.cancel();
        let mut session = GenerationSession::new(1, token);

        let result = session
            .run(&backend, &GenerateRequest::new("x"), DOCUMENT, &tx)
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_generator_cancels_previous_session() {
        let generator = Arc::new(Generator::new());
        let backend = Arc::new(ScriptedBackend::new(vec![frame("content", "slow")]).hold_open());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = tokio::spawn({
            let generator = generator.clone();
            let backend = backend.clone();
            async move {
                generator
                    .generate(backend.as_ref(), &GenerateRequest::new("one"), DOCUMENT, &tx)
                    .await
            }
        });

        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert!(generator.is_active());

        let second = generator.start();
        assert_eq!(second.id(), 2);
        assert!(matches!(first.await.unwrap(), Ok(None)));

        // the first session finishing must not release the second
        assert!(generator.is_active());
        generator.finish(&second);
        assert!(!generator.is_active());
        assert!(!generator.cancel());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":"bad key"}"#, 401), "bad key");
        assert_eq!(
            error_message(r#"{"error":{"message":"quota exceeded","code":429}}"#, 429),
            "quota exceeded"
        );
        assert_eq!(error_message("  upstream down  ", 502), "upstream down");
        assert_eq!(error_message("", 500), "Request failed with status 500");
    }
}
