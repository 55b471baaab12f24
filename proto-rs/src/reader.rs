use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{self, Read};

use futures::{Stream, StreamExt, stream};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{GenerationEvent, NormalizedFrame};

/// Sentinel payload that ends an upstream stream
pub const DONE_SENTINEL: &str = "[DONE]";

const READ_CHUNK_SIZE: usize = 8192;

/// Splits a chunked byte stream into complete lines.
///
/// Bytes are held until a newline arrives, so both a line and a multi-byte
/// UTF-8 sequence may straddle two reads.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every line it completes (without the newline)
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let rest = self.buf.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.buf, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Take whatever is left once the stream has ended
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string())
    }

    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

/// Maps one parsed `data:` payload to generation events
pub trait PayloadSchema {
    fn decode(&self, payload: &Value) -> Vec<GenerationEvent>;
}

/// OpenAI-style chat completion chunks:
/// `{"choices":[{"delta":{"content":"..","reasoning":".."}}]}`
#[derive(Debug, Clone, Copy, Default)]
pub struct UpstreamSchema;

impl PayloadSchema for UpstreamSchema {
    fn decode(&self, payload: &Value) -> Vec<GenerationEvent> {
        if let Some(message) = error_message(payload) {
            return vec![GenerationEvent::error(message)];
        }

        let delta = &payload["choices"][0]["delta"];
        let mut events = Vec::new();

        let reasoning = delta["reasoning"]
            .as_str()
            .or_else(|| delta["reasoning_content"].as_str());
        if let Some(text) = reasoning.filter(|t| !t.is_empty()) {
            events.push(GenerationEvent::thinking(text));
        }

        if let Some(text) = delta["content"].as_str().filter(|t| !t.is_empty()) {
            events.push(GenerationEvent::content(text));
        }

        events
    }
}

/// The simplified `{"type":"content"|"thinking","data":".."}` frames this
/// system re-exposes, plus `{"error":".."}` for a failure mid-stream
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedSchema;

impl PayloadSchema for NormalizedSchema {
    fn decode(&self, payload: &Value) -> Vec<GenerationEvent> {
        if let Some(message) = error_message(payload) {
            return vec![GenerationEvent::error(message)];
        }

        match serde_json::from_value::<NormalizedFrame>(payload.clone()) {
            Ok(frame) if !frame.data.is_empty() => vec![frame.into_event()],
            _ => Vec::new(),
        }
    }
}

fn error_message(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    if error.is_null() {
        return None;
    }
    let message = error["message"]
        .as_str()
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(message)
}

/// Incremental server-sent-event decoder.
///
/// Feed it raw chunks as they arrive; it yields events in arrival order and
/// accumulates the full content and reasoning text on the side. Once a
/// terminal event has been produced every further call yields nothing.
#[derive(Debug)]
pub struct SseDecoder<S> {
    lines: LineBuffer,
    schema: S,
    content: String,
    reasoning: String,
    finished: bool,
    discarded: usize,
}

pub type UpstreamDecoder = SseDecoder<UpstreamSchema>;
pub type NormalizedDecoder = SseDecoder<NormalizedSchema>;

impl SseDecoder<UpstreamSchema> {
    pub fn upstream() -> Self {
        Self::new(UpstreamSchema)
    }
}

impl SseDecoder<NormalizedSchema> {
    pub fn normalized() -> Self {
        Self::new(NormalizedSchema)
    }
}

impl<S: PayloadSchema> SseDecoder<S> {
    pub fn new(schema: S) -> Self {
        Self {
            lines: LineBuffer::new(),
            schema,
            content: String::new(),
            reasoning: String::new(),
            finished: false,
            discarded: 0,
        }
    }

    /// Decode one chunk of bytes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        for line in self.lines.push(chunk) {
            self.process_line(&line, &mut events);
            if self.finished {
                break;
            }
        }
        events
    }

    /// The byte stream ended. Flushes a trailing unterminated line and emits
    /// `done` if no terminal event was seen.
    pub fn finish(&mut self) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        if let Some(line) = self.lines.take_remainder() {
            self.process_line(&line, &mut events);
        }
        if !self.finished {
            self.finished = true;
            events.push(GenerationEvent::Done);
        }
        events
    }

    /// The transport failed. Yields a terminal `error` unless already finished.
    pub fn fail(&mut self, message: impl Into<String>) -> Option<GenerationEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(GenerationEvent::error(message))
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<GenerationEvent>) {
        let line = line.trim();
        let Some(data) = line.strip_prefix("data:") else {
            // blank separators, comments and `event:`/`id:` fields
            return;
        };
        let data = data.trim_start();

        if data == DONE_SENTINEL {
            self.finished = true;
            events.push(GenerationEvent::Done);
            return;
        }

        let payload: Value = match serde_json::from_str(data) {
            Ok(payload) => payload,
            Err(_) => {
                self.discarded += 1;
                return;
            }
        };

        for event in self.schema.decode(&payload) {
            match &event {
                GenerationEvent::Content { text } => self.content.push_str(text),
                GenerationEvent::Thinking { text } => self.reasoning.push_str(text),
                GenerationEvent::Done | GenerationEvent::Error { .. } => self.finished = true,
            }
            events.push(event);
            if self.finished {
                return;
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Everything streamed as content so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Everything streamed as reasoning so far
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Number of `data:` lines dropped because they were not JSON
    pub fn discarded_lines(&self) -> usize {
        self.discarded
    }

    pub fn into_parts(self) -> (String, String) {
        (self.content, self.reasoning)
    }
}

struct DecodeState<S, St> {
    decoder: SseDecoder<S>,
    source: St,
    pending: VecDeque<GenerationEvent>,
    exhausted: bool,
}

/// Drive a decoder from an async chunk stream.
///
/// The returned stream ends right after its terminal event. A transport
/// error from `source` becomes a terminal `error` event.
pub fn decode_stream<S, St, B, E>(
    decoder: SseDecoder<S>,
    source: St,
) -> impl Stream<Item = GenerationEvent>
where
    S: PayloadSchema,
    St: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let state = DecodeState {
        decoder,
        source,
        pending: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }
            if state.exhausted || state.decoder.is_finished() {
                return None;
            }
            match state.source.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.feed(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.pending.extend(state.decoder.fail(e.to_string()));
                    state.exhausted = true;
                }
                None => {
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                    state.exhausted = true;
                }
            }
        }
    })
}

/// Blocking reader for captured event streams (files, pipes)
pub struct EventReader<R: Read, S> {
    reader: R,
    decoder: SseDecoder<S>,
    pending: VecDeque<GenerationEvent>,
    position: usize,
}

impl<R: Read, S: PayloadSchema> EventReader<R, S> {
    pub fn new(reader: R, schema: S) -> Self {
        Self {
            reader,
            decoder: SseDecoder::new(schema),
            pending: VecDeque::new(),
            position: 0,
        }
    }

    /// Read the next event.
    /// Returns Ok(None) once the terminal event has been handed out.
    pub fn read_event(&mut self) -> io::Result<Option<GenerationEvent>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.decoder.is_finished() {
                return Ok(None);
            }

            let read = match self.reader.read(&mut chunk) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.decoder.fail(e.to_string());
                    return Err(e);
                }
            };
            self.position += read;

            if read == 0 {
                let events = self.decoder.finish();
                self.pending.extend(events);
            } else {
                let events = self.decoder.feed(&chunk[..read]);
                self.pending.extend(events);
            }
        }
    }

    /// Read all remaining events into a vector
    pub fn read_all_events(&mut self) -> io::Result<Vec<GenerationEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.read_event()? {
            events.push(event);
        }
        Ok(events)
    }

    /// Bytes consumed from the underlying reader
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn decoder(&self) -> &SseDecoder<S> {
        &self.decoder
    }
}

/// Async counterpart of [`EventReader`] over any tokio reader
pub struct AsyncEventReader<R, S> {
    reader: R,
    decoder: SseDecoder<S>,
    pending: VecDeque<GenerationEvent>,
}

impl<R: AsyncRead + Unpin, S: PayloadSchema> AsyncEventReader<R, S> {
    pub fn new(reader: R, schema: S) -> Self {
        Self {
            reader,
            decoder: SseDecoder::new(schema),
            pending: VecDeque::new(),
        }
    }

    pub async fn next(&mut self) -> Option<io::Result<GenerationEvent>> {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.decoder.is_finished() {
                return None;
            }
            match self.reader.read(&mut chunk).await {
                Ok(0) => {
                    let events = self.decoder.finish();
                    self.pending.extend(events);
                }
                Ok(read) => {
                    let events = self.decoder.feed(&chunk[..read]);
                    self.pending.extend(events);
                }
                Err(e) => {
                    // a read failure ends the stream like an error event
                    self.decoder.fail(e.to_string());
                    return Some(Err(e));
                }
            }
        }
    }

    pub fn decoder(&self) -> &SseDecoder<S> {
        &self.decoder
    }
}
