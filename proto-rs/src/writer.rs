use crate::{ErrorBody, GenerationEvent, NormalizedFrame};
use std::io::{self, Write};

/// MIME type of the normalized stream
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Encode one normalized frame as `data: <json>\n\n`
pub fn encode_frame(frame: &NormalizedFrame) -> io::Result<Vec<u8>> {
    let json = serde_json::to_string(frame)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(format!("data: {}\n\n", json).into_bytes())
}

/// Encode a mid-stream failure as `data: {"error":".."}\n\n`
pub fn encode_error(message: &str) -> io::Result<Vec<u8>> {
    let json = serde_json::to_string(&ErrorBody::new(message))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(format!("data: {}\n\n", json).into_bytes())
}

/// Encode an event for the normalized stream.
///
/// `done` has no frame (clients see the stream close instead), so it
/// encodes to `None`.
pub fn encode_event(event: &GenerationEvent) -> io::Result<Option<Vec<u8>>> {
    match event {
        GenerationEvent::Error { message } => encode_error(message).map(Some),
        GenerationEvent::Done => Ok(None),
        other => match NormalizedFrame::from_event(other) {
            Some(frame) => encode_frame(&frame).map(Some),
            None => Ok(None),
        },
    }
}

/// Writer for the normalized event stream
pub struct EventWriter<W: Write> {
    writer: W,
    frames_written: usize,
    closed: bool,
}

impl<W: Write> EventWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_written: 0,
            closed: false,
        }
    }

    /// Write one event. Anything after a terminal event is rejected.
    pub fn write_event(&mut self, event: &GenerationEvent) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Stream already terminated",
            ));
        }
        if let Some(bytes) = encode_event(event)? {
            self.writer.write_all(&bytes)?;
            self.frames_written += 1;
        }
        if event.is_terminal() {
            self.closed = true;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameKind;

    #[test]
    fn frame_wire_format() {
        let frame = NormalizedFrame {
            kind: FrameKind::Thinking,
            data: "plan \"layout\"".to_string(),
        };
        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "data: {\"type\":\"thinking\",\"data\":\"plan \\\"layout\\\"\"}\n\n"
        );
    }

    #[test]
    fn writer_stops_after_terminal_event() {
        let mut writer = EventWriter::new(Vec::new());
        writer.write_event(&GenerationEvent::content("<h1>")).unwrap();
        writer.write_event(&GenerationEvent::Done).unwrap();
        assert!(writer.is_closed());
        assert!(writer.write_event(&GenerationEvent::content("late")).is_err());
        assert_eq!(writer.frames_written(), 1);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "data: {\"type\":\"content\",\"data\":\"<h1>\"}\n\n");
    }

    #[test]
    fn error_event_encodes_error_body() {
        let bytes = encode_event(&GenerationEvent::error("upstream closed"))
            .unwrap()
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "data: {\"error\":\"upstream closed\"}\n\n"
        );
    }
}
