use serde::{Deserialize, Serialize};

/// One decoded unit of generation output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GenerationEvent {
    Content { text: String },
    Thinking { text: String },
    Done,
    Error { message: String },
}

impl GenerationEvent {
    pub fn content(text: impl Into<String>) -> Self {
        GenerationEvent::Content { text: text.into() }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        GenerationEvent::Thinking { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        GenerationEvent::Error {
            message: message.into(),
        }
    }

    /// `done` and `error` end a session; nothing may follow them
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationEvent::Done | GenerationEvent::Error { .. })
    }
}

/// Frame kinds of the simplified stream re-exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Content,
    Thinking,
}

/// One normalized `data: {"type":..,"data":..}` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedFrame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    pub data: String,
}

impl NormalizedFrame {
    /// Only content and thinking events have a normalized form
    pub fn from_event(event: &GenerationEvent) -> Option<Self> {
        match event {
            GenerationEvent::Content { text } => Some(Self {
                kind: FrameKind::Content,
                data: text.clone(),
            }),
            GenerationEvent::Thinking { text } => Some(Self {
                kind: FrameKind::Thinking,
                data: text.clone(),
            }),
            GenerationEvent::Done | GenerationEvent::Error { .. } => None,
        }
    }

    pub fn into_event(self) -> GenerationEvent {
        match self.kind {
            FrameKind::Content => GenerationEvent::Content { text: self.data },
            FrameKind::Thinking => GenerationEvent::Thinking { text: self.data },
        }
    }
}

/// Body of a generation request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub is_follow_up: bool,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// A follow-up carries the current document as context
    pub fn follow_up(prompt: impl Into<String>, current_html: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            current_html: Some(current_html.into()),
            model: None,
            is_follow_up: true,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The document to patch against, only meaningful for follow-ups
    pub fn context_html(&self) -> Option<&str> {
        if self.is_follow_up {
            self.current_html.as_deref()
        } else {
            None
        }
    }
}

/// JSON body returned with a non-2xx status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
