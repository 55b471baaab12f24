pub mod event;
pub mod patch;
pub mod reader;
pub mod writer;

pub use event::*;
pub use patch::{MergeKind, MergeOutcome, Patch, PatchReport};
pub use reader::{
    AsyncEventReader, EventReader, LineBuffer, NormalizedDecoder, NormalizedSchema, PayloadSchema, SseDecoder,
    UpstreamDecoder, UpstreamSchema, decode_stream,
};
pub use writer::{EventWriter, encode_event, encode_frame};
