//! Visual style editing: value validation, undo/redo history and
//! persistence of the resulting style map.

pub mod history;
pub mod persistence;
pub mod validate;

pub use history::{ChangeBatch, StyleChange, StyleHistory};
pub use persistence::{PersistenceHandle, StylePersistence};
pub use validate::{StyleValue, ValidationResult, validate_style};
