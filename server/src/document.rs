//! Document state and the editor session around it
//!
//! The document is only ever replaced wholesale: by a finished generation,
//! a direct source edit or a version restore. Style edits and document
//! replacement must not race, so every mutating call is refused with
//! [`GenerationError::Busy`] while a generation is in flight.

use crate::generation::GenerationError;
use crate::store::StyleMap;
use crate::style::history::{ChangeBatch, StyleChange, StyleHistory};
use crate::style::validate::{StyleValue, ValidationResult, normalize_property, validate_style};
use pagesmith_proto::GenerateRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>New page</title>
  <style>
    body { font-family: system-ui, sans-serif; margin: 0; padding: 2rem; }
  </style>
</head>
<body>
  <h1>Describe the page you want to build</h1>
</body>
</html>"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    content: String,
    has_unsaved_changes: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            has_unsaved_changes: false,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    /// Swap in new text; marks the document unsaved if it changed
    pub fn replace(&mut self, content: impl Into<String>) -> bool {
        let content = content.into();
        if content == self.content {
            return false;
        }
        self.content = content;
        self.has_unsaved_changes = true;
        true
    }

    /// Load saved text; the document matches storage afterwards
    pub fn restore(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.has_unsaved_changes = false;
    }

    pub fn mark_saved(&mut self) {
        self.has_unsaved_changes = false;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Rendered page
    #[default]
    Preview,
    /// Rendered page with the element selection overlay
    Design,
    /// Raw source
    Code,
}

/// Viewport the renderer lays the document out for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportProfile {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl ViewportProfile {
    pub fn width(self) -> u32 {
        match self {
            ViewportProfile::Desktop => 1280,
            ViewportProfile::Tablet => 768,
            ViewportProfile::Mobile => 375,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// What the element inspector reports for a clicked element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSnapshot {
    pub selector: String,
    pub element_type: String,
    #[serde(default)]
    pub computed_styles: BTreeMap<String, String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub click_position: Option<Point>,
}

impl StyleSnapshot {
    /// Computed value for `property` in either camelCase or kebab-case
    pub fn computed(&self, property: &str) -> Option<&str> {
        self.computed_styles
            .get(property)
            .or_else(|| self.computed_styles.get(&normalize_property(property)))
            .map(String::as_str)
    }
}

/// Where style values end up, typically the live rendered document
pub trait StyleTarget {
    fn apply_style(&mut self, selector: &str, property: &str, value: &StyleValue);
}

/// An empty value removes the property
impl StyleTarget for StyleMap {
    fn apply_style(&mut self, selector: &str, property: &str, value: &StyleValue) {
        let text = value.to_string();
        if text.is_empty() {
            if let Some(properties) = self.get_mut(selector) {
                properties.remove(property);
                if properties.is_empty() {
                    self.remove(selector);
                }
            }
        } else {
            self.entry(selector.to_string())
                .or_default()
                .insert(property.to_string(), text);
        }
    }
}

/// Editor state for one open project
#[derive(Debug, Default)]
pub struct EditorSession {
    document: Document,
    view: ViewMode,
    viewport: ViewportProfile,
    history: StyleHistory,
    styles: StyleMap,
    // id of the newest generation still in flight
    generating: Option<u64>,
    generations: u64,
}

impl EditorSession {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    /// Start from previously persisted inline styles
    pub fn with_styles(mut self, styles: StyleMap) -> Self {
        self.styles = styles;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn viewport(&self) -> ViewportProfile {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: ViewportProfile) {
        self.viewport = viewport;
    }

    pub fn history(&self) -> &StyleHistory {
        &self.history
    }

    /// Inline styles applied through the session so far
    pub fn styles(&self) -> &StyleMap {
        &self.styles
    }

    pub fn is_generating(&self) -> bool {
        self.generating.is_some()
    }

    fn ensure_idle(&self) -> Result<(), GenerationError> {
        if self.generating.is_some() {
            Err(GenerationError::Busy)
        } else {
            Ok(())
        }
    }

    /// Build the request for a new generation and close the editing gate.
    /// Returns the generation id to hand back with its result.
    ///
    /// Starting while another generation runs is allowed; the caller's
    /// [`Generator`](crate::generation::Generator) cancels the old one, and
    /// only the newest generation's result reopens the gate.
    pub fn begin_generation(
        &mut self,
        prompt: impl Into<String>,
        model: Option<String>,
        is_follow_up: bool,
    ) -> (u64, GenerateRequest) {
        self.history.flush();
        self.generations += 1;
        let id = self.generations;
        self.generating = Some(id);

        let mut request = if is_follow_up {
            GenerateRequest::follow_up(prompt, self.document.content())
        } else {
            GenerateRequest::new(prompt)
        };
        request.model = model;
        (id, request)
    }

    /// Reopen the gate and take the outcome of generation `id`.
    ///
    /// A completed generation replaces the document; a cancelled or failed
    /// one leaves it as it was. Results of superseded generations are
    /// dropped and keep the gate closed. Returns whether the document
    /// changed.
    pub fn apply_generation_result(
        &mut self,
        id: u64,
        result: Result<Option<String>, GenerationError>,
    ) -> Result<bool, GenerationError> {
        if self.generating != Some(id) {
            debug!("Dropping result of superseded generation {}", id);
            return Ok(false);
        }
        self.generating = None;
        match result? {
            Some(content) => Ok(self.document.replace(content)),
            None => Ok(false),
        }
    }

    /// Direct edit from the code view
    pub fn set_source(&mut self, content: impl Into<String>) -> Result<bool, GenerationError> {
        self.ensure_idle()?;
        Ok(self.document.replace(content))
    }

    pub fn restore_version(&mut self, content: impl Into<String>) -> Result<(), GenerationError> {
        self.ensure_idle()?;
        self.document.restore(content);
        Ok(())
    }

    pub fn mark_saved(&mut self) {
        self.document.mark_saved();
    }

    /// Validate a style edit on the element in `snapshot` and record it.
    /// Property names are stored in camelCase.
    ///
    /// Only valid values reach `target` and the history; the result is
    /// returned either way for inline feedback. The baseline for undo is
    /// the value this session last applied, else the snapshot's computed
    /// value.
    pub fn record_style_edit(
        &mut self,
        snapshot: &StyleSnapshot,
        property: &str,
        raw: StyleValue,
        now: Instant,
        target: &mut dyn StyleTarget,
    ) -> Result<ValidationResult, GenerationError> {
        self.ensure_idle()?;

        let property = normalize_property(property);
        let property = property.as_str();
        let result = validate_style(property, &raw);
        if !result.is_valid {
            debug!(
                "Rejected {} on {}: {}",
                property,
                snapshot.selector,
                result.error.as_deref().unwrap_or("invalid value")
            );
            return Ok(result);
        }

        let old_value = self
            .styles
            .get(&snapshot.selector)
            .and_then(|properties| properties.get(property))
            .map(String::as_str)
            .or_else(|| snapshot.computed(property))
            .unwrap_or_default();

        let change = StyleChange::new(
            snapshot.selector.as_str(),
            property,
            old_value,
            result.sanitized_value.clone(),
        );
        self.history.push_change(change, now);
        self.apply(&snapshot.selector, property, &result.sanitized_value, target);
        Ok(result)
    }

    fn apply(
        &mut self,
        selector: &str,
        property: &str,
        value: &StyleValue,
        target: &mut dyn StyleTarget,
    ) {
        self.styles.apply_style(selector, property, value);
        target.apply_style(selector, property, value);
    }

    /// Commit pending style edits whose debounce window has passed
    pub fn tick(&mut self, now: Instant) -> bool {
        self.history.tick(now)
    }

    /// Undo the latest batch, restoring old values in reverse order
    pub fn undo(
        &mut self,
        target: &mut dyn StyleTarget,
    ) -> Result<Option<ChangeBatch>, GenerationError> {
        self.ensure_idle()?;
        let Some(batch) = self.history.undo() else {
            return Ok(None);
        };
        for change in batch.iter().rev() {
            self.apply(&change.selector, &change.property, &change.old_value, target);
        }
        Ok(Some(batch))
    }

    /// Redo the next batch, applying new values in order
    pub fn redo(
        &mut self,
        target: &mut dyn StyleTarget,
    ) -> Result<Option<ChangeBatch>, GenerationError> {
        self.ensure_idle()?;
        let Some(batch) = self.history.redo() else {
            return Ok(None);
        };
        for change in &batch {
            self.apply(&change.selector, &change.property, &change.new_value, target);
        }
        Ok(Some(batch))
    }
}
