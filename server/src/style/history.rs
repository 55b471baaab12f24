//! Undo/redo over style edits with debounced batching
//!
//! Edits arrive through [`StyleHistory::push_change`] and accumulate in a
//! pending list until the debounce deadline passes. The history owns that
//! deadline; callers drive it by passing the current [`Instant`] to
//! [`StyleHistory::tick`] (or awaiting [`StyleHistory::next_deadline`]).
//! Undo and redo hand back the affected batch; applying old or new values to
//! the document is the caller's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::style::validate::StyleValue;

pub const DEFAULT_MAX_SIZE: usize = 50;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// One property mutation on one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleChange {
    pub selector: String,
    pub property: String,
    pub old_value: StyleValue,
    pub new_value: StyleValue,
    pub timestamp: DateTime<Utc>,
}

impl StyleChange {
    pub fn new(
        selector: impl Into<String>,
        property: impl Into<String>,
        old_value: impl Into<StyleValue>,
        new_value: impl Into<StyleValue>,
    ) -> Self {
        Self {
            selector: selector.into(),
            property: property.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            timestamp: Utc::now(),
        }
    }

    fn same_target(&self, other: &StyleChange) -> bool {
        self.selector == other.selector && self.property == other.property
    }
}

/// Changes committed together as one undo/redo unit
pub type ChangeBatch = Vec<StyleChange>;

#[derive(Debug)]
pub struct StyleHistory {
    past: VecDeque<ChangeBatch>,
    present: Option<ChangeBatch>,
    future: VecDeque<ChangeBatch>,
    max_size: usize,
    debounce: Duration,
    pending: ChangeBatch,
    deadline: Option<Instant>,
}

impl Default for StyleHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_DEBOUNCE)
    }
}

impl StyleHistory {
    /// `max_size` is clamped to at least one entry
    pub fn new(max_size: usize, debounce: Duration) -> Self {
        Self {
            past: VecDeque::new(),
            present: None,
            future: VecDeque::new(),
            max_size: max_size.max(1),
            debounce,
            pending: Vec::new(),
            deadline: None,
        }
    }

    /// Record one edit, coalescing with the pending edit of the same
    /// selector and property. Re-arms the debounce deadline.
    pub fn push_change(&mut self, change: StyleChange, now: Instant) {
        coalesce(&mut self.pending, change);
        self.deadline = Some(now + self.debounce);
    }

    /// Commit pending edits if the debounce deadline has passed.
    /// Returns true when a batch was committed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(),
            _ => false,
        }
    }

    /// Commit pending edits right away
    pub fn flush(&mut self) -> bool {
        self.deadline = None;
        if self.pending.is_empty() {
            return false;
        }
        let batch = std::mem::take(&mut self.pending);
        self.commit(batch);
        true
    }

    /// Commit a set of edits as one batch, skipping the debounce window.
    /// Edits already pending are committed first so ordering holds.
    pub fn batch_changes(&mut self, changes: ChangeBatch) {
        self.flush();
        let mut batch = ChangeBatch::with_capacity(changes.len());
        for change in changes {
            coalesce(&mut batch, change);
        }
        if batch.is_empty() {
            return;
        }
        self.commit(batch);
    }

    fn commit(&mut self, batch: ChangeBatch) {
        debug!(changes = batch.len(), "Committing style batch");
        if let Some(previous) = self.present.take() {
            self.past.push_back(previous);
        }
        self.present = Some(batch);
        self.future.clear();
        self.evict();
    }

    fn evict(&mut self) {
        let present = usize::from(self.present.is_some());
        while self.past.len() + present > self.max_size {
            self.past.pop_front();
        }
    }

    /// Step back one batch. Pending edits are flushed first so the latest
    /// edit is what gets undone.
    ///
    /// Returns the undone batch; the caller restores its `old_value`s.
    pub fn undo(&mut self) -> Option<ChangeBatch> {
        self.flush();
        let undone = self.present.take()?;
        self.present = self.past.pop_back();
        self.future.push_front(undone.clone());
        Some(undone)
    }

    /// Returns the redone batch; the caller applies its `new_value`s.
    pub fn redo(&mut self) -> Option<ChangeBatch> {
        let redone = self.future.pop_front()?;
        if let Some(previous) = self.present.take() {
            self.past.push_back(previous);
        }
        self.present = Some(redone.clone());
        self.evict();
        Some(redone)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty() || self.present.is_some()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Drop everything, including pending edits
    pub fn clear(&mut self) {
        self.past.clear();
        self.present = None;
        self.future.clear();
        self.pending.clear();
        self.deadline = None;
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn present(&self) -> Option<&ChangeBatch> {
        self.present.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> &[StyleChange] {
        &self.pending
    }

    /// When the pending edits will be committed, if any are waiting
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// One entry per selector and property: the first `old_value` is kept,
/// the newest `new_value` wins
fn coalesce(batch: &mut ChangeBatch, change: StyleChange) {
    match batch.iter_mut().find(|c| c.same_target(&change)) {
        Some(existing) => {
            existing.new_value = change.new_value;
            existing.timestamp = change.timestamp;
        }
        None => batch.push(change),
    }
}
