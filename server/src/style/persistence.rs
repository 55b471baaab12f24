//! Debounced persistence of the project style map
//!
//! Writes land in the store only after the map has been quiet for the
//! debounce window. Storage is best-effort: load and save failures are
//! logged and otherwise ignored.

use crate::store::{ProjectStore, StyleMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_PERSIST_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct StylePersistence {
    store: Arc<dyn ProjectStore>,
    project_id: String,
    styles: StyleMap,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl StylePersistence {
    /// Load whatever map was persisted before. A failed load starts empty.
    pub async fn load(store: Arc<dyn ProjectStore>, project_id: &str, debounce: Duration) -> Self {
        let styles = match store.load_styles(project_id).await {
            Ok(Some(styles)) => {
                info!("Loaded {} styled selectors for {}", styles.len(), project_id);
                styles
            }
            Ok(None) => StyleMap::new(),
            Err(e) => {
                warn!("Failed to load styles for {}: {}", project_id, e);
                StyleMap::new()
            }
        };

        Self {
            store,
            project_id: project_id.to_string(),
            styles,
            debounce,
            deadline: None,
        }
    }

    pub fn styles(&self) -> &StyleMap {
        &self.styles
    }

    pub fn set(&mut self, selector: &str, property: &str, value: impl Into<String>, now: Instant) {
        self.styles
            .entry(selector.to_string())
            .or_default()
            .insert(property.to_string(), value.into());
        self.touch(now);
    }

    pub fn remove(&mut self, selector: &str, property: &str, now: Instant) {
        if let Some(properties) = self.styles.get_mut(selector) {
            properties.remove(property);
            if properties.is_empty() {
                self.styles.remove(selector);
            }
        }
        self.touch(now);
    }

    pub fn replace(&mut self, styles: StyleMap, now: Instant) {
        self.styles = styles;
        self.touch(now);
    }

    fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
    }

    pub fn is_dirty(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Save if the debounce window has passed. Returns true if a write was
    /// attempted.
    pub async fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush().await,
            _ => false,
        }
    }

    /// Save immediately if anything changed since the last write
    pub async fn flush(&mut self) -> bool {
        if self.deadline.take().is_none() {
            return false;
        }
        match self.store.save_styles(&self.project_id, &self.styles).await {
            Ok(()) => debug!("Persisted styles for {}", self.project_id),
            Err(e) => warn!("Failed to persist styles for {}: {}", self.project_id, e),
        }
        true
    }
}

enum Command {
    Replace(StyleMap),
    Flush,
}

/// Background writer owning a [`StylePersistence`]
pub struct PersistenceHandle {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl PersistenceHandle {
    pub fn spawn(persistence: StylePersistence) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(persistence, rx));
        Self { tx, task }
    }

    /// Queue a new map; it is written once updates stop for the debounce window
    pub fn update(&self, styles: StyleMap) {
        if self.tx.send(Command::Replace(styles)).is_err() {
            warn!("Style persistence task is gone, dropping update");
        }
    }

    pub fn flush(&self) {
        let _ = self.tx.send(Command::Flush);
    }

    /// Write anything pending and stop the task
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!("Style persistence task failed: {}", e);
        }
    }
}

async fn run(mut persistence: StylePersistence, mut rx: mpsc::UnboundedReceiver<Command>) {
    loop {
        let deadline = persistence.next_deadline();
        let sleep = async {
            match deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Replace(styles)) => persistence.replace(styles, Instant::now()),
                Some(Command::Flush) => {
                    persistence.flush().await;
                }
                None => {
                    persistence.flush().await;
                    break;
                }
            },
            _ = sleep => {
                persistence.poll(Instant::now()).await;
            }
        }
    }
    debug!("Style persistence for {} stopped", persistence.project_id);
}
