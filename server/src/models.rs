//! Enabled generation models
//!
//! Model ids are opaque strings passed through to the provider.

use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRegistry {
    models: Vec<String>,
    default_model: String,
}

impl ModelRegistry {
    /// Returns `None` when no models are enabled. A default that is not in
    /// the enabled list is ignored in favour of the first model.
    pub fn new(models: Vec<String>, default_model: Option<String>) -> Option<Self> {
        let first = models.first()?.clone();
        let default_model = match default_model {
            Some(model) if models.contains(&model) => model,
            Some(model) => {
                warn!("Default model {} is not enabled, using {}", model, first);
                first
            }
            None => first,
        };
        Some(Self {
            models,
            default_model,
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn is_enabled(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// The requested model if enabled, the default otherwise
    pub fn resolve<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(model) if self.is_enabled(model) => model,
            Some(model) => {
                debug!("Unknown model {}, using {}", model, self.default_model);
                &self.default_model
            }
            None => &self.default_model,
        }
    }
}
