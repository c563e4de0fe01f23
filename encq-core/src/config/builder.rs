// ============================================================================
// encq-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for QueueConfig
//
// Starts from the environment-aware defaults and lets the caller override
// individual settings. build() validates the result.

use std::path::PathBuf;

use super::QueueConfig;
use crate::error::CoreResult;

/// Builder for creating QueueConfig instances.
///
/// # Examples
///
/// ```rust
/// use encq_core::config::QueueConfigBuilder;
///
/// let config = QueueConfigBuilder::new()
///     .start_paused(true)
///     .inspect_output(false)
///     .ntfy_topic("https://ntfy.sh/encodes")
///     .build()
///     .unwrap();
/// assert!(config.start_paused);
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfigBuilder {
    config: QueueConfig,
}

impl Default for QueueConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueConfigBuilder {
    /// Creates a builder seeded with defaults and `ENCQ_*` overrides.
    pub fn new() -> Self {
        Self {
            config: QueueConfig::from_env(),
        }
    }

    /// Creates a builder seeded from an existing configuration.
    pub fn from_config(config: QueueConfig) -> Self {
        Self { config }
    }

    pub fn progress_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.progress_prefix = prefix.into();
        self
    }

    pub fn start_paused(mut self, paused: bool) -> Self {
        self.config.start_paused = paused;
        self
    }

    /// Sets whether finished outputs are inspected for the size report.
    pub fn inspect_output(mut self, inspect: bool) -> Self {
        self.config.inspect_output = inspect;
        self
    }

    pub fn mediainfo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.mediainfo_path = path.into();
        self
    }

    pub fn ntfy_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.ntfy_topic = Some(topic.into());
        self
    }

    pub fn build(self) -> CoreResult<QueueConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
