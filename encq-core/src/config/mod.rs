// ============================================================================
// encq-core/src/config/mod.rs
// ============================================================================
//
// CONFIGURATION: Settings for the queue and supervisor
//
// QueueConfig holds the few knobs the core has. Values come from the
// defaults below, then environment overrides, then whatever the caller sets
// through QueueConfigBuilder (the CLI maps its flags onto the builder).

use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};

mod builder;
pub mod utils;

pub use builder::QueueConfigBuilder;

/// Lines starting with this are encoder progress lines.
pub const DEFAULT_PROGRESS_PREFIX: &str = "fra";

pub const DEFAULT_START_PAUSED: bool = false;

/// Inspect finished outputs to produce a size report.
pub const DEFAULT_INSPECT_OUTPUT: bool = true;

pub const DEFAULT_MEDIAINFO_PATH: &str = "mediainfo";

pub const ENV_PROGRESS_PREFIX: &str = "ENCQ_PROGRESS_PREFIX";
pub const ENV_START_PAUSED: &str = "ENCQ_START_PAUSED";
pub const ENV_INSPECT_OUTPUT: &str = "ENCQ_INSPECT_OUTPUT";
pub const ENV_MEDIAINFO: &str = "ENCQ_MEDIAINFO";

#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    pub progress_prefix: String,
    pub start_paused: bool,
    pub inspect_output: bool,
    pub mediainfo_path: PathBuf,
    /// Full ntfy topic URL, e.g. `https://ntfy.sh/encodes`.
    pub ntfy_topic: Option<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            progress_prefix: DEFAULT_PROGRESS_PREFIX.to_string(),
            start_paused: DEFAULT_START_PAUSED,
            inspect_output: DEFAULT_INSPECT_OUTPUT,
            mediainfo_path: PathBuf::from(DEFAULT_MEDIAINFO_PATH),
            ntfy_topic: None,
        }
    }
}

impl QueueConfig {
    /// Defaults with the `ENCQ_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(utils::env_lookup);
        config
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Values that do not parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(prefix) = lookup(ENV_PROGRESS_PREFIX).filter(|p| !p.is_empty()) {
            self.progress_prefix = prefix;
        }
        self.start_paused = utils::lookup_bool(&lookup, ENV_START_PAUSED, self.start_paused);
        self.inspect_output =
            utils::lookup_bool(&lookup, ENV_INSPECT_OUTPUT, self.inspect_output);
        if let Some(path) = lookup(ENV_MEDIAINFO).filter(|p| !p.is_empty()) {
            self.mediainfo_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.progress_prefix.is_empty() {
            return Err(CoreError::Config(
                "progress prefix must not be empty".to_string(),
            ));
        }
        if let Some(topic) = &self.ntfy_topic {
            if !topic.starts_with("https://") {
                return Err(CoreError::Config(format!(
                    "ntfy topic '{topic}' must be an https:// URL"
                )));
            }
        }
        Ok(())
    }
}
