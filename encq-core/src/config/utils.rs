//! Configuration utility functions
//!
//! Helpers for reading overrides from the environment. Lookups go through a
//! closure so tests can supply their own variables.

/// Reads an environment variable, treating non-UTF-8 values as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parses the usual spellings of a boolean flag.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get a boolean value from `lookup` or use the default
pub fn lookup_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| parse_bool(&v)).unwrap_or(default)
}
