//! Engine configuration, read from the environment.

use std::num::NonZeroUsize;

use crate::error::ConfigError;

/// Knobs of the orchestration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Ceiling on combat auto-continuation iterations per input.
    pub max_auto_iterations: usize,
    /// Summarizer attempts per transition before the fallback sentence.
    pub summary_attempts: usize,
    /// Recent conversation messages handed to the summarizer.
    pub summary_window: usize,
    /// Per-session broadcast buffer.
    pub broadcast_capacity: usize,
    /// Narrator stream buffer.
    pub stream_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_auto_iterations: 50,
            summary_attempts: 2,
            summary_window: 12,
            broadcast_capacity: 256,
            stream_capacity: 64,
        }
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<NonZeroUsize>()
        .map(NonZeroUsize::get)
        .map_err(|e| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        })
}

impl EngineConfig {
    /// Reads the configuration from `LOREMASTER_*` environment variables,
    /// falling back to defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for values that are not positive
    /// integers.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for values that are not positive
    /// integers.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_auto_iterations: positive(
                &lookup,
                "LOREMASTER_MAX_AUTO_ITERATIONS",
                defaults.max_auto_iterations,
            )?,
            summary_attempts: positive(
                &lookup,
                "LOREMASTER_SUMMARY_ATTEMPTS",
                defaults.summary_attempts,
            )?,
            summary_window: positive(&lookup, "LOREMASTER_SUMMARY_WINDOW", defaults.summary_window)?,
            broadcast_capacity: positive(
                &lookup,
                "LOREMASTER_BROADCAST_CAPACITY",
                defaults.broadcast_capacity,
            )?,
            stream_capacity: positive(
                &lookup,
                "LOREMASTER_STREAM_CAPACITY",
                defaults.stream_capacity,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_auto_iterations, 50);
        assert_eq!(config.summary_attempts, 2);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("LOREMASTER_MAX_AUTO_ITERATIONS", "10"),
            ("LOREMASTER_SUMMARY_WINDOW", " 4 "),
        ]))
        .unwrap();

        assert_eq!(config.max_auto_iterations, 10);
        assert_eq!(config.summary_window, 4);
    }

    #[test]
    fn test_zero_is_rejected() {
        let result = EngineConfig::from_lookup(lookup(&[("LOREMASTER_SUMMARY_ATTEMPTS", "0")]));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "LOREMASTER_SUMMARY_ATTEMPTS",
                ..
            })
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result =
            EngineConfig::from_lookup(lookup(&[("LOREMASTER_STREAM_CAPACITY", "lots")]));

        assert!(result.is_err());
    }
}
