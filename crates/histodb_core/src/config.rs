//! Versioning configuration.

use crate::clock::{Clock, SystemClock};
use crate::fields::DEFAULT_IDENTITY;
use serde::Deserialize;
use std::sync::Arc;

/// Configuration for a versioned collection.
///
/// Everything but the clock can be loaded with serde; missing keys take
/// their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VersioningConfig {
    /// Name of the history (shadow) collection.
    pub collection: String,

    /// Whether to create the temporal lookup index on the history collection.
    pub ensure_index: bool,

    /// Whether failing operations are logged at error level before being
    /// returned.
    pub log_error: bool,

    /// Editor recorded when neither the call nor the record names one.
    pub default_editor: String,

    /// Deleter recorded when neither the call nor the record names one.
    pub default_deleter: String,

    /// Source of mutation timestamps. Defaults to the process-wide
    /// [`SystemClock::shared`], so separate handles on one collection never
    /// stamp out of order.
    #[serde(skip, default = "system_clock")]
    pub clock: Arc<dyn Clock>,
}

fn system_clock() -> Arc<dyn Clock> {
    SystemClock::shared()
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            collection: "versions".to_string(),
            ensure_index: true,
            log_error: false,
            default_editor: DEFAULT_IDENTITY.to_string(),
            default_deleter: DEFAULT_IDENTITY.to_string(),
            clock: system_clock(),
        }
    }
}

impl VersioningConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the history collection name.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = name.into();
        self
    }

    /// Sets whether the history index is created.
    #[must_use]
    pub fn ensure_index(mut self, value: bool) -> Self {
        self.ensure_index = value;
        self
    }

    /// Sets whether failures are logged.
    #[must_use]
    pub fn log_error(mut self, value: bool) -> Self {
        self.log_error = value;
        self
    }

    /// Sets the default editor identity.
    #[must_use]
    pub fn default_editor(mut self, editor: impl Into<String>) -> Self {
        self.default_editor = editor.into();
        self
    }

    /// Sets the default deleter identity.
    #[must_use]
    pub fn default_deleter(mut self, deleter: impl Into<String>) -> Self {
        self.default_deleter = deleter.into();
        self
    }

    /// Sets the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// A bare string names the history collection.
impl From<&str> for VersioningConfig {
    fn from(collection: &str) -> Self {
        Self::default().collection(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use histodb_codec::Timestamp;

    #[test]
    fn default_config() {
        let config = VersioningConfig::default();
        assert_eq!(config.collection, "versions");
        assert!(config.ensure_index);
        assert!(!config.log_error);
        assert_eq!(config.default_editor, "default");
        assert_eq!(config.default_deleter, "default");
    }

    #[test]
    fn default_configs_share_one_clock() {
        let a = VersioningConfig::default();
        let b = VersioningConfig::from("audit");
        let mut last = a.clock.now();
        for _ in 0..500 {
            for config in [&b, &a] {
                let next = config.clock.now();
                assert!(next > last, "{next} not after {last}");
                last = next;
            }
        }
    }

    #[test]
    fn string_shorthand() {
        let config = VersioningConfig::from("audit");
        assert_eq!(config.collection, "audit");
        assert!(config.ensure_index);
    }

    #[test]
    fn builder_pattern() {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(42)));
        let config = VersioningConfig::new()
            .collection("shadow")
            .ensure_index(false)
            .log_error(true)
            .default_editor("system")
            .clock(clock);

        assert_eq!(config.collection, "shadow");
        assert!(!config.ensure_index);
        assert!(config.log_error);
        assert_eq!(config.default_editor, "system");
        assert_eq!(config.clock.now(), Timestamp::from_millis(42));
    }

    #[test]
    fn deserialize_partial() {
        let config: VersioningConfig =
            serde_json::from_str(r#"{"collection": "hist", "logError": true}"#).unwrap();
        assert_eq!(config.collection, "hist");
        assert!(config.log_error);
        assert!(config.ensure_index);
        assert_eq!(config.default_deleter, "default");
    }
}
