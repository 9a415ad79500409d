//! Factory configuration.

use serde::{Deserialize, Serialize};

/// Default limit on condition-group nesting.
pub const DEFAULT_MAX_CONDITION_DEPTH: usize = 10;

/// Settings applied to a [`Factory`](crate::Factory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Maximum group-nesting depth per condition tree. `0` disables the check.
    pub max_condition_depth: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            max_condition_depth: DEFAULT_MAX_CONDITION_DEPTH,
        }
    }
}

impl FactoryConfig {
    /// Sets the depth limit.
    #[must_use]
    pub const fn max_condition_depth(mut self, depth: usize) -> Self {
        self.max_condition_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_depth() {
        assert_eq!(FactoryConfig::default().max_condition_depth, 10);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: FactoryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FactoryConfig::default());
        let config: FactoryConfig =
            serde_json::from_str(r#"{"max_condition_depth": 0}"#).unwrap();
        assert_eq!(config.max_condition_depth, 0);
    }
}
