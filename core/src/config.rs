//! Registry configuration.

use serde::{Deserialize, Serialize};

/// What happens when an identity is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `DuplicateRegistration`.
    Reject,
    /// Last write wins.
    Replace,
}

/// Service registry configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Policy applied on re-registration of an identity
    pub duplicate_policy: DuplicatePolicy,
    /// Whether `construct` may build unregistered `Injectable` types
    pub auto_construct: bool,
    /// Maximum nesting of constructor parameter resolution
    pub max_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            auto_construct: true,
            max_depth: 64,
        }
    }
}

impl RegistryConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(config.auto_construct);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_from_json_partial() {
        let config = RegistryConfig::from_json(r#"{"duplicate_policy": "replace"}"#).unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Replace);
        assert!(config.auto_construct);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_from_json_rejects_unknown_policy() {
        assert!(RegistryConfig::from_json(r#"{"duplicate_policy": "merge"}"#).is_err());
    }
}
