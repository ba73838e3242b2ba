//! Hierarchy settings

use crate::scene::CaptureDecision;
use serde::{Deserialize, Serialize};

/// Tunables for a [`Hierarchy`](crate::scene::Hierarchy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchySettings {
    /// Prefix for names issued to nodes created without one.
    pub default_name_prefix: String,
    /// Reject adding a node under any of its own descendants, not only itself.
    pub strict_cycle_check: bool,
    /// Decision used for unit failures when no capture hook is installed.
    pub default_capture: CaptureDecision,
    /// Log a warning listing components that failed to attach.
    pub warn_unattached_units: bool,
}

impl HierarchySettings {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for HierarchySettings {
    fn default() -> Self {
        Self {
            default_name_prefix: "Entity".to_string(),
            strict_cycle_check: true,
            default_capture: CaptureDecision::Suppress,
            warn_unattached_units: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings = HierarchySettings::from_json_str(r#"{ "strict_cycle_check": false }"#)
            .expect("valid settings");
        assert!(!settings.strict_cycle_check);
        assert_eq!(settings.default_name_prefix, "Entity");
        assert_eq!(settings.default_capture, CaptureDecision::Suppress);
    }

    #[test]
    fn capture_decision_reads_from_json() {
        let settings =
            HierarchySettings::from_json_str(r#"{ "default_capture": "Rethrow" }"#).unwrap();
        assert_eq!(settings.default_capture, CaptureDecision::Rethrow);

        let json = settings.to_json_string().unwrap();
        assert!(json.contains("Rethrow"));
    }
}
