//! How a normalized `config_yaml` value is stored in state.

use serde::{Deserialize, Serialize};

/// Storage form of a namespace definition in state.
///
/// `Sha256` keeps state small at the cost of operators no longer being able
/// to read the stored rules. It is opt-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFormat {
    /// Canonical YAML text.
    #[default]
    Yaml,
    /// Lowercase hex SHA-256 of the canonical YAML bytes.
    Sha256,
}

impl StateFormat {
    /// Map the provider's `store_rules_sha256` switch onto a format.
    pub fn from_store_sha256(store_sha256: bool) -> Self {
        if store_sha256 {
            StateFormat::Sha256
        } else {
            StateFormat::Yaml
        }
    }

    pub fn is_hashed(self) -> bool {
        matches!(self, StateFormat::Sha256)
    }
}
