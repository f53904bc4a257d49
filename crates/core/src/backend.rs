//! Expression dialect a ruler backend evaluates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Query language the ruler evaluates rule expressions in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Loki ruler, LogQL expressions.
    #[default]
    Loki,
    /// Mimir/Cortex ruler, PromQL expressions.
    Mimir,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Loki => write!(f, "loki"),
            Backend::Mimir => write!(f, "mimir"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loki" => Ok(Backend::Loki),
            "mimir" | "cortex" | "prometheus" => Ok(Backend::Mimir),
            other => Err(format!("unknown backend: '{}'", other)),
        }
    }
}
