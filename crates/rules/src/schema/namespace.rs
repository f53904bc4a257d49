//! Namespace and rule group containers.

use serde::{Deserialize, Serialize};

use super::{PromDuration, Rule};

/// A rule namespace document as authored by the user or listed by the ruler.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuleNamespace {
    /// Carried through parsing only; the resource's `namespace` attribute is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

impl RuleNamespace {
    pub fn new(groups: Vec<RuleGroup>) -> Self {
        Self {
            namespace: None,
            groups,
        }
    }

    /// Group names in document order.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn group(&self, name: &str) -> Option<&RuleGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Iterate `(group, rule)` pairs across the whole namespace.
    pub fn rules(&self) -> impl Iterator<Item = (&RuleGroup, &Rule)> {
        self.groups
            .iter()
            .flat_map(|g| g.rules.iter().map(move |r| (g, r)))
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }
}

/// A named set of rules evaluated together on a shared cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(deny_unknown_fields)]
pub struct RuleGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<PromDuration>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Where the ruler forwards recording rule results, if anywhere.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_write: Vec<RemoteWriteConfig>,
}

impl RuleGroup {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            interval: None,
            rules,
            remote_write: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(deny_unknown_fields)]
pub struct RemoteWriteConfig {
    pub url: String,
}
