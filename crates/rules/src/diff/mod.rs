//! Order-insensitive comparison of namespaces.
//!
//! Two namespaces are the same when their canonical forms are: the same set
//! of groups by name, each with the same settings and the same multiset of
//! rules. Authoring order and the namespace name play no part.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::canonical::sorted;
use crate::parser::parse_groups;
use crate::schema::{RuleGroup, RuleNamespace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeState {
    Unchanged,
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeState::Unchanged => "unchanged",
            ChangeState::Created => "created",
            ChangeState::Updated => "updated",
            ChangeState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupChange {
    pub name: String,
    pub state: ChangeState,
}

/// Per-group outcome of comparing an old namespace to a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceChange {
    /// `Unchanged` or `Updated` for the namespace as a whole.
    pub state: ChangeState,
    /// Every group on either side, by name.
    pub groups: Vec<GroupChange>,
}

impl NamespaceChange {
    pub fn is_changed(&self) -> bool {
        self.state != ChangeState::Unchanged
    }

    /// Names of groups in the given state.
    pub fn names(&self, state: ChangeState) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|g| g.state == state)
            .map(|g| g.name.as_str())
            .collect()
    }
}

/// Whether `a` and `b` are the same namespace up to ordering.
pub fn equivalent(a: &RuleNamespace, b: &RuleNamespace) -> bool {
    sorted(a).groups == sorted(b).groups
}

/// Compare `old` to `new` group by group.
pub fn compare(old: &RuleNamespace, new: &RuleNamespace) -> NamespaceChange {
    let old = by_name(sorted(old).groups);
    let new = by_name(sorted(new).groups);

    let mut groups = Vec::new();
    for (name, before) in &old {
        let state = match new.get(name) {
            None => ChangeState::Deleted,
            Some(after) if after == before => ChangeState::Unchanged,
            Some(_) => ChangeState::Updated,
        };
        groups.push(GroupChange {
            name: name.clone(),
            state,
        });
    }
    for name in new.keys().filter(|name| !old.contains_key(*name)) {
        groups.push(GroupChange {
            name: name.clone(),
            state: ChangeState::Created,
        });
    }
    groups.sort_by(|a, b| a.name.cmp(&b.name));

    let state = if old == new {
        ChangeState::Unchanged
    } else {
        ChangeState::Updated
    };
    NamespaceChange { state, groups }
}

/// Compare two YAML texts, typically stored state against new configuration.
///
/// Either side failing to parse counts as a difference so the host shows a
/// change rather than silently keeping stale state.
pub fn equivalent_yaml(old: &str, new: &str) -> bool {
    let old = match parse_groups(old) {
        Ok(ns) => ns,
        Err(e) => {
            tracing::warn!(error = %e, side = "old", "unparseable rules in diff, reporting a change");
            return false;
        }
    };
    let new = match parse_groups(new) {
        Ok(ns) => ns,
        Err(e) => {
            tracing::warn!(error = %e, side = "new", "unparseable rules in diff, reporting a change");
            return false;
        }
    };
    equivalent(&old, &new)
}

/// Groups keyed by name; repeated names stay together under one key.
fn by_name(groups: Vec<RuleGroup>) -> BTreeMap<String, Vec<RuleGroup>> {
    let mut map: BTreeMap<String, Vec<RuleGroup>> = BTreeMap::new();
    for group in groups {
        map.entry(group.name.clone()).or_default().push(group);
    }
    map
}
