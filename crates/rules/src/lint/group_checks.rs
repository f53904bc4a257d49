//! Structural checks on groups and rules that the typed parse cannot express.

use std::collections::HashSet;

use super::{rule_path, Findings};
use crate::schema::{Rule, RuleNamespace};

const RESERVED_LABEL: &str = "__name__";

pub(super) fn validate_groups(namespace: &RuleNamespace, findings: &mut Findings) {
    let mut seen = HashSet::new();

    for (g, group) in namespace.groups.iter().enumerate() {
        let group_path = format!("group {} ('{}')", g + 1, group.name);

        if group.name.trim().is_empty() {
            findings.error(&group_path, "group name must not be empty");
        } else if !seen.insert(group.name.as_str()) {
            findings.error(
                &group_path,
                format!("group name '{}' is repeated in the same namespace", group.name),
            );
        }

        for (w, target) in group.remote_write.iter().enumerate() {
            let path = format!("{} remote_write {}", group_path, w + 1);
            if target.url.trim().is_empty() {
                findings.error(&path, "url must not be empty");
            } else if let Err(e) = url::Url::parse(&target.url) {
                findings.error(&path, format!("invalid url '{}': {}", target.url, e));
            }
        }

        for (i, rule) in group.rules.iter().enumerate() {
            check_rule(&rule_path(&group.name, i, rule), rule, findings);
        }
    }
}

fn check_rule(path: &str, rule: &Rule, findings: &mut Findings) {
    match rule {
        Rule::Alert(alert) => {
            if alert.alert.trim().is_empty() {
                findings.error(path, "alert name must not be empty");
            }
        }
        Rule::Record(record) => {
            if !is_metric_name(&record.record) {
                findings.error(
                    path,
                    format!("invalid recording rule name '{}'", record.record),
                );
            }
        }
    }

    for name in rule.labels().keys() {
        if !is_label_name(name) {
            findings.error(path, format!("invalid label name '{}'", name));
        }
    }
    for name in rule.annotations().into_iter().flat_map(|a| a.keys()) {
        if !is_label_name(name) {
            findings.error(path, format!("invalid annotation name '{}'", name));
        }
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub(crate) fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, excluding the reserved metric name label.
pub(crate) fn is_label_name(name: &str) -> bool {
    if name == RESERVED_LABEL {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
