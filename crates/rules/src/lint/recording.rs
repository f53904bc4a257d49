//! `level:metric:operations` naming convention for recording rules.

use crate::schema::RuleNamespace;

use super::ValidationError;

/// A recording rule whose name breaks the naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRuleViolation {
    pub group: String,
    pub rule: String,
    pub message: String,
}

/// Outcome of [`check_recording_rules`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingRuleReport {
    pub violations: Vec<RecordingRuleViolation>,
}

impl RecordingRuleReport {
    /// Number of violations; anything above zero fails the check.
    pub fn violations(&self) -> usize {
        self.violations.len()
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_clean() {
            return Ok(());
        }
        let mut messages: Vec<String> = self
            .violations
            .into_iter()
            .map(|v| format!("group '{}' record '{}': {}", v.group, v.rule, v.message))
            .collect();
        messages.push(format!(
            "{} recording rule(s) do not follow the level:metric:operations naming convention",
            messages.len()
        ));
        Err(ValidationError { messages })
    }
}

/// Check every recording rule name against the convention.
///
/// Loose mode asks for at least `level:metric`; strict mode asks for the full
/// `level:metric:operations` form. Alerting rules are not inspected.
pub fn check_recording_rules(namespace: &RuleNamespace, strict: bool) -> RecordingRuleReport {
    let required = if strict { 3 } else { 2 };
    let mut report = RecordingRuleReport::default();

    for (group, rule) in namespace.rules() {
        let Some(record) = rule.as_record() else {
            continue;
        };

        let chunks: Vec<&str> = record.record.split(':').collect();
        let message = if chunks.len() < required {
            Some(format!(
                "name has {} colon-separated part(s), expected at least {}",
                chunks.len(),
                required
            ))
        } else if chunks.iter().any(|c| c.is_empty()) && strict {
            Some("name has an empty colon-separated part".to_string())
        } else {
            None
        };

        if let Some(message) = message {
            tracing::warn!(
                group = %group.name,
                record = %record.record,
                strict,
                "{}",
                message
            );
            report.violations.push(RecordingRuleViolation {
                group: group.name.clone(),
                rule: record.record.clone(),
                message,
            });
        }
    }

    report
}
