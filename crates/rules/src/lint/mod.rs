//! Expression linting and structural validation of namespace documents.
//!
//! Every rule of every group is checked and all failures are collected into
//! one [`ValidationError`], so an operator can fix a document in one pass.
//! Validation never blocks parsing; it blocks create and update.

mod expr;
mod group_checks;
mod recording;


use std::fmt;
use std::sync::Arc;

use ruler_core::Backend;

use crate::schema::{Rule, RuleNamespace};

pub use expr::{ExpressionLinter, StructuralLinter};
pub use recording::{check_recording_rules, RecordingRuleReport, RecordingRuleViolation};

// ── Result types ────────────────────────────────────────────────────

/// Every problem found in a namespace, in document order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the following errors were encountered validating rule groups:\n{}", .messages.join("\n"))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

/// Counts from a lint pass that rewrote expressions to normalized form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LintSummary {
    pub changed: usize,
    pub total: usize,
}

/// Collector threaded through the individual checks.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    messages: Vec<String>,
}

impl Findings {
    pub(crate) fn error(&mut self, path: impl fmt::Display, message: impl fmt::Display) {
        self.messages.push(format!("{}: {}", path, message));
    }

    pub(crate) fn into_result(self) -> Result<(), ValidationError> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                messages: self.messages,
            })
        }
    }
}

/// Location label used in messages, e.g. `group 'api' rule 2 (alert 'HighLatency')`.
pub(crate) fn rule_path(group: &str, index: usize, rule: &Rule) -> String {
    format!(
        "group '{}' rule {} ({} '{}')",
        group,
        index + 1,
        rule.kind(),
        rule.name()
    )
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a namespace: group structure plus every expression against `backend`.
pub fn validate(
    namespace: &RuleNamespace,
    linter: &dyn ExpressionLinter,
    backend: Backend,
) -> Result<(), ValidationError> {
    let mut findings = Findings::default();
    group_checks::validate_groups(namespace, &mut findings);
    for group in &namespace.groups {
        for (i, rule) in group.rules.iter().enumerate() {
            if let Err(message) = linter.lint(rule.expr(), backend) {
                findings.error(rule_path(&group.name, i, rule), message);
            }
        }
    }
    findings.into_result()
}

/// Return a copy of `namespace` with every expression in the linter's normalized form.
///
/// Fails with every lint error when any expression is rejected.
pub fn lint(
    namespace: &RuleNamespace,
    linter: &dyn ExpressionLinter,
    backend: Backend,
) -> Result<(RuleNamespace, LintSummary), ValidationError> {
    let mut findings = Findings::default();
    let mut summary = LintSummary::default();
    let mut linted = namespace.clone();

    for group in &mut linted.groups {
        for (i, rule) in group.rules.iter_mut().enumerate() {
            summary.total += 1;
            match linter.lint(rule.expr(), backend) {
                Ok(normalized) => {
                    if normalized != rule.expr() {
                        summary.changed += 1;
                        *rule.expr_mut() = normalized;
                    }
                }
                Err(message) => findings.error(rule_path(&group.name, i, rule), message),
            }
        }
    }

    findings.into_result()?;
    tracing::debug!(changed = summary.changed, total = summary.total, %backend, "linted expressions");
    Ok((linted, summary))
}

/// A linter bound to the backend dialect it checks against.
#[derive(Clone)]
pub struct Validator {
    linter: Arc<dyn ExpressionLinter>,
    backend: Backend,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Validator {
    pub fn new(linter: Arc<dyn ExpressionLinter>, backend: Backend) -> Self {
        Self { linter, backend }
    }

    /// Validator backed by the built-in [`StructuralLinter`].
    pub fn structural(backend: Backend) -> Self {
        Self::new(Arc::new(StructuralLinter), backend)
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn validate(&self, namespace: &RuleNamespace) -> Result<(), ValidationError> {
        validate(namespace, self.linter.as_ref(), self.backend)
    }

    pub fn lint(
        &self,
        namespace: &RuleNamespace,
    ) -> Result<(RuleNamespace, LintSummary), ValidationError> {
        lint(namespace, self.linter.as_ref(), self.backend)
    }
}
