//! Reconciliation of a namespace's rule groups against the remote ruler.
//!
//! Apply upserts every desired group, then deletes remote groups the desired
//! document no longer names. There is no rollback: a failure part way leaves
//! earlier calls applied, and re-running is safe because upserts replace.

use std::collections::BTreeSet;
use std::fmt;

use ruler_client::{ClientError, RulerClient};
use ruler_rules::{check_recording_rules, ParseError, RuleGroup, RuleNamespace, ValidationError, Validator};

/// Remote call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Create,
    List,
    Delete,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Create => write!(f, "create"),
            Step::List => write!(f, "list"),
            Step::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("namespace definition is not valid: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(
        "{step} failed for namespace '{namespace}'{} after {completed} successful call(s): {source}",
        group_suffix(.group)
    )]
    Remote {
        step: Step,
        namespace: String,
        group: Option<String>,
        /// Calls of this step that succeeded before the failure.
        completed: usize,
        #[source]
        source: ClientError,
    },
}

fn group_suffix(group: &Option<String>) -> String {
    group
        .as_ref()
        .map(|g| format!(" group '{}'", g))
        .unwrap_or_default()
}

/// What an apply changed on the ruler.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileReport {
    /// Groups upserted, in document order.
    pub applied: Vec<String>,
    /// Remote groups removed because the document no longer names them.
    pub deleted: Vec<String>,
}

/// Validate `desired` and the recording rule naming convention, `level:metric`
/// or with `strict` the full `level:metric:operations`. Every message is
/// reported at once.
pub fn check(desired: &RuleNamespace, validator: &Validator, strict: bool) -> Result<(), ValidationError> {
    let mut messages = match validator.validate(desired) {
        Ok(()) => Vec::new(),
        Err(e) => e.messages,
    };
    if let Err(e) = check_recording_rules(desired, strict).into_result() {
        messages.extend(e.messages);
    }
    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { messages })
    }
}

/// Make the remote `namespace` hold exactly the groups of `desired`.
pub async fn apply(
    client: &dyn RulerClient,
    namespace: &str,
    desired: &RuleNamespace,
    validator: &Validator,
    strict_recording_check: bool,
) -> Result<ReconcileReport, ReconcileError> {
    check(desired, validator, strict_recording_check)?;

    let mut report = ReconcileReport::default();
    for group in &desired.groups {
        client
            .create_rule_group(namespace, group)
            .await
            .map_err(|source| ReconcileError::Remote {
                step: Step::Create,
                namespace: namespace.to_string(),
                group: Some(group.name.clone()),
                completed: report.applied.len(),
                source,
            })?;
        tracing::info!(namespace, group = %group.name, rules = group.rules.len(), "rule group applied");
        report.applied.push(group.name.clone());
    }

    let remote = list(client, namespace).await?.unwrap_or_default();
    let wanted: BTreeSet<&str> = desired.groups.iter().map(|g| g.name.as_str()).collect();
    let stale: BTreeSet<&str> = remote
        .iter()
        .map(|g| g.name.as_str())
        .filter(|name| !wanted.contains(name))
        .collect();

    for name in stale {
        match client.delete_rule_group(namespace, name).await {
            Ok(()) => {
                tracing::info!(namespace, group = name, "stale rule group deleted");
                report.deleted.push(name.to_string());
            }
            Err(ClientError::NotFound) => {
                tracing::debug!(namespace, group = name, "stale rule group already gone");
            }
            Err(source) => {
                return Err(ReconcileError::Remote {
                    step: Step::Delete,
                    namespace: namespace.to_string(),
                    group: Some(name.to_string()),
                    completed: report.deleted.len(),
                    source,
                })
            }
        }
    }

    Ok(report)
}

/// Delete every group of `namespace`. Returns how many were removed.
pub async fn delete(client: &dyn RulerClient, namespace: &str) -> Result<usize, ReconcileError> {
    let Some(groups) = list(client, namespace).await? else {
        tracing::debug!(namespace, "namespace already absent");
        return Ok(0);
    };

    let mut removed = 0;
    for group in &groups {
        match client.delete_rule_group(namespace, &group.name).await {
            Ok(()) => removed += 1,
            Err(ClientError::NotFound) => {
                tracing::debug!(namespace, group = %group.name, "rule group already gone");
            }
            Err(source) => {
                tracing::warn!(
                    namespace,
                    group = %group.name,
                    removed,
                    total = groups.len(),
                    "namespace partially deleted"
                );
                return Err(ReconcileError::Remote {
                    step: Step::Delete,
                    namespace: namespace.to_string(),
                    group: Some(group.name.clone()),
                    completed: removed,
                    source,
                });
            }
        }
    }

    tracing::info!(namespace, removed, "namespace deleted");
    Ok(removed)
}

/// Fetch the remote groups of `namespace`; `None` when the ruler has none.
pub async fn read(
    client: &dyn RulerClient,
    namespace: &str,
) -> Result<Option<RuleNamespace>, ReconcileError> {
    Ok(list(client, namespace).await?.map(RuleNamespace::new))
}

async fn list(
    client: &dyn RulerClient,
    namespace: &str,
) -> Result<Option<Vec<RuleGroup>>, ReconcileError> {
    match client.list_rules(namespace).await {
        Ok(mut listing) => Ok(Some(listing.remove(namespace).unwrap_or_default())),
        Err(ClientError::NotFound) => Ok(None),
        Err(source) => Err(ReconcileError::Remote {
            step: Step::List,
            namespace: namespace.to_string(),
            group: None,
            completed: 0,
            source,
        }),
    }
}
