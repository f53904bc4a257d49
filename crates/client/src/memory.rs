//! In-process ruler for tests and dry runs.
//!
//! Mirrors the ruler API semantics: creating a group replaces any group with
//! the same name, deleting or listing something absent is `NotFound`, and a
//! namespace disappears with its last group. State sits behind a mutex owned
//! by the ruler; every call returns an independent snapshot.

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use ruler_rules::RuleGroup;

use crate::traits::{ClientError, NamespaceGroups, RulerClient};

/// One call made against a [`MemoryRuler`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { namespace: String, group: String },
    Delete { namespace: String, group: String },
    List { namespace: String },
}

/// Which call an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
    List,
}

#[derive(Debug, Default)]
struct State {
    namespaces: BTreeMap<String, Vec<RuleGroup>>,
    calls: Vec<Call>,
    /// `(operation, group)` pairs that fail with a 500 until cleared.
    /// For `List` the group is matched against the namespace name.
    failures: Vec<(Operation, String)>,
}

impl State {
    fn failing(&self, operation: Operation, target: &str) -> Result<(), ClientError> {
        if self.failures.iter().any(|(op, name)| *op == operation && name == target) {
            return Err(ClientError::Status {
                status: 500,
                body: format!("injected {:?} failure for '{}'", operation, target),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRuler {
    state: Mutex<State>,
}

impl MemoryRuler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `namespace` with `groups`, replacing whatever was there.
    pub async fn seed(&self, namespace: &str, groups: Vec<RuleGroup>) {
        let mut state = self.state.lock().await;
        if groups.is_empty() {
            state.namespaces.remove(namespace);
        } else {
            state.namespaces.insert(namespace.to_string(), groups);
        }
    }

    /// Make every `operation` on `target` fail until [`clear_failures`](Self::clear_failures).
    pub async fn fail_on(&self, operation: Operation, target: &str) {
        self.state
            .lock()
            .await
            .failures
            .push((operation, target.to_string()));
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Copy of the groups stored for `namespace`, in storage order.
    pub async fn groups(&self, namespace: &str) -> Vec<RuleGroup> {
        self.state
            .lock()
            .await
            .namespaces
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    /// Calls made so far.
    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    pub async fn reset_calls(&self) {
        self.state.lock().await.calls.clear();
    }
}

#[async_trait::async_trait]
impl RulerClient for MemoryRuler {
    async fn create_rule_group(&self, namespace: &str, group: &RuleGroup) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Create {
            namespace: namespace.to_string(),
            group: group.name.clone(),
        });
        state.failing(Operation::Create, &group.name)?;

        let groups = state.namespaces.entry(namespace.to_string()).or_default();
        groups.retain(|g| g.name != group.name);
        groups.push(group.clone());
        Ok(())
    }

    async fn delete_rule_group(&self, namespace: &str, group: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Delete {
            namespace: namespace.to_string(),
            group: group.to_string(),
        });
        state.failing(Operation::Delete, group)?;

        let groups = state.namespaces.get_mut(namespace).ok_or(ClientError::NotFound)?;
        let before = groups.len();
        groups.retain(|g| g.name != group);
        if groups.len() == before {
            return Err(ClientError::NotFound);
        }
        if groups.is_empty() {
            state.namespaces.remove(namespace);
        }
        Ok(())
    }

    async fn list_rules(&self, namespace: &str) -> Result<NamespaceGroups, ClientError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::List {
            namespace: namespace.to_string(),
        });
        state.failing(Operation::List, namespace)?;

        let groups = state.namespaces.get(namespace).cloned().ok_or(ClientError::NotFound)?;
        Ok(BTreeMap::from([(namespace.to_string(), groups)]))
    }

    fn client_name(&self) -> &str {
        "memory"
    }
}
