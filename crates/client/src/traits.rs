//! Ruler client trait and shared error types.

use std::collections::BTreeMap;

use ruler_rules::RuleGroup;

/// Errors a ruler client can return.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The namespace or group does not exist on the ruler.
    #[error("requested resource not found")]
    NotFound,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ruler returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode ruler response: {0}")]
    Decode(String),

    #[error("failed to encode rule group: {0}")]
    Encode(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }
}

/// Rule groups as listed by the ruler, keyed by namespace.
pub type NamespaceGroups = BTreeMap<String, Vec<RuleGroup>>;

/// Remote ruler API used by the reconciler.
///
/// Every call returns data by value; implementations never hand out
/// references into their own state.
#[async_trait::async_trait]
pub trait RulerClient: Send + Sync {
    /// Create or replace the group named `group.name` in `namespace`.
    async fn create_rule_group(&self, namespace: &str, group: &RuleGroup) -> Result<(), ClientError>;

    /// Delete one group. [`ClientError::NotFound`] when it does not exist.
    async fn delete_rule_group(&self, namespace: &str, group: &str) -> Result<(), ClientError>;

    /// List the groups of `namespace`. [`ClientError::NotFound`] when the
    /// namespace has no groups at all.
    async fn list_rules(&self, namespace: &str) -> Result<NamespaceGroups, ClientError>;

    /// Short name for logs (e.g. "http", "memory").
    fn client_name(&self) -> &str;
}
