//! The `rule_namespace` resource: lifecycle handlers and state formatting.
//!
//! `config_yaml` in state always holds the canonical form (or its SHA-256),
//! never the raw user text. Reads render what the ruler reports through the
//! same path, so a config and its remote copy compare equal byte for byte.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ruler_client::RulerClient;
use ruler_core::{ProviderConfig, StateFormat};
use ruler_rules::{equivalent_yaml, parse, render, sha256_hex, ParseError, RuleNamespace, Validator};

use crate::reconcile::{self, ReconcileError, ReconcileReport};

/// Settings every resource operation shares, fixed at configure time.
#[derive(Debug, Clone)]
pub struct ResourceSettings {
    pub state_format: StateFormat,
    pub validator: Validator,
}

impl ResourceSettings {
    pub fn new(state_format: StateFormat, validator: Validator) -> Self {
        Self {
            state_format,
            validator,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(config.state_format(), Validator::structural(config.backend))
    }

    /// The value stored in state for user text `text`.
    ///
    /// Never fails: unparseable text becomes an empty string and expressions
    /// the linter rejects are kept as written. Both cases log a warning.
    pub fn state_value(&self, text: &str) -> String {
        match parse(text) {
            Ok(namespace) => self.render_state(&namespace),
            Err(e) => {
                tracing::warn!(error = %e, "cannot normalize rule namespace for state");
                String::new()
            }
        }
    }

    /// Whether moving from stored `old` to configured `new` is formatting noise only.
    pub fn diff_suppress(&self, old: &str, new: &str) -> bool {
        // Empty state means normalization already failed; never match it.
        if !old.is_empty() && self.state_value(new) == old {
            return true;
        }
        // A stored digest has no structure left to compare.
        if self.state_format.is_hashed() {
            return false;
        }
        equivalent_yaml(old, new)
    }

    pub(crate) fn render_state(&self, namespace: &RuleNamespace) -> String {
        match self.validator.lint(namespace) {
            Ok((linted, _)) => render(&linted, self.state_format),
            Err(e) => {
                tracing::warn!(error = %e, "expressions failed lint, storing them unnormalized");
                render(namespace, self.state_format)
            }
        }
    }
}

/// Attribute values of one resource instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Set once created; cleared when the namespace is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub namespace: String,
    pub config_yaml: String,
    /// Recording rule names need `level:metric`; `true` also demands `:operations`.
    #[serde(default)]
    pub strict_recording_rule_check: bool,
}

impl ResourceData {
    pub fn new(namespace: impl Into<String>, config_yaml: impl Into<String>) -> Self {
        Self {
            id: None,
            namespace: namespace.into(),
            config_yaml: config_yaml.into(),
            strict_recording_rule_check: false,
        }
    }
}

/// Resource id derived from the namespace name.
pub fn resource_id(namespace: &str) -> String {
    sha256_hex(namespace.as_bytes())
}

#[derive(Clone)]
pub struct RuleNamespaceResource {
    client: Arc<dyn RulerClient>,
    settings: ResourceSettings,
}

impl std::fmt::Debug for RuleNamespaceResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleNamespaceResource")
            .field("client", &self.client.client_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl RuleNamespaceResource {
    pub fn new(client: Arc<dyn RulerClient>, settings: ResourceSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    /// Upsert every configured group, assign the id, then refresh from the ruler.
    pub async fn create(&self, data: &mut ResourceData) -> Result<ReconcileReport, ReconcileError> {
        let report = self.apply(data).await?;
        data.id = Some(resource_id(&data.namespace));
        self.read(data).await?;
        Ok(report)
    }

    /// Refresh `config_yaml` from the ruler. A namespace the ruler no longer
    /// knows clears `id` so the host drops the resource.
    pub async fn read(&self, data: &mut ResourceData) -> Result<(), ReconcileError> {
        match reconcile::read(self.client.as_ref(), &data.namespace).await? {
            Some(remote) => {
                data.config_yaml = self.settings.render_state(&remote);
            }
            None => {
                tracing::warn!(namespace = %data.namespace, "namespace not found on ruler, dropping from state");
                data.id = None;
            }
        }
        Ok(())
    }

    /// Upsert configured groups, delete groups no longer configured, then refresh.
    pub async fn update(&self, data: &mut ResourceData) -> Result<ReconcileReport, ReconcileError> {
        let report = self.apply(data).await?;
        self.read(data).await?;
        Ok(report)
    }

    /// Remove every group of the namespace.
    pub async fn delete(&self, data: &mut ResourceData) -> Result<usize, ReconcileError> {
        let removed = reconcile::delete(self.client.as_ref(), &data.namespace).await?;
        data.id = None;
        Ok(removed)
    }

    async fn apply(&self, data: &ResourceData) -> Result<ReconcileReport, ReconcileError> {
        let desired = parse(&data.config_yaml)?;
        if let Some(name) = desired.namespace.as_deref().filter(|n| *n != data.namespace) {
            tracing::debug!(
                namespace = %data.namespace,
                document_namespace = name,
                "document namespace differs from resource namespace, using resource namespace"
            );
        }
        reconcile::apply(
            self.client.as_ref(),
            &data.namespace,
            &desired,
            &self.settings.validator,
            data.strict_recording_rule_check,
        )
        .await
    }

    /// Plan-time check of `config_yaml`: it must parse.
    pub fn validate_config(text: &str) -> Result<(), ParseError> {
        parse(text).map(|_| ())
    }

    pub fn state_value(&self, text: &str) -> String {
        self.settings.state_value(text)
    }

    pub fn diff_suppress(&self, old: &str, new: &str) -> bool {
        self.settings.diff_suppress(old, new)
    }
}
