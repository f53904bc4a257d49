//! Provider configuration: turns [`ProviderConfig`] into a ready resource.

use std::sync::Arc;

use ruler_client::{ClientError, HttpRulerClient, RulerClient};
use ruler_core::ProviderConfig;

use crate::resource::{ResourceSettings, RuleNamespaceResource};

pub const USER_AGENT: &str = concat!("ruler-provider/", env!("CARGO_PKG_VERSION"));

/// Build the `rule_namespace` resource backed by the HTTP ruler client.
pub fn configure(config: &ProviderConfig) -> Result<RuleNamespaceResource, ClientError> {
    let client = HttpRulerClient::from_config(config, USER_AGENT)?;
    config.log_summary();
    Ok(with_client(Arc::new(client), config))
}

/// Build the resource around an existing client, e.g. an in-memory ruler.
pub fn with_client(client: Arc<dyn RulerClient>, config: &ProviderConfig) -> RuleNamespaceResource {
    tracing::debug!(
        client = client.client_name(),
        backend = %config.backend,
        hashed_state = config.store_rules_sha256,
        "rule namespace resource configured"
    );
    RuleNamespaceResource::new(client, ResourceSettings::from_config(config))
}
