//! HTTP client for the Loki/Mimir ruler configuration API.
//!
//! Groups are written as YAML with `POST {routes}/{namespace}`, removed with
//! `DELETE {routes}/{namespace}/{group}` and listed with
//! `GET {routes}/{namespace}`. A 404 from any of them is
//! [`ClientError::NotFound`].

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::{Response, StatusCode};
use serde_yaml::Value;
use url::Url;

use ruler_core::ProviderConfig;
use ruler_rules::RuleGroup;

use crate::traits::{ClientError, NamespaceGroups, RulerClient};

const LEGACY_ROUTES: &str = "/api/prom/rules";

/// Fields the ruler may return that this model does not track.
const GROUP_FIELDS: &[&str] = &["name", "interval", "rules", "remote_write"];
const RULE_FIELDS: &[&str] = &["record", "alert", "expr", "for", "labels", "annotations"];

#[derive(Debug, Clone)]
enum Auth {
    None,
    Basic { user: String, key: Option<String> },
    Bearer(String),
}

/// Talks to a ruler over HTTP(S).
#[derive(Debug)]
pub struct HttpRulerClient {
    client: reqwest::Client,
    base: Url,
    /// Path of the rules API below `base`, e.g. `/api/prom/rules`.
    routes: String,
    tenant_id: Option<String>,
    auth: Auth,
}

impl HttpRulerClient {
    /// Build a client from provider settings.
    ///
    /// TLS files are read here, so a missing CA or client certificate is a
    /// configuration error rather than a failure on first request.
    pub fn from_config(config: &ProviderConfig, user_agent: &str) -> Result<Self, ClientError> {
        let address = config
            .require_address()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let base = Url::parse(address)
            .map_err(|e| ClientError::Config(format!("invalid address '{}': {}", address, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Config(format!("address '{}' cannot be a base URL", address)));
        }

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(config.tls.insecure_skip_verify);

        if let Some(ca_path) = &config.tls.ca_path {
            let pem = read_file(ca_path, "tls_ca_path")?;
            let certificate = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ClientError::Config(format!("invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(certificate);
        }

        if let (Some(cert_path), Some(key_path)) = (&config.tls.cert_path, &config.tls.key_path) {
            let mut pem = read_file(key_path, "tls_key_path")?;
            pem.push(b'\n');
            pem.extend(read_file(cert_path, "tls_cert_path")?);
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| ClientError::Config(format!("invalid client certificate: {}", e)))?;
            builder = builder.identity(identity);
        }

        let auth = match (&config.api_user, &config.api_key) {
            (Some(user), key) => Auth::Basic {
                user: user.clone(),
                key: key.clone(),
            },
            (None, Some(key)) => Auth::Bearer(key.clone()),
            (None, None) => Auth::None,
        };

        let routes = if config.use_legacy_routes {
            LEGACY_ROUTES.to_string()
        } else {
            format!("{}/config/v1/rules", config.prometheus_http_prefix.trim_end_matches('/'))
        };

        tracing::debug!(
            address = %base,
            routes = %routes,
            tenant = config.tenant_id.as_deref().unwrap_or(""),
            "ruler HTTP client configured"
        );

        Ok(Self {
            client: builder.build()?,
            base,
            routes,
            tenant_id: config.tenant_id.clone(),
            auth,
        })
    }

    /// URL of the rules API with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::Config(format!("address '{}' cannot be a base URL", self.base)))?;
            path.pop_if_empty();
            path.extend(self.routes.split('/').filter(|s| !s.is_empty()));
            path.extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, url);
        if let Some(tenant) = &self.tenant_id {
            request = request.header("X-Scope-OrgID", tenant.as_str());
        }
        match &self.auth {
            Auth::None => request,
            Auth::Basic { user, key } => request.basic_auth(user, key.as_ref()),
            Auth::Bearer(token) => request.bearer_auth(token),
        }
    }
}

#[async_trait::async_trait]
impl RulerClient for HttpRulerClient {
    async fn create_rule_group(&self, namespace: &str, group: &RuleGroup) -> Result<(), ClientError> {
        let body = serde_yaml::to_string(group).map_err(|e| ClientError::Encode(e.to_string()))?;
        let url = self.endpoint(&[namespace])?;

        let response = self
            .request(reqwest::Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, "application/yaml")
            .body(body)
            .send()
            .await?;
        check(response).await?;

        tracing::debug!(namespace, group = %group.name, "rule group written");
        Ok(())
    }

    async fn delete_rule_group(&self, namespace: &str, group: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&[namespace, group])?;
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        check(response).await?;

        tracing::debug!(namespace, group, "rule group deleted");
        Ok(())
    }

    async fn list_rules(&self, namespace: &str) -> Result<NamespaceGroups, ClientError> {
        let url = self.endpoint(&[namespace])?;
        let response = self.request(reqwest::Method::GET, url).send().await?;
        let text = check(response).await?.text().await?;
        decode_groups(&text)
    }

    fn client_name(&self) -> &str {
        "http"
    }
}

/// Map 404 to `NotFound` and any other non-2xx status to `Status`.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound);
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        tracing::warn!(%status, body = %body, "ruler returned non-2xx status");
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Decode a `namespace -> [group]` listing, dropping fields this model does not track.
pub(crate) fn decode_groups(text: &str) -> Result<NamespaceGroups, ClientError> {
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let raw: BTreeMap<String, Vec<Value>> =
        serde_yaml::from_str(text).map_err(|e| ClientError::Decode(e.to_string()))?;

    let mut listing = BTreeMap::new();
    for (namespace, groups) in raw {
        let mut decoded = Vec::with_capacity(groups.len());
        for mut group in groups {
            retain_fields(&mut group, GROUP_FIELDS);
            if let Some(Value::Sequence(rules)) = group.get_mut("rules") {
                for rule in rules {
                    retain_fields(rule, RULE_FIELDS);
                }
            }
            let group: RuleGroup =
                serde_yaml::from_value(group).map_err(|e| ClientError::Decode(e.to_string()))?;
            decoded.push(group);
        }
        listing.insert(namespace, decoded);
    }
    Ok(listing)
}

fn retain_fields(value: &mut Value, allowed: &[&str]) {
    if let Value::Mapping(map) = value {
        let untracked: Vec<Value> = map
            .keys()
            .filter(|key| !key.as_str().is_some_and(|k| allowed.contains(&k)))
            .cloned()
            .collect();
        for key in untracked {
            tracing::debug!(field = ?key, "ignoring untracked field in ruler listing");
            map.remove(&key);
        }
    }
}

fn read_file(path: &Path, setting: &str) -> Result<Vec<u8>, ClientError> {
    std::fs::read(path)
        .map_err(|e| ClientError::Config(format!("cannot read {} '{}': {}", setting, path.display(), e)))
}
