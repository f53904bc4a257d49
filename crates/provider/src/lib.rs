//! Rule namespace resource provider for Loki/Mimir rulers.
//!
//! This crate provides:
//! - Reconciler that upserts desired groups and prunes stale ones
//! - `rule_namespace` resource lifecycle (create, read, update, delete)
//! - State formatting and diff suppression for `config_yaml`
//! - Provider configuration wiring the HTTP ruler client

pub mod provider;
pub mod reconcile;
pub mod resource;

pub use provider::{configure, with_client, USER_AGENT};
pub use reconcile::{ReconcileError, ReconcileReport, Step};
pub use resource::{resource_id, ResourceData, ResourceSettings, RuleNamespaceResource};
