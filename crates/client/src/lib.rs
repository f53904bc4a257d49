//! Clients for the Loki/Mimir ruler API.
//!
//! This crate provides:
//! - `RulerClient` trait the reconciler drives
//! - HTTP implementation with tenant header, basic/bearer auth and TLS
//! - In-memory ruler with call recording and failure injection

pub mod http;
pub mod memory;
pub mod traits;

pub use http::HttpRulerClient;
pub use memory::{Call, MemoryRuler, Operation};
pub use traits::{ClientError, NamespaceGroups, RulerClient};
