//! Rule namespace model with serde (de)serialization.
//!
//! Defines the type hierarchy of a namespace document:
//! - `RuleNamespace`: optional namespace name plus its rule groups
//! - `RuleGroup`: named group of rules with optional interval and remote-write targets
//! - `Rule`: alerting or recording rule, a closed sum type
//! - `PromDuration`: Prometheus-style duration (`5m`, `1h30m`)
//!
//! All structs reject unknown fields so typos surface at parse time.

mod duration;
mod namespace;
mod rule;

pub use duration::*;
pub use namespace::*;
pub use rule::*;
