//! Rule namespace documents for Loki/Mimir rulers.
//!
//! This crate provides:
//! - Typed namespace/group/rule model with serde (de)serialization
//! - Strict single-document YAML parser
//! - Expression linting and structural validation per backend dialect
//! - Canonical ordering and serialization (YAML or SHA-256)
//! - Order-insensitive namespace comparison for diff suppression

pub mod canonical;
pub mod diff;
pub mod lint;
pub mod parser;
pub mod schema;

pub use canonical::{canonicalize, canonicalize_hash, render, sha256_hex};
pub use diff::{compare, equivalent, equivalent_yaml, ChangeState, GroupChange, NamespaceChange};
pub use lint::{
    check_recording_rules, validate, ExpressionLinter, LintSummary, RecordingRuleReport,
    StructuralLinter, ValidationError, Validator,
};
pub use parser::{parse, parse_groups, ParseError};
pub use ruler_core::{Backend, StateFormat};
pub use schema::*;
