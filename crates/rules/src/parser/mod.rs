//! Strict YAML parser for rule namespace documents.
//!
//! Exactly one document per input. Documents are first loaded as generic
//! [`serde_yaml::Value`] trees so empty documents and document counts can be
//! checked before the typed pass, which rejects unknown fields.

mod error;
mod fuzzy;


use serde::Deserialize;
use serde_yaml::Value;

use crate::schema::{RuleGroup, RuleNamespace};

pub use self::error::ParseError;

/// Result alias for parser operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse YAML text holding exactly one namespace document.
///
/// Groups and rules keep their source order.
pub fn parse(text: &str) -> Result<RuleNamespace> {
    let document = single_document(text)?;
    Ok(serde_yaml::from_value(document)?)
}

/// Like [`parse`], but also accepts a bare sequence of groups.
///
/// Older stored state values hold only the group list, so comparisons
/// against state go through this entry point.
pub fn parse_groups(text: &str) -> Result<RuleNamespace> {
    let document = single_document(text)?;
    if document.is_sequence() {
        let groups: Vec<RuleGroup> = serde_yaml::from_value(document)?;
        return Ok(RuleNamespace::new(groups));
    }
    Ok(serde_yaml::from_value(document)?)
}

/// Load every document in `text` and insist there is exactly one non-empty one.
fn single_document(text: &str) -> Result<Value> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        // A bare `---` or comment-only document carries nothing.
        if !value.is_null() {
            documents.push(value);
        }
    }

    match documents.len() {
        0 => Err(ParseError::NoNamespace),
        1 => Ok(documents.remove(0)),
        n => {
            tracing::debug!(documents = n, "rejecting multi-document namespace definition");
            Err(ParseError::MultipleNamespaces)
        }
    }
}
