//! Canonical ordering and serialization of namespaces.
//!
//! The remote ruler does not preserve authoring order, so canonical form is
//! the only reliable basis for comparison: groups sorted by name, rules sorted
//! by expression, emitted by a fixed block-style writer. Canonical text is
//! stable under re-canonicalization.

mod emit;


use serde::Serialize;
use sha2::{Digest, Sha256};

use ruler_core::StateFormat;

use crate::schema::{RuleGroup, RuleNamespace};

/// The serialized shape of canonical output. The namespace name is left out:
/// the resource attribute carries it, and listed groups never include it.
#[derive(Serialize)]
struct CanonicalDocument<'a> {
    groups: &'a [RuleGroup],
}

/// Sort groups by name and each group's rules by expression, in place.
///
/// Ties fall back to rule name and then full content, so the order is total.
pub fn sort(namespace: &mut RuleNamespace) {
    for group in &mut namespace.groups {
        group.rules.sort_by(|a, b| {
            a.expr()
                .cmp(b.expr())
                .then_with(|| a.name().cmp(b.name()))
                .then_with(|| a.cmp(b))
        });
        group.remote_write.sort();
    }
    namespace
        .groups
        .sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.cmp(b)));
}

/// Sorted copy of `namespace`.
pub fn sorted(namespace: &RuleNamespace) -> RuleNamespace {
    let mut copy = namespace.clone();
    sort(&mut copy);
    copy
}

/// Canonical YAML text of `namespace`.
pub fn canonicalize(namespace: &RuleNamespace) -> String {
    let sorted = sorted(namespace);
    let document = CanonicalDocument {
        groups: &sorted.groups,
    };
    match serde_yaml::to_value(&document) {
        Ok(value) => emit::emit(&value),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize rule groups");
            String::new()
        }
    }
}

/// Lowercase hex SHA-256 of the canonical YAML bytes.
pub fn canonicalize_hash(namespace: &RuleNamespace) -> String {
    sha256_hex(canonicalize(namespace).as_bytes())
}

/// Canonical form in the requested storage format.
pub fn render(namespace: &RuleNamespace, format: StateFormat) -> String {
    match format {
        StateFormat::Yaml => canonicalize(namespace),
        StateFormat::Sha256 => canonicalize_hash(namespace),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
