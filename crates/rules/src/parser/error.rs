//! Parse failures for namespace documents.

use super::fuzzy::closest_field;

/// Every field name the namespace document accepts, at any depth. Used when
/// serde does not say which fields were expected.
const KNOWN_FIELDS: &[&str] = &[
    "namespace",
    "groups",
    "name",
    "interval",
    "rules",
    "remote_write",
    "url",
    "alert",
    "record",
    "expr",
    "for",
    "labels",
    "annotations",
];

/// Errors that can occur while turning YAML text into a [`crate::schema::RuleNamespace`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Input held no YAML document at all.
    #[error("no namespace definition found")]
    NoNamespace,

    /// Input held more than one YAML document.
    #[error("namespace definition contains more than one namespace which is not supported")]
    MultipleNamespaces,

    /// A mapping carried a key the model does not know.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Any other YAML syntax or structure problem.
    #[error("malformed namespace definition: {0}")]
    Malformed(String),
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        let message = err.to_string();
        match unknown_field_name(&message) {
            Some(field) => match suggestion_for(field, &message) {
                Some(suggestion) => {
                    ParseError::UnknownField(format!("{} (did you mean '{}'?)", message, suggestion))
                }
                None => ParseError::UnknownField(message),
            },
            None => ParseError::Malformed(message),
        }
    }
}

fn suggestion_for<'a>(field: &str, message: &'a str) -> Option<&'a str> {
    let expected = expected_fields(message);
    if expected.is_empty() {
        closest_field(field, KNOWN_FIELDS)
    } else {
        closest_field(field, &expected)
    }
}

/// Fields serde lists as valid where the unknown one appeared:
/// "..., expected one of `a`, `b`" or "..., expected `a` or `b`".
fn expected_fields(message: &str) -> Vec<&str> {
    let Some(at) = message.find(", expected ") else {
        return Vec::new();
    };
    message[at..].split('`').skip(1).step_by(2).collect()
}

/// Pull the offending key out of serde's "unknown field `x`, expected ..." message.
fn unknown_field_name(message: &str) -> Option<&str> {
    let start = message.find("unknown field `")? + "unknown field `".len();
    let len = message[start..].find('`')?;
    Some(&message[start..start + len])
}
