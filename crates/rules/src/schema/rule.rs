//! Alerting and recording rules.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::PromDuration;

/// A single ruler rule. Exactly one kind per rule; the YAML form tells them
/// apart by whether `alert` or `record` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "RuleNode", into = "RuleNode")]
pub enum Rule {
    Alert(AlertRule),
    Record(RecordRule),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AlertRule {
    pub alert: String,
    pub expr: String,
    /// How long the condition must hold before the alert fires.
    pub for_duration: Option<PromDuration>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordRule {
    pub record: String,
    pub expr: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Alert,
    Record,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Alert => write!(f, "alert"),
            RuleKind::Record => write!(f, "record"),
        }
    }
}

impl AlertRule {
    pub fn new(alert: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            alert: alert.into(),
            expr: expr.into(),
            for_duration: None,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_for(mut self, duration: PromDuration) -> Self {
        self.for_duration = Some(duration);
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(name.into(), value.into());
        self
    }
}

impl RecordRule {
    pub fn new(record: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            expr: expr.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Alert(_) => RuleKind::Alert,
            Rule::Record(_) => RuleKind::Record,
        }
    }

    /// The alert name or the recorded series name.
    pub fn name(&self) -> &str {
        match self {
            Rule::Alert(rule) => &rule.alert,
            Rule::Record(rule) => &rule.record,
        }
    }

    pub fn expr(&self) -> &str {
        match self {
            Rule::Alert(rule) => &rule.expr,
            Rule::Record(rule) => &rule.expr,
        }
    }

    pub fn expr_mut(&mut self) -> &mut String {
        match self {
            Rule::Alert(rule) => &mut rule.expr,
            Rule::Record(rule) => &mut rule.expr,
        }
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        match self {
            Rule::Alert(rule) => &rule.labels,
            Rule::Record(rule) => &rule.labels,
        }
    }

    /// Annotations; recording rules never carry any.
    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Rule::Alert(rule) => Some(&rule.annotations),
            Rule::Record(_) => None,
        }
    }

    pub fn as_alert(&self) -> Option<&AlertRule> {
        match self {
            Rule::Alert(rule) => Some(rule),
            Rule::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordRule> {
        match self {
            Rule::Record(rule) => Some(rule),
            Rule::Alert(_) => None,
        }
    }
}

impl From<AlertRule> for Rule {
    fn from(rule: AlertRule) -> Self {
        Rule::Alert(rule)
    }
}

impl From<RecordRule> for Rule {
    fn from(rule: RecordRule) -> Self {
        Rule::Record(rule)
    }
}

// ── Wire form ───────────────────────────────────────────────────────

/// A rule exactly as it appears in YAML, before the alert/record split.
///
/// Field order here is the serialization order of canonical output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub expr: Option<String>,
    #[serde(default, rename = "for", skip_serializing_if = "Option::is_none")]
    pub for_duration: Option<PromDuration>,
    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub labels: BTreeMap<String, String>,
    #[serde(
        default,
        deserialize_with = "scalar::string_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub annotations: BTreeMap<String, String>,
}

impl TryFrom<RuleNode> for Rule {
    type Error = String;

    fn try_from(node: RuleNode) -> std::result::Result<Self, Self::Error> {
        let expr = node
            .expr
            .ok_or_else(|| "field 'expr' must be set in rule".to_string())?;

        match (node.alert, node.record) {
            (Some(alert), Some(record)) => Err(format!(
                "only one of 'record' and 'alert' must be set, got alert '{}' and record '{}'",
                alert, record
            )),
            (None, None) => Err("one of 'record' or 'alert' must be set".to_string()),
            (Some(alert), None) => Ok(Rule::Alert(AlertRule {
                alert,
                expr,
                for_duration: node.for_duration,
                labels: node.labels,
                annotations: node.annotations,
            })),
            (None, Some(record)) => {
                if node.for_duration.is_some() {
                    return Err(format!("invalid field 'for' in recording rule '{}'", record));
                }
                if !node.annotations.is_empty() {
                    return Err(format!(
                        "invalid field 'annotations' in recording rule '{}'",
                        record
                    ));
                }
                Ok(Rule::Record(RecordRule {
                    record,
                    expr,
                    labels: node.labels,
                }))
            }
        }
    }
}

impl From<Rule> for RuleNode {
    fn from(rule: Rule) -> Self {
        match rule {
            Rule::Alert(rule) => RuleNode {
                alert: Some(rule.alert),
                expr: Some(rule.expr),
                for_duration: rule.for_duration,
                labels: rule.labels,
                annotations: rule.annotations,
                ..RuleNode::default()
            },
            Rule::Record(rule) => RuleNode {
                record: Some(rule.record),
                expr: Some(rule.expr),
                labels: rule.labels,
                ..RuleNode::default()
            },
        }
    }
}

/// Scalar coercion matching how rulers read YAML: `severity: 1` is the label value `"1"`.
mod scalar {
    use std::collections::BTreeMap;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_yaml::Value;

    fn to_string<E: Error>(field: &str, value: Value) -> std::result::Result<String, E> {
        match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok(String::new()),
            _ => Err(E::custom(format!("'{}' must be a scalar value", field))),
        }
    }

    pub(super) fn optional_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => to_string("expr", value).map(Some),
        }
    }

    pub(super) fn string_map<'de, D>(
        deserializer: D,
    ) -> std::result::Result<BTreeMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
        raw.into_iter()
            .map(|(key, value)| {
                let value = to_string(&key, value)?;
                Ok((key, value))
            })
            .collect()
    }
}
