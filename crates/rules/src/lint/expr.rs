//! Expression linters.

use ruler_core::Backend;

/// Checks one rule expression against a backend dialect.
///
/// Returns the expression in normalized form, or a message describing why it
/// is invalid. Implementations must be deterministic: the normalized text
/// feeds canonical serialization.
pub trait ExpressionLinter: Send + Sync {
    fn lint(&self, expr: &str, backend: Backend) -> Result<String, String>;
}

/// Dialect-aware structural checks without a full query parser.
///
/// Rejects empty expressions, unbalanced brackets and unterminated string
/// literals. LogQL expressions need a stream selector; PromQL expressions may
/// not use log pipeline filters. Normalization trims the expression and
/// collapses whitespace runs outside string literals to one space.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralLinter;

impl ExpressionLinter for StructuralLinter {
    fn lint(&self, expr: &str, backend: Backend) -> Result<String, String> {
        let scan = scan(expr)?;

        match backend {
            Backend::Loki => {
                if !scan.has_selector && !scan.normalized.starts_with("vector(") {
                    return Err(format!(
                        "LogQL expression must contain a stream selector: '{}'",
                        scan.normalized
                    ));
                }
            }
            Backend::Mimir => {
                if let Some(op) = scan.line_filter {
                    return Err(format!(
                        "log line filter '{}' is not valid PromQL: '{}'",
                        op, scan.normalized
                    ));
                }
            }
        }

        Ok(scan.normalized)
    }
}

struct Scan {
    normalized: String,
    has_selector: bool,
    line_filter: Option<&'static str>,
}

fn scan(expr: &str) -> Result<Scan, String> {
    let mut normalized = String::with_capacity(expr.len());
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;
    let mut has_selector = false;
    let mut line_filter = None;
    let mut prev: Option<char> = None;

    for ch in expr.chars() {
        if let Some(q) = quote {
            normalized.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' && q != '`' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            prev = Some(ch);
            continue;
        }

        if ch.is_whitespace() {
            pending_space = !normalized.is_empty();
            continue;
        }
        if pending_space {
            normalized.push(' ');
            pending_space = false;
        }

        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' | '[' | '{' => {
                if ch == '{' {
                    has_selector = true;
                }
                stack.push(ch);
            }
            ')' | ']' | '}' => {
                let open = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(open) {
                    return Err(format!("unexpected '{}' in expression: '{}'", ch, expr.trim()));
                }
            }
            '=' | '~' if prev == Some('|') => {
                line_filter = Some(if ch == '=' { "|=" } else { "|~" });
            }
            _ => {}
        }
        normalized.push(ch);
        prev = Some(ch);
    }

    if normalized.is_empty() {
        return Err("expression must not be empty".to_string());
    }
    if let Some(q) = quote {
        return Err(format!("unterminated {} string literal in expression: '{}'", q, normalized));
    }
    if let Some(open) = stack.pop() {
        return Err(format!("unclosed '{}' in expression: '{}'", open, normalized));
    }

    Ok(Scan {
        normalized,
        has_selector,
        line_filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lint(expr: &str, backend: Backend) -> Result<String, String> {
        StructuralLinter.lint(expr, backend)
    }

    #[test]
    fn collapses_whitespace_outside_strings() {
        let expr = "  sum(rate({app=\"api\"}  |=  \"a  b\" [1m]))\n  > 0.1 ";
        assert_eq!(
            lint(expr, Backend::Loki).unwrap(),
            "sum(rate({app=\"api\"} |= \"a  b\" [1m])) > 0.1"
        );
    }

    #[test]
    fn normalized_text_is_stable() {
        let once = lint("sum by (job) (up)\n", Backend::Mimir).unwrap();
        assert_eq!(lint(&once, Backend::Mimir).unwrap(), once);
    }

    #[test]
    fn rejects_unbalanced_brackets() {
        assert!(lint("sum(rate(x[1m])", Backend::Mimir).unwrap_err().contains("unclosed '('"));
        assert!(lint("sum(x))", Backend::Mimir).unwrap_err().contains("unexpected ')'"));
        assert!(lint("x[1m)", Backend::Mimir).is_err());
    }

    #[test]
    fn brackets_inside_strings_are_ignored() {
        assert!(lint("{app=\"(\"} |= \"]\"", Backend::Loki).is_ok());
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(lint("{app=\"api}", Backend::Loki).unwrap_err().contains("unterminated"));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(lint("  \n", Backend::Loki).unwrap_err(), "expression must not be empty");
    }

    #[test]
    fn logql_needs_stream_selector() {
        assert!(lint("sum(rate(errors_total[5m]))", Backend::Loki).is_err());
        assert!(lint("vector(1)", Backend::Loki).is_ok());
        assert!(lint("count_over_time({job=\"a\"}[5m])", Backend::Loki).is_ok());
    }

    #[test]
    fn promql_rejects_line_filters() {
        assert!(lint("sum(rate(errors_total[5m]))", Backend::Mimir).is_ok());
        let err = lint("count_over_time({job=\"a\"} |= \"x\" [5m])", Backend::Mimir).unwrap_err();
        assert!(err.contains("'|='"));
    }
}
