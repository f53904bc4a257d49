//! Block-style YAML emitter used for canonical output.
//!
//! Nested blocks are indented to the next multiple of four columns and a
//! mapping inside a sequence item starts on the dash line, two columns right
//! of the dash. Scalar quoting comes from `serde_yaml`; anything it would
//! wrap over several lines, or emit with an explicit indentation or keep
//! indicator, is written as a JSON string, which YAML reads back unchanged.

use serde_yaml::{Mapping, Value};

const INDENT: usize = 4;

fn next_indent(column: usize) -> usize {
    INDENT * ((column + INDENT) / INDENT)
}

/// Emit `document` as block YAML, terminated by a single newline.
pub(super) fn emit(document: &Value) -> String {
    let mut emitter = Emitter::default();
    match document {
        Value::Mapping(map) if !map.is_empty() => emitter.mapping(map, 0),
        Value::Sequence(seq) if !seq.is_empty() => emitter.sequence(seq, 0),
        other => {
            emitter.start(0);
            emitter.buf.push_str(&inline(other));
            emitter.end();
        }
    }
    emitter.buf
}

#[derive(Default)]
struct Emitter {
    buf: String,
    /// A `- ` was just written; the next entry continues on that line.
    after_dash: bool,
}

impl Emitter {
    fn start(&mut self, indent: usize) {
        if self.after_dash {
            self.after_dash = false;
        } else {
            self.buf.extend(std::iter::repeat(' ').take(indent));
        }
    }

    fn end(&mut self) {
        self.buf.push('\n');
    }

    fn block_body(&mut self, indent: usize, body: &[String]) {
        for line in body {
            if !line.is_empty() {
                self.buf.extend(std::iter::repeat(' ').take(indent));
                self.buf.push_str(line);
            }
            self.end();
        }
    }

    fn mapping(&mut self, map: &Mapping, indent: usize) {
        for (key, value) in map {
            self.start(indent);
            self.buf.push_str(&key_text(key));
            self.buf.push(':');
            self.value(value, indent);
        }
    }

    fn sequence(&mut self, seq: &[Value], indent: usize) {
        for item in seq {
            self.start(indent);
            self.buf.push('-');
            match item {
                Value::Mapping(map) if !map.is_empty() => {
                    self.buf.push(' ');
                    self.after_dash = true;
                    self.mapping(map, indent + 2);
                }
                other => self.value(other, indent),
            }
        }
    }

    /// Write whatever follows `key:` or `-` at `indent`, ending the line.
    fn value(&mut self, value: &Value, indent: usize) {
        match value {
            Value::Mapping(map) if !map.is_empty() => {
                self.end();
                self.mapping(map, next_indent(indent));
            }
            Value::Sequence(seq) if !seq.is_empty() => {
                self.end();
                self.sequence(seq, next_indent(indent));
            }
            Value::String(s) => match format_str(s) {
                Scalar::Inline(text) => {
                    self.buf.push(' ');
                    self.buf.push_str(&text);
                    self.end();
                }
                Scalar::Block { header, body } => {
                    self.buf.push(' ');
                    self.buf.push_str(&header);
                    self.end();
                    self.block_body(next_indent(indent), &body);
                }
            },
            other => {
                self.buf.push(' ');
                self.buf.push_str(&inline(other));
                self.end();
            }
        }
    }
}

enum Scalar {
    Inline(String),
    Block { header: String, body: Vec<String> },
}

fn format_str(s: &str) -> Scalar {
    let Ok(rendered) = serde_yaml::to_string(s) else {
        return Scalar::Inline(json_quote(s));
    };
    let rendered = rendered.strip_suffix('\n').unwrap_or(&rendered);
    let rendered = rendered.strip_prefix("--- ").unwrap_or(rendered);

    let mut lines = rendered.split('\n');
    let header = lines.next().unwrap_or_default();

    if header.starts_with('|') || header.starts_with('>') {
        let plain_header = header[1..].chars().all(|c| c == '-');
        if !plain_header {
            return Scalar::Inline(json_quote(s));
        }
        let body = lines
            .map(|line| line.strip_prefix("  ").unwrap_or(line).to_string())
            .collect();
        return Scalar::Block {
            header: header.to_string(),
            body,
        };
    }

    if rendered.contains('\n') {
        return Scalar::Inline(json_quote(s));
    }
    Scalar::Inline(rendered.to_string())
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => match format_str(s) {
            Scalar::Inline(text) => text,
            Scalar::Block { .. } => json_quote(s),
        },
        other => inline(other),
    }
}

fn inline(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => match format_str(s) {
            Scalar::Inline(text) => text,
            Scalar::Block { .. } => json_quote(s),
        },
        Value::Mapping(map) if map.is_empty() => "{}".to_string(),
        Value::Sequence(seq) if seq.is_empty() => "[]".to_string(),
        // Non-empty collections and tags never appear inline in rule documents.
        other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
    }
}

fn json_quote(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn indent_steps_to_next_multiple_of_four() {
        assert_eq!(next_indent(0), 4);
        assert_eq!(next_indent(6), 8);
        assert_eq!(next_indent(10), 12);
        assert_eq!(next_indent(12), 16);
    }

    #[test]
    fn nested_sequences_of_mappings() {
        let doc = yaml("a:\n  - b: 1\n    c:\n      - d: x\n        e:\n          f: y\n");
        assert_eq!(
            emit(&doc),
            "a:\n    - b: 1\n      c:\n        - d: x\n          e:\n            f: y\n"
        );
    }

    #[test]
    fn empty_collections_are_flow() {
        let doc = yaml("a: []\nb: {}\n");
        assert_eq!(emit(&doc), "a: []\nb: {}\n");
    }

    #[test]
    fn multi_line_strings_round_trip() {
        let mut map = Mapping::new();
        map.insert("text".into(), Value::String("first\n  second\n\nthird".into()));
        map.insert("lead".into(), Value::String("  indented\nnext".into()));
        map.insert("trail".into(), Value::String("kept\n\n".into()));
        let doc = Value::Mapping(map);

        let out = emit(&doc);
        assert_eq!(yaml(&out), doc, "{}", out);
        assert_eq!(emit(&yaml(&out)), out);
    }

    #[test]
    fn awkward_scalars_round_trip() {
        let long = "x".repeat(40) + " " + &"y".repeat(60);
        let mut map = Mapping::new();
        for value in ["", "true", "1.5", "- dash", "a: b", "# hash", "~", long.as_str()] {
            map.insert(Value::String(format!("k{}", map.len())), Value::String(value.into()));
        }
        let doc = Value::Mapping(map);
        let out = emit(&doc);
        assert_eq!(yaml(&out), doc, "{}", out);
    }
}
