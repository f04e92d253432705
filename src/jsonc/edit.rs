use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use thiserror::Error;

use super::parser::{parse_tree, Node, NodeKind, ParseOptions};
use super::scanner::{Scanner, SyntaxKind};

/// How inserted values are laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingOptions {
    pub tab_size: usize,
    pub insert_spaces: bool,
    /// Line ending for inserted text; `None` follows the document.
    pub eol: Option<String>,
}

impl FormattingOptions {
    pub fn indent_unit(&self) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_size)
        } else {
            "\t".into()
        }
    }
}

/// Replace `length` bytes at `offset` with `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub offset: usize,
    pub length: usize,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("cannot set member '{segment}' inside a {kind:?} value")]
    NotAnObject { segment: String, kind: NodeKind },
    #[error("member '{0}' has no value to replace")]
    MissingValue(String),
    #[error("object starting at offset {0} is not closed")]
    Unclosed(usize),
    #[error("failed to render value: {0}")]
    Render(#[from] serde_json::Error),
}

/// Compute the edits that set `value` at `path` (a chain of object member
/// names) in `text`, leaving everything outside the touched region as is.
///
/// Missing intermediate members are created as nested objects. An existing
/// member has its value replaced. A document without a usable root value is
/// replaced as a whole.
pub fn modify(
    text: &str,
    path: &[&str],
    value: &Value,
    options: &FormattingOptions,
) -> Result<Vec<Edit>, EditError> {
    let tree = parse_tree(text, ParseOptions::default());
    let layout = Layout {
        text,
        unit: options.indent_unit(),
        eol: options
            .eol
            .clone()
            .unwrap_or_else(|| detect_eol(text).to_string()),
    };

    let Some(mut node) = tree.root.as_ref() else {
        let content = layout.render(&nest(path, value), "")?;
        return Ok(vec![Edit {
            offset: 0,
            length: text.len(),
            content,
        }]);
    };

    for (i, segment) in path.iter().enumerate() {
        if node.kind != NodeKind::Object {
            return Err(EditError::NotAnObject {
                segment: segment.to_string(),
                kind: node.kind,
            });
        }
        let Some(prop) = node.find_property(segment) else {
            return layout.insert_property(node, segment, &nest(&path[i + 1..], value));
        };
        node = prop
            .property_value()
            .ok_or_else(|| EditError::MissingValue(segment.to_string()))?;
    }

    let indent = line_indent(text, node.offset);
    Ok(vec![Edit {
        offset: node.offset,
        length: node.length,
        content: layout.render(value, indent)?,
    }])
}

/// Apply non-overlapping edits to `text`.
///
/// # Panics
///
/// Panics if an edit falls outside `text` or splits a UTF-8 character.
pub fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut sorted: Vec<&Edit> = edits.iter().collect();
    sorted.sort_by_key(|e| e.offset);

    let mut out = text.to_string();
    let mut limit = text.len();
    for edit in sorted.into_iter().rev() {
        let end = edit.offset + edit.length;
        debug_assert!(end <= limit, "overlapping edits at offset {}", edit.offset);
        out.replace_range(edit.offset..end, &edit.content);
        limit = edit.offset;
    }
    out
}

fn nest(path: &[&str], value: &Value) -> Value {
    path.iter().rev().fold(value.clone(), |inner, segment| {
        let mut map = serde_json::Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

fn detect_eol(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Leading whitespace of the line containing `offset`.
fn line_indent(text: &str, offset: usize) -> &str {
    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[start..offset];
    let width = line.len() - line.trim_start_matches(&[' ', '\t'][..]).len();
    &line[..width]
}

struct Layout<'a> {
    text: &'a str,
    unit: String,
    eol: String,
}

impl Layout<'_> {
    /// Pretty-print `value` so that continuation lines sit under `indent`.
    fn render(&self, value: &Value, indent: &str) -> Result<String, EditError> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(self.unit.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value.serialize(&mut ser)?;
        let pretty = String::from_utf8_lossy(&buf);
        Ok(pretty
            .split('\n')
            .collect::<Vec<_>>()
            .join(&format!("{}{indent}", self.eol)))
    }

    fn insert_property(
        &self,
        object: &Node,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Edit>, EditError> {
        let close = object.end().saturating_sub(1);
        if close <= object.offset || self.text.as_bytes().get(close) != Some(&b'}') {
            return Err(EditError::Unclosed(object.offset));
        }
        let key = serde_json::to_string(key)?;

        let Some(last) = object.children.last() else {
            // Empty object: the member gets its own line, after any comments
            // already between the braces.
            let object_indent = line_indent(self.text, object.offset);
            let member_indent = format!("{object_indent}{}", self.unit);
            let inner = &self.text[object.offset + 1..close];
            let kept = inner.trim_end_matches(&[' ', '\t', '\r', '\n'][..]);
            let start = object.offset + 1 + kept.len();
            let content = format!(
                "{eol}{member_indent}{key}: {value}{eol}{object_indent}",
                eol = self.eol,
                value = self.render(value, &member_indent)?,
            );
            return Ok(vec![Edit {
                offset: start,
                length: close - start,
                content,
            }]);
        };

        let comma_end = self.trailing_comma(last.end());

        if !self.text[object.offset..last.offset].contains('\n') {
            let member = format!("{key}: {}", serde_json::to_string(value)?);
            return Ok(vec![match comma_end {
                Some(at) => Edit {
                    offset: at,
                    length: 0,
                    content: format!(" {member},"),
                },
                None => Edit {
                    offset: last.end(),
                    length: 0,
                    content: format!(", {member}"),
                },
            }]);
        }

        let member_indent = line_indent(self.text, last.offset);
        let member = format!(
            "{eol}{member_indent}{key}: {value}",
            eol = self.eol,
            value = self.render(value, member_indent)?,
        );
        let insert_at = self.same_line_comments_end(comma_end.unwrap_or(last.end()));

        Ok(match comma_end {
            Some(_) => vec![Edit {
                offset: insert_at,
                length: 0,
                content: format!("{member},"),
            }],
            None if insert_at == last.end() => vec![Edit {
                offset: insert_at,
                length: 0,
                content: format!(",{member}"),
            }],
            None => vec![
                Edit {
                    offset: last.end(),
                    length: 0,
                    content: ",".into(),
                },
                Edit {
                    offset: insert_at,
                    length: 0,
                    content: member,
                },
            ],
        })
    }

    /// End of the comma following `from`, if the next token is one.
    fn trailing_comma(&self, from: usize) -> Option<usize> {
        let mut scanner = Scanner::new(self.text);
        scanner.set_position(from);
        loop {
            match scanner.scan() {
                SyntaxKind::Trivia
                | SyntaxKind::LineBreak
                | SyntaxKind::LineComment
                | SyntaxKind::BlockComment => {}
                SyntaxKind::Comma => return Some(scanner.token_end()),
                _ => return None,
            }
        }
    }

    /// End of the comments starting on the same line as `from`, so they
    /// stay attached to the member they annotate. A block comment counts
    /// even when it runs onto later lines.
    fn same_line_comments_end(&self, from: usize) -> usize {
        let mut scanner = Scanner::new(self.text);
        scanner.set_position(from);
        let mut end = from;
        loop {
            match scanner.scan() {
                SyntaxKind::Trivia => {}
                SyntaxKind::LineComment | SyntaxKind::BlockComment => end = scanner.token_end(),
                _ => return end,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tabs() -> FormattingOptions {
        FormattingOptions {
            tab_size: 2,
            insert_spaces: false,
            eol: None,
        }
    }

    fn set(text: &str, path: &[&str], value: Value) -> String {
        let edits = modify(text, path, &value, &tabs()).unwrap();
        apply_edits(text, &edits)
    }

    #[test]
    fn test_insert_into_empty_object() {
        let out = set(
            "{}",
            &["loop"],
            json!({
                "prefix": "loop",
                "body": ["for i in range(10):", "\tpass"],
                "description": "loop description"
            }),
        );
        assert_eq!(
            out,
            "{\n\t\"loop\": {\n\t\t\"prefix\": \"loop\",\n\t\t\"body\": [\n\t\t\t\"for i in range(10):\",\n\t\t\t\"\\tpass\"\n\t\t],\n\t\t\"description\": \"loop description\"\n\t}\n}"
        );
    }

    #[test]
    fn test_insert_keeps_comments_in_empty_object() {
        assert_eq!(set("{ // none\n}", &["k"], json!(1)), "{ // none\n\t\"k\": 1\n}");
    }

    #[test]
    fn test_insert_after_last_member_keeps_trailing_comment() {
        let text = "{\n\t// greeting\n\t\"hello\": {\n\t\t\"prefix\": \"hi\",\n\t\t\"body\": \"Hello\"\n\t} // keep me\n}";
        let edits = modify(text, &["bye"], &json!({ "prefix": "bye" }), &tabs()).unwrap();
        assert_eq!(edits.len(), 2);
        assert_eq!(
            apply_edits(text, &edits),
            "{\n\t// greeting\n\t\"hello\": {\n\t\t\"prefix\": \"hi\",\n\t\t\"body\": \"Hello\"\n\t}, // keep me\n\t\"bye\": {\n\t\t\"prefix\": \"bye\"\n\t}\n}"
        );
    }

    #[test]
    fn test_insert_after_multiline_block_comment() {
        assert_eq!(
            set("{\n\t\"a\": 1 /* x\n y */\n}", &["b"], json!(2)),
            "{\n\t\"a\": 1, /* x\n y */\n\t\"b\": 2\n}"
        );
    }

    #[test]
    fn test_insert_keeps_trailing_comma_style() {
        assert_eq!(
            set("{\n  \"a\": 1,\n}", &["b"], json!(2)),
            "{\n  \"a\": 1,\n  \"b\": 2,\n}"
        );
    }

    #[test]
    fn test_insert_single_line_object() {
        assert_eq!(set(r#"{"a": 1}"#, &["b"], json!(2)), r#"{"a": 1, "b": 2}"#);
        assert_eq!(set(r#"{"a": 1,}"#, &["b"], json!(2)), r#"{"a": 1, "b": 2,}"#);
    }

    #[test]
    fn test_insert_follows_crlf() {
        assert_eq!(
            set("{\r\n\t\"a\": 1\r\n}", &["b"], json!([1, 2])),
            "{\r\n\t\"a\": 1,\r\n\t\"b\": [\r\n\t\t1,\r\n\t\t2\r\n\t]\r\n}"
        );
    }

    #[test]
    fn test_insert_with_spaces() {
        let options = FormattingOptions {
            tab_size: 2,
            insert_spaces: true,
            eol: None,
        };
        let edits = modify("{}", &["a"], &json!({ "b": 1 }), &options).unwrap();
        assert_eq!(apply_edits("{}", &edits), "{\n  \"a\": {\n    \"b\": 1\n  }\n}");
    }

    #[test]
    fn test_replace_existing_value() {
        assert_eq!(
            set(r#"{"a": {"x": 1}, "b": true}"#, &["a", "x"], json!(2)),
            r#"{"a": {"x": 2}, "b": true}"#
        );
    }

    #[test]
    fn test_creates_missing_parents() {
        assert_eq!(
            set("{\n\t\"a\": {}\n}", &["a", "b", "c"], json!(1)),
            "{\n\t\"a\": {\n\t\t\"b\": {\n\t\t\t\"c\": 1\n\t\t}\n\t}\n}"
        );
    }

    #[test]
    fn test_non_object_parent_is_rejected() {
        let err = modify("[1, 2]", &["a"], &json!(1), &tabs()).unwrap_err();
        assert!(matches!(err, EditError::NotAnObject { kind: NodeKind::Array, .. }));
    }

    #[test]
    fn test_missing_root_replaces_document() {
        assert_eq!(set("", &["a"], json!("x")), "{\n\t\"a\": \"x\"\n}");
    }

    #[test]
    fn test_apply_edits_orders_by_offset() {
        let edits = vec![
            Edit {
                offset: 3,
                length: 1,
                content: "D".into(),
            },
            Edit {
                offset: 0,
                length: 0,
                content: ">".into(),
            },
        ];
        assert_eq!(apply_edits("abcd", &edits), ">abcD");
    }
}
