use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Snippet ───────────────────────────────────────────────────────────────

/// A snippet to add to the editor's snippet file for `language`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Editor language id, selects the target file
    pub language: String,
    /// Member name inside the target file
    pub name: String,
    /// Trigger text; defaults to the name when empty
    #[serde(default)]
    pub prefix: String,
    pub body: SnippetBody,
    /// Defaults to "<name> description" when empty
    #[serde(default)]
    pub description: String,
}

/// Snippet expansion: one line or a list of lines, as the editor accepts both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnippetBody {
    Line(String),
    Lines(Vec<String>),
}

impl From<Vec<String>> for SnippetBody {
    fn from(mut lines: Vec<String>) -> Self {
        if lines.len() == 1 {
            Self::Line(lines.remove(0))
        } else {
            Self::Lines(lines)
        }
    }
}

/// The value stored under the snippet's name in the snippet file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetEntry {
    pub prefix: String,
    pub body: SnippetBody,
    pub description: String,
}

impl Snippet {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Snippet must have a name");
        }
        if self.language.is_empty() {
            anyhow::bail!("Snippet '{}' must have a language", self.name);
        }
        let bad_file_name = matches!(self.language.as_str(), "." | "..")
            || self.language.contains(&['/', '\\'][..]);
        if bad_file_name {
            anyhow::bail!(
                "Language '{}' of snippet '{}' is not a valid file name",
                self.language,
                self.name
            );
        }
        Ok(())
    }

    /// Same snippet under `<name>_<uuid>`.
    pub fn with_unique_name(self) -> Self {
        Self {
            name: format!("{}_{}", self.name, Uuid::new_v4()),
            ..self
        }
    }

    /// Fill in empty optional fields from the name. The body is left alone.
    pub fn normalized(mut self) -> Self {
        if self.prefix.is_empty() {
            self.prefix = self.name.clone();
        }
        if self.description.is_empty() {
            self.description = format!("{} description", self.name);
        }
        self
    }

    pub fn entry(&self) -> SnippetEntry {
        SnippetEntry {
            prefix: self.prefix.clone(),
            body: self.body.clone(),
            description: self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn greet() -> Snippet {
        Snippet {
            language: "python".into(),
            name: "greet".into(),
            prefix: String::new(),
            body: SnippetBody::Line("print('hi')".into()),
            description: String::new(),
        }
    }

    #[test]
    fn test_normalized_fills_defaults() {
        let s = greet().normalized();
        assert_eq!(s.prefix, "greet");
        assert_eq!(s.description, "greet description");
        assert_eq!(s.body, SnippetBody::Line("print('hi')".into()));
    }

    #[test]
    fn test_normalized_keeps_given_fields() {
        let s = Snippet {
            prefix: "gr".into(),
            description: "Say hi".into(),
            ..greet()
        }
        .normalized();
        assert_eq!(s.prefix, "gr");
        assert_eq!(s.description, "Say hi");
    }

    #[test]
    fn test_unique_name_shape() {
        let s = greet().with_unique_name();
        let suffix = s.name.strip_prefix("greet_").unwrap();
        assert_eq!(suffix.len(), 36);
        let groups: Vec<_> = suffix.split('-').map(str::len).collect();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
        assert!(suffix.chars().all(|c| c == '-' || c.is_ascii_hexdigit()));
        assert_eq!(&suffix[14..15], "4");
        assert!(matches!(&suffix[19..20], "8" | "9" | "a" | "b"));
    }

    #[test]
    fn test_entry_serializes_in_file_order() {
        let entry = Snippet {
            body: vec!["a".to_string(), "b".to_string()].into(),
            ..greet()
        }
        .normalized()
        .entry();
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"prefix":"greet","body":["a","b"],"description":"greet description"}"#
        );
    }

    #[test]
    fn test_body_from_single_line() {
        assert_eq!(
            SnippetBody::from(vec!["x".to_string()]),
            SnippetBody::Line("x".into())
        );
    }

    #[test]
    fn test_deserialize_with_optional_fields_missing() {
        let s: Snippet = serde_json::from_value(json!({
            "language": "go",
            "name": "main",
            "body": ["package main"]
        }))
        .unwrap();
        assert_eq!(s.prefix, "");
        assert_eq!(s.body, SnippetBody::Lines(vec!["package main".into()]));
    }

    #[test]
    fn test_validate() {
        assert!(greet().validate().is_ok());
        assert!(Snippet { name: String::new(), ..greet() }.validate().is_err());
        assert!(Snippet { language: String::new(), ..greet() }.validate().is_err());
        assert!(Snippet { language: "../etc".into(), ..greet() }.validate().is_err());
    }
}
