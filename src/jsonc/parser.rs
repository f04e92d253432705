use std::fmt;

use serde_json::{Map, Number, Value};

use super::scanner::{ScanError, Scanner, SyntaxKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorCode {
    InvalidSymbol,
    InvalidNumberFormat,
    PropertyNameExpected,
    ValueExpected,
    ColonExpected,
    CommaExpected,
    CloseBraceExpected,
    CloseBracketExpected,
    EndOfFileExpected,
    InvalidCommentToken,
    UnexpectedEndOfComment,
    UnexpectedEndOfString,
    UnexpectedEndOfNumber,
    InvalidUnicode,
    InvalidEscapeCharacter,
    InvalidCharacter,
}

impl fmt::Display for ParseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<ScanError> for ParseErrorCode {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::UnexpectedEndOfComment => Self::UnexpectedEndOfComment,
            ScanError::UnexpectedEndOfString => Self::UnexpectedEndOfString,
            ScanError::UnexpectedEndOfNumber => Self::UnexpectedEndOfNumber,
            ScanError::InvalidUnicode => Self::InvalidUnicode,
            ScanError::InvalidEscapeCharacter => Self::InvalidEscapeCharacter,
            ScanError::InvalidCharacter => Self::InvalidCharacter,
        }
    }
}

/// A structural problem found while parsing, located by byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    pub code: ParseErrorCode,
    pub offset: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error at the offset {}", self.code, self.offset)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub disallow_comments: bool,
    pub allow_trailing_comma: bool,
    pub allow_empty_content: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            disallow_comments: false,
            allow_trailing_comma: true,
            allow_empty_content: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
    Property,
    String,
    Number,
    Boolean,
    Null,
}

/// A syntax tree node covering `offset..offset + length` of the source.
///
/// Properties hold the key node and, when one was parsed, the value node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub offset: usize,
    pub length: usize,
    pub value: Value,
    pub children: Vec<Node>,
}

impl Node {
    fn leaf(kind: NodeKind, offset: usize, length: usize, value: Value) -> Self {
        Self {
            kind,
            offset,
            length,
            value,
            children: Vec::new(),
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// The key of a property node.
    pub fn key(&self) -> Option<&str> {
        if self.kind != NodeKind::Property {
            return None;
        }
        self.children.first().and_then(|k| k.value.as_str())
    }

    /// The value node of a property node.
    pub fn property_value(&self) -> Option<&Node> {
        if self.kind != NodeKind::Property {
            return None;
        }
        self.children.get(1)
    }

    /// Find the last property named `key` in an object node.
    pub fn find_property(&self, key: &str) -> Option<&Node> {
        if self.kind != NodeKind::Object {
            return None;
        }
        self.children.iter().rev().find(|p| p.key() == Some(key))
    }

    pub fn to_value(&self) -> Value {
        match self.kind {
            NodeKind::Object => {
                let mut map = Map::new();
                for prop in &self.children {
                    if let (Some(key), Some(value)) = (prop.key(), prop.property_value()) {
                        map.insert(key.to_string(), value.to_value());
                    }
                }
                Value::Object(map)
            }
            NodeKind::Array => Value::Array(self.children.iter().map(Node::to_value).collect()),
            NodeKind::Property => self
                .property_value()
                .map_or(Value::Null, Node::to_value),
            _ => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParseTree {
    pub root: Option<Node>,
    pub errors: Vec<ParseError>,
}

/// Parse `text` into a value, collecting every structural error instead of
/// stopping at the first. The value is whatever could be recovered.
pub fn parse(text: &str, options: ParseOptions) -> (Option<Value>, Vec<ParseError>) {
    let tree = parse_tree(text, options);
    (tree.root.as_ref().map(Node::to_value), tree.errors)
}

pub fn parse_tree(text: &str, options: ParseOptions) -> ParseTree {
    let mut parser = Parser {
        scanner: Scanner::new(text),
        options,
        errors: Vec::new(),
        last_end: 0,
    };
    let root = parser.parse_document();
    ParseTree {
        root,
        errors: parser.errors,
    }
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    options: ParseOptions,
    errors: Vec<ParseError>,
    /// End of the last significant token consumed.
    last_end: usize,
}

impl Parser<'_> {
    fn token(&self) -> SyntaxKind {
        self.scanner.token()
    }

    fn push_error(&mut self, code: ParseErrorCode) {
        self.errors.push(ParseError {
            code,
            offset: self.scanner.token_offset(),
        });
    }

    /// Advance to the next significant token, reporting scan errors,
    /// unknown symbols and (when disallowed) comments on the way.
    fn scan_next(&mut self) -> SyntaxKind {
        if self.token() != SyntaxKind::Eof {
            self.last_end = self.scanner.token_end();
        }
        loop {
            let token = self.scanner.scan();
            if let Some(err) = self.scanner.error() {
                self.push_error(err.into());
            }
            match token {
                SyntaxKind::LineComment | SyntaxKind::BlockComment => {
                    if self.options.disallow_comments {
                        self.push_error(ParseErrorCode::InvalidCommentToken);
                    }
                }
                SyntaxKind::Unknown => self.push_error(ParseErrorCode::InvalidSymbol),
                SyntaxKind::Trivia | SyntaxKind::LineBreak => {}
                _ => return token,
            }
        }
    }

    fn handle_error(
        &mut self,
        code: ParseErrorCode,
        skip_until_after: &[SyntaxKind],
        skip_until: &[SyntaxKind],
    ) {
        self.push_error(code);
        if skip_until_after.is_empty() && skip_until.is_empty() {
            return;
        }
        let mut token = self.token();
        while token != SyntaxKind::Eof {
            if skip_until_after.contains(&token) {
                self.scan_next();
                break;
            }
            if skip_until.contains(&token) {
                break;
            }
            token = self.scan_next();
        }
    }

    fn parse_document(&mut self) -> Option<Node> {
        self.scan_next();
        if self.token() == SyntaxKind::Eof {
            if !self.options.allow_empty_content {
                self.handle_error(ParseErrorCode::ValueExpected, &[], &[]);
            }
            return None;
        }
        let root = self.parse_value();
        if root.is_none() {
            self.handle_error(ParseErrorCode::ValueExpected, &[], &[]);
        } else if self.token() != SyntaxKind::Eof {
            self.handle_error(ParseErrorCode::EndOfFileExpected, &[], &[]);
        }
        root
    }

    fn parse_value(&mut self) -> Option<Node> {
        match self.token() {
            SyntaxKind::OpenBrace => Some(self.parse_object()),
            SyntaxKind::OpenBracket => Some(self.parse_array()),
            SyntaxKind::String => Some(self.parse_string()),
            SyntaxKind::Number => Some(self.parse_number()),
            SyntaxKind::True | SyntaxKind::False => {
                let value = Value::Bool(self.token() == SyntaxKind::True);
                Some(self.parse_literal(NodeKind::Boolean, value))
            }
            SyntaxKind::Null => Some(self.parse_literal(NodeKind::Null, Value::Null)),
            _ => None,
        }
    }

    fn parse_literal(&mut self, kind: NodeKind, value: Value) -> Node {
        let node = Node::leaf(
            kind,
            self.scanner.token_offset(),
            self.scanner.token_length(),
            value,
        );
        self.scan_next();
        node
    }

    fn parse_string(&mut self) -> Node {
        let value = Value::String(self.scanner.value().to_string());
        self.parse_literal(NodeKind::String, value)
    }

    fn parse_number(&mut self) -> Node {
        let value = match self.scanner.value().parse::<Number>() {
            Ok(n) => Value::Number(n),
            Err(_) => {
                self.push_error(ParseErrorCode::InvalidNumberFormat);
                Value::Null
            }
        };
        self.parse_literal(NodeKind::Number, value)
    }

    fn parse_property(&mut self) -> Option<Node> {
        if self.token() != SyntaxKind::String {
            self.handle_error(
                ParseErrorCode::PropertyNameExpected,
                &[],
                &[SyntaxKind::CloseBrace, SyntaxKind::Comma],
            );
            return None;
        }
        let key = self.parse_string();
        let mut prop = Node {
            kind: NodeKind::Property,
            offset: key.offset,
            length: key.length,
            value: Value::Null,
            children: vec![key],
        };

        if self.token() == SyntaxKind::Colon {
            self.scan_next();
            match self.parse_value() {
                Some(value) => {
                    prop.length = value.end() - prop.offset;
                    prop.children.push(value);
                }
                None => self.handle_error(
                    ParseErrorCode::ValueExpected,
                    &[],
                    &[SyntaxKind::CloseBrace, SyntaxKind::Comma],
                ),
            }
        } else {
            self.handle_error(
                ParseErrorCode::ColonExpected,
                &[],
                &[SyntaxKind::CloseBrace, SyntaxKind::Comma],
            );
        }
        Some(prop)
    }

    fn parse_object(&mut self) -> Node {
        let offset = self.scanner.token_offset();
        self.scan_next();
        let mut children = Vec::new();
        let mut needs_comma = false;

        while !matches!(self.token(), SyntaxKind::CloseBrace | SyntaxKind::Eof) {
            if self.token() == SyntaxKind::Comma {
                if !needs_comma {
                    self.handle_error(ParseErrorCode::ValueExpected, &[], &[]);
                }
                self.scan_next();
                if self.token() == SyntaxKind::CloseBrace && self.options.allow_trailing_comma {
                    break;
                }
            } else if needs_comma {
                self.handle_error(ParseErrorCode::CommaExpected, &[], &[]);
            }
            match self.parse_property() {
                Some(prop) => children.push(prop),
                None => self.handle_error(
                    ParseErrorCode::ValueExpected,
                    &[],
                    &[SyntaxKind::CloseBrace, SyntaxKind::Comma],
                ),
            }
            needs_comma = true;
        }

        let end = self.close(SyntaxKind::CloseBrace, ParseErrorCode::CloseBraceExpected);
        Node {
            kind: NodeKind::Object,
            offset,
            length: end - offset,
            value: Value::Null,
            children,
        }
    }

    fn parse_array(&mut self) -> Node {
        let offset = self.scanner.token_offset();
        self.scan_next();
        let mut children = Vec::new();
        let mut needs_comma = false;

        while !matches!(self.token(), SyntaxKind::CloseBracket | SyntaxKind::Eof) {
            if self.token() == SyntaxKind::Comma {
                if !needs_comma {
                    self.handle_error(ParseErrorCode::ValueExpected, &[], &[]);
                }
                self.scan_next();
                if self.token() == SyntaxKind::CloseBracket && self.options.allow_trailing_comma {
                    break;
                }
            } else if needs_comma {
                self.handle_error(ParseErrorCode::CommaExpected, &[], &[]);
            }
            match self.parse_value() {
                Some(value) => children.push(value),
                None => self.handle_error(
                    ParseErrorCode::ValueExpected,
                    &[],
                    &[SyntaxKind::CloseBracket, SyntaxKind::Comma],
                ),
            }
            needs_comma = true;
        }

        let end = self.close(SyntaxKind::CloseBracket, ParseErrorCode::CloseBracketExpected);
        Node {
            kind: NodeKind::Array,
            offset,
            length: end - offset,
            value: Value::Null,
            children,
        }
    }

    /// Consume the closing token of a container and return the container's
    /// end offset.
    fn close(&mut self, closing: SyntaxKind, missing: ParseErrorCode) -> usize {
        if self.token() == closing {
            let end = self.scanner.token_end();
            self.scan_next();
            end
        } else {
            let end = self.last_end;
            self.handle_error(missing, &[closing], &[]);
            end
        }
    }
}
