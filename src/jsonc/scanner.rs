/// Token-level scanner for JSON with comments.
///
/// Offsets are byte offsets into the scanned text. The scanner never fails;
/// problems inside a token are reported through [`Scanner::error`] and the
/// token is still produced so the parser can keep going.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Comma,
    Colon,
    Null,
    True,
    False,
    String,
    Number,
    LineComment,
    BlockComment,
    LineBreak,
    Trivia,
    Unknown,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    UnexpectedEndOfComment,
    UnexpectedEndOfString,
    UnexpectedEndOfNumber,
    InvalidUnicode,
    InvalidEscapeCharacter,
    InvalidCharacter,
}

pub struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    token: SyntaxKind,
    token_offset: usize,
    value: String,
    error: Option<ScanError>,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            token: SyntaxKind::Eof,
            token_offset: 0,
            value: String::new(),
            error: None,
        }
    }

    /// Restart scanning at `pos`.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
        self.token = SyntaxKind::Eof;
        self.token_offset = self.pos;
        self.value.clear();
        self.error = None;
    }

    pub fn token(&self) -> SyntaxKind {
        self.token
    }

    pub fn token_offset(&self) -> usize {
        self.token_offset
    }

    pub fn token_end(&self) -> usize {
        self.pos
    }

    pub fn token_length(&self) -> usize {
        self.pos - self.token_offset
    }

    /// Decoded value of the current token: unescaped contents for strings,
    /// the raw text otherwise.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn error(&self) -> Option<ScanError> {
        self.error
    }

    pub fn scan(&mut self) -> SyntaxKind {
        self.value.clear();
        self.error = None;
        self.token_offset = self.pos;
        self.token = self.scan_token();
        self.token
    }

    fn scan_token(&mut self) -> SyntaxKind {
        let Some(&b) = self.bytes.get(self.pos) else {
            return SyntaxKind::Eof;
        };

        if self.pos == 0 && self.text.starts_with(BOM) {
            self.pos = BOM.len_utf8();
            self.take_raw();
            return SyntaxKind::Trivia;
        }

        match b {
            b' ' | b'\t' => {
                while matches!(self.peek(0), Some(b' ' | b'\t')) {
                    self.pos += 1;
                }
                self.take_raw();
                SyntaxKind::Trivia
            }
            b'\r' | b'\n' => {
                self.pos += 1;
                if b == b'\r' && self.peek(0) == Some(b'\n') {
                    self.pos += 1;
                }
                self.take_raw();
                SyntaxKind::LineBreak
            }
            b'{' => self.single(SyntaxKind::OpenBrace),
            b'}' => self.single(SyntaxKind::CloseBrace),
            b'[' => self.single(SyntaxKind::OpenBracket),
            b']' => self.single(SyntaxKind::CloseBracket),
            b',' => self.single(SyntaxKind::Comma),
            b':' => self.single(SyntaxKind::Colon),
            b'"' => {
                self.pos += 1;
                self.scan_string();
                SyntaxKind::String
            }
            b'/' => match self.peek(1) {
                Some(b'/') => {
                    self.pos += 2;
                    while !matches!(self.peek(0), None | Some(b'\r' | b'\n')) {
                        self.pos += 1;
                    }
                    self.take_raw();
                    SyntaxKind::LineComment
                }
                Some(b'*') => {
                    self.pos += 2;
                    match self.text[self.pos..].find("*/") {
                        Some(end) => self.pos += end + 2,
                        None => {
                            self.pos = self.bytes.len();
                            self.error = Some(ScanError::UnexpectedEndOfComment);
                        }
                    }
                    self.take_raw();
                    SyntaxKind::BlockComment
                }
                _ => self.single(SyntaxKind::Unknown),
            },
            b'-' => {
                self.pos += 1;
                if !matches!(self.peek(0), Some(b'0'..=b'9')) {
                    self.take_raw();
                    return SyntaxKind::Unknown;
                }
                self.scan_number();
                SyntaxKind::Number
            }
            b'0'..=b'9' => {
                self.scan_number();
                SyntaxKind::Number
            }
            _ => {
                while let Some(c) = self.peek(0) {
                    if is_separator(c) {
                        break;
                    }
                    self.pos += 1;
                }
                if self.pos == self.token_offset {
                    // a lone separator byte we have no token for
                    self.pos += self.text[self.pos..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                }
                self.take_raw();
                match self.value.as_str() {
                    "true" => SyntaxKind::True,
                    "false" => SyntaxKind::False,
                    "null" => SyntaxKind::Null,
                    _ => SyntaxKind::Unknown,
                }
            }
        }
    }

    fn single(&mut self, kind: SyntaxKind) -> SyntaxKind {
        self.pos += 1;
        self.take_raw();
        kind
    }

    fn take_raw(&mut self) {
        self.value.push_str(&self.text[self.token_offset..self.pos]);
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn scan_number(&mut self) {
        if self.peek(0) == Some(b'0') {
            self.pos += 1;
        } else {
            self.skip_digits();
        }

        if self.peek(0) == Some(b'.') {
            self.pos += 1;
            if matches!(self.peek(0), Some(b'0'..=b'9')) {
                self.skip_digits();
            } else {
                self.error = Some(ScanError::UnexpectedEndOfNumber);
                self.take_raw();
                return;
            }
        }

        if matches!(self.peek(0), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(0), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if matches!(self.peek(0), Some(b'0'..=b'9')) {
                self.skip_digits();
            } else {
                self.error = Some(ScanError::UnexpectedEndOfNumber);
            }
        }
        self.take_raw();
    }

    fn skip_digits(&mut self) {
        while matches!(self.peek(0), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }

    /// Scans after the opening quote, leaving the decoded contents in `value`.
    fn scan_string(&mut self) {
        loop {
            let Some(b) = self.peek(0) else {
                self.error = Some(ScanError::UnexpectedEndOfString);
                return;
            };
            match b {
                b'"' => {
                    self.pos += 1;
                    return;
                }
                b'\\' => {
                    self.pos += 1;
                    let Some(esc) = self.peek(0) else {
                        self.error = Some(ScanError::UnexpectedEndOfString);
                        return;
                    };
                    // the escaped char may be multi-byte; stay on a char boundary
                    self.pos += self.text[self.pos..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    match esc {
                        b'"' => self.value.push('"'),
                        b'\\' => self.value.push('\\'),
                        b'/' => self.value.push('/'),
                        b'b' => self.value.push('\u{8}'),
                        b'f' => self.value.push('\u{c}'),
                        b'n' => self.value.push('\n'),
                        b'r' => self.value.push('\r'),
                        b't' => self.value.push('\t'),
                        b'u' => self.scan_unicode_escape(),
                        _ => self.error = Some(ScanError::InvalidEscapeCharacter),
                    }
                }
                b'\r' | b'\n' => {
                    self.error = Some(ScanError::UnexpectedEndOfString);
                    return;
                }
                0x00..=0x1f => {
                    self.error = Some(ScanError::InvalidCharacter);
                    self.value.push(b as char);
                    self.pos += 1;
                }
                _ => {
                    let ch = self.text[self.pos..].chars().next().unwrap_or('\u{fffd}');
                    self.value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    fn scan_unicode_escape(&mut self) {
        let Some(high) = self.scan_hex4() else {
            self.error = Some(ScanError::InvalidUnicode);
            return;
        };

        if (0xd800..0xdc00).contains(&high)
            && self.peek(0) == Some(b'\\')
            && self.peek(1) == Some(b'u')
        {
            let resume = self.pos;
            self.pos += 2;
            match self.scan_hex4() {
                Some(low) if (0xdc00..0xe000).contains(&low) => {
                    let code = 0x10000 + ((high - 0xd800) << 10) + (low - 0xdc00);
                    self.value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    return;
                }
                _ => self.pos = resume,
            }
        }
        self.value.push(char::from_u32(high).unwrap_or('\u{fffd}'));
    }

    fn scan_hex4(&mut self) -> Option<u32> {
        let mut code = 0;
        for _ in 0..4 {
            let digit = (self.peek(0)? as char).to_digit(16)?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Some(code)
    }
}

/// Byte order mark some editors write at the start of a UTF-8 file.
const BOM: char = '\u{feff}';

fn is_separator(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'\t' | b'\r' | b'\n' | b'{' | b'}' | b'[' | b']' | b',' | b':' | b'"' | b'/'
    )
}
