//! Dotted/quoted key paths
//!
//! A [`KeyPath`] is an ordered list of string keys addressing a field in the
//! tree. Parsing splits unquoted runs on `.` while treating quoted runs as
//! atomic keys; serialization quotes any key that contains structural
//! characters, whitespace or a literal dot.

use crate::error::{Position, SyntaxError};
use crate::lexer::{self, LiteralKind, Token, TokenKind};
use std::fmt;

/// An ordered, case- and whitespace-preserving sequence of key strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath {
    keys: Vec<String>,
}

impl KeyPath {
    /// Creates an empty path
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Creates a path from explicit keys
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a dotted path expression, re-tokenizing the text
    pub fn parse(text: &str) -> Result<Self, SyntaxError> {
        let tokens = lexer::tokenize(text).map_err(|_| SyntaxError::InvalidPathExpression {
            text: text.to_string(),
            position: Position::new(),
        })?;
        let literals: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .collect();
        for token in &literals {
            if !token.is_literal() {
                return Err(SyntaxError::InvalidPathExpression {
                    text: text.to_string(),
                    position: token.position,
                });
            }
        }
        let path = Self::from_tokens(&literals)?;
        if path.is_empty() {
            return Err(SyntaxError::InvalidPathExpression {
                text: text.to_string(),
                position: Position::new(),
            });
        }
        Ok(path)
    }

    /// Builds a path from a run of literal tokens collected by the parser.
    ///
    /// Unquoted token text is split on `.`; quoted tokens are atomic keys;
    /// whitespace tokens at the edges are trimmed and interior whitespace is
    /// preserved inside the surrounding key.
    pub fn from_tokens(tokens: &[Token]) -> Result<Self, SyntaxError> {
        let mut run: &[Token] = tokens;
        while let Some(first) = run.first() {
            if first.is_whitespace() {
                run = &run[1..];
            } else {
                break;
            }
        }
        while let Some(last) = run.last() {
            if last.is_whitespace() {
                run = &run[..run.len() - 1];
            } else {
                break;
            }
        }

        let mut keys: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut has_content = false;
        let position = run.first().map(|t| t.position).unwrap_or_default();

        let mut flush = |current: &mut String, has_content: &mut bool| -> Result<(), SyntaxError> {
            if !*has_content && current.is_empty() {
                let text: String = tokens.iter().map(|t| t.source.as_str()).collect();
                return Err(SyntaxError::EmptyKey { text, position });
            }
            keys.push(std::mem::take(current));
            *has_content = false;
            Ok(())
        };

        for token in run {
            match token.kind {
                TokenKind::Literal(LiteralKind::TripleQuotedString) => {
                    return Err(SyntaxError::TripleQuotedKey {
                        position: token.position,
                    });
                }
                TokenKind::Literal(LiteralKind::QuotedString) => {
                    current.push_str(&token.value);
                    has_content = true;
                }
                TokenKind::Literal(LiteralKind::Whitespace) => {
                    current.push_str(&token.source);
                }
                TokenKind::Literal(_) => {
                    for (i, piece) in token.source.split('.').enumerate() {
                        if i > 0 {
                            flush(&mut current, &mut has_content)?;
                        }
                        if !piece.is_empty() {
                            current.push_str(piece);
                            has_content = true;
                        }
                    }
                }
                TokenKind::Substitution { .. } => {
                    return Err(SyntaxError::SubstitutionInKey {
                        position: token.position,
                    });
                }
                _ => {
                    return Err(SyntaxError::UnexpectedToken {
                        token: token.kind.type_name().to_string(),
                        position: token.position,
                        expected: "a key".to_string(),
                    });
                }
            }
        }
        if !run.is_empty() {
            flush(&mut current, &mut has_content)?;
        }
        Ok(Self { keys })
    }

    /// The keys of the path, in order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns a new path with `key` appended
    pub fn child(&self, key: &str) -> Self {
        let mut keys = self.keys.clone();
        keys.push(key.to_string());
        Self { keys }
    }

    /// Appends a key in place
    pub fn push(&mut self, key: String) {
        self.keys.push(key);
    }

    /// Returns a new path with `prefix` prepended
    pub fn prefixed(&self, prefix: &KeyPath) -> Self {
        let mut keys = prefix.keys.clone();
        keys.extend(self.keys.iter().cloned());
        Self { keys }
    }

    /// True if `self` begins with all keys of `prefix`
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        self.keys.len() >= prefix.keys.len() && self.keys[..prefix.keys.len()] == prefix.keys[..]
    }

    /// Removes `prefix` from the front of the path, if present
    pub fn strip_prefix(&self, prefix: &KeyPath) -> Option<KeyPath> {
        if self.starts_with(prefix) {
            Some(Self {
                keys: self.keys[prefix.keys.len()..].to_vec(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if needs_quoting(key) {
                f.write_str(&quote_string(key))?;
            } else {
                f.write_str(key)?;
            }
        }
        Ok(())
    }
}

/// True if a key must be quoted when serialized as part of a path
pub fn needs_quoting(key: &str) -> bool {
    key.is_empty()
        || key.contains("//")
        || key
            .chars()
            .any(|c| lexer::is_reserved_char(c) || c == '.' || c.is_whitespace())
}

/// Renders a string as a double-quoted Json+ string literal
pub fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
