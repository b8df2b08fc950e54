//! Json+ lexical analyzer
//!
//! This module provides the core lexical analysis functionality for Json+
//! text, converting input text into a fully materialized token list with
//! line/column provenance. The tokenizer has no semantic knowledge of paths
//! or merging; it only classifies characters and literals.

use crate::error::{LexError, Position};

/// Characters that may never appear in an unquoted string or key
pub const RESERVED_CHARACTERS: &[char] = &[
    '$', '\'', '{', '}', '[', ']', ':', '=', ',', '#', '`', '^', '?', '!', '@', '*', '&', '"',
    '\\',
];

/// Returns true if the character is in the reserved structural set
pub fn is_reserved_char(c: char) -> bool {
    RESERVED_CHARACTERS.contains(&c)
}

/// Returns true if the character may appear in an unquoted string.
///
/// An unquoted character is any character that is not whitespace, not a
/// comment starter, and not in the reserved structural set. The `//` comment
/// starter is two characters long and is handled by the scan loop instead.
pub fn is_unquoted_char(c: char) -> bool {
    !c.is_whitespace() && !is_reserved_char(c)
}

/// Subtypes of literal tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Null,
    Boolean,
    Integer,
    Decimal,
    Hexadecimal,
    Octal,
    UnquotedString,
    QuotedString,
    TripleQuotedString,
    Whitespace,
}

/// The source kind of an include directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeKind {
    /// `include file("...")`
    File,
    /// `include url("...")`
    Url,
    /// `include classpath("...")`
    Resource,
    /// `include "..."`
    Unspecified,
}

/// Json+ token types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    Comma,
    Colon,
    Assign,
    PlusAssign,
    /// Newlines are significant separators and get their own token
    Newline,
    Literal(LiteralKind),
    /// `${path}` (required) or `${?path}` (optional); the token value is the
    /// raw path text between the braces
    Substitution { required: bool },
    /// A complete include directive; the token value is the locator
    Include {
        kind: IncludeKind,
        required: bool,
        optional: bool,
    },
    Comment,
    Eof,
}

impl TokenKind {
    /// Returns a string representation of the token type for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            TokenKind::ObjectStart => "'{'",
            TokenKind::ObjectEnd => "'}'",
            TokenKind::ArrayStart => "'['",
            TokenKind::ArrayEnd => "']'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Assign => "'='",
            TokenKind::PlusAssign => "'+='",
            TokenKind::Newline => "newline",
            TokenKind::Literal(LiteralKind::Null) => "null",
            TokenKind::Literal(LiteralKind::Boolean) => "boolean",
            TokenKind::Literal(LiteralKind::Integer) => "integer",
            TokenKind::Literal(LiteralKind::Decimal) => "decimal",
            TokenKind::Literal(LiteralKind::Hexadecimal) => "hexadecimal",
            TokenKind::Literal(LiteralKind::Octal) => "octal",
            TokenKind::Literal(LiteralKind::UnquotedString) => "unquoted string",
            TokenKind::Literal(LiteralKind::QuotedString) => "quoted string",
            TokenKind::Literal(LiteralKind::TripleQuotedString) => "triple-quoted string",
            TokenKind::Literal(LiteralKind::Whitespace) => "whitespace",
            TokenKind::Substitution { .. } => "substitution",
            TokenKind::Include { .. } => "include",
            TokenKind::Comment => "comment",
            TokenKind::Eof => "end of file",
        }
    }
}

/// A single token with its semantic text, raw source text and position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Semantic text: unescaped string content, canonical number, trimmed
    /// substitution path, include locator
    pub value: String,
    /// The raw re-serializable source form of the token
    pub source: String,
    pub position: Position,
}

impl Token {
    /// Creates a new token
    pub fn new(kind: TokenKind, value: String, source: String, position: Position) -> Self {
        Self {
            kind,
            value,
            source,
            position,
        }
    }

    fn structural(kind: TokenKind, source: &str, position: Position) -> Self {
        Self::new(kind, source.to_string(), source.to_string(), position)
    }

    /// Returns true if this token is a literal of any subtype
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, TokenKind::Literal(_))
    }

    /// Returns true if this token is a whitespace literal
    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Literal(LiteralKind::Whitespace)
    }
}

/// Tokenizes a complete Json+ source into a token list ending in `Eof`
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Tokenizer::new(source).tokenize()
}

/// The Json+ tokenizer
///
/// Operates on a fully buffered character vector so that the include matcher
/// and numeric classification can rewind freely.
#[derive(Debug)]
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    position: Position,
}

impl Tokenizer {
    /// Creates a new tokenizer over the given source text
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            position: Position::new(),
        }
    }

    /// Consumes the tokenizer, producing the complete token list
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        self.position.advance(c);
        Some(c)
    }

    fn mark(&self) -> (usize, Position) {
        (self.pos, self.position)
    }

    fn reset(&mut self, mark: (usize, Position)) {
        self.pos = mark.0;
        self.position = mark.1;
    }

    fn source_since(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let position = self.position;
        let start = self.pos;
        let c = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(Token::structural(TokenKind::Eof, "", position));
            }
        };

        match c {
            '\n' => {
                self.advance();
                Ok(Token::structural(TokenKind::Newline, "\n", position))
            }
            '\r' => {
                self.advance();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                Ok(Token::new(
                    TokenKind::Newline,
                    "\n".to_string(),
                    self.source_since(start),
                    position,
                ))
            }
            '{' => {
                self.advance();
                Ok(Token::structural(TokenKind::ObjectStart, "{", position))
            }
            '}' => {
                self.advance();
                Ok(Token::structural(TokenKind::ObjectEnd, "}", position))
            }
            '[' => {
                self.advance();
                Ok(Token::structural(TokenKind::ArrayStart, "[", position))
            }
            ']' => {
                self.advance();
                Ok(Token::structural(TokenKind::ArrayEnd, "]", position))
            }
            ',' => {
                self.advance();
                Ok(Token::structural(TokenKind::Comma, ",", position))
            }
            ':' => {
                self.advance();
                Ok(Token::structural(TokenKind::Colon, ":", position))
            }
            '=' => {
                self.advance();
                Ok(Token::structural(TokenKind::Assign, "=", position))
            }
            '+' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(Token::structural(TokenKind::PlusAssign, "+=", position))
            }
            '#' => Ok(self.lex_comment(position)),
            '/' if self.peek_at(1) == Some('/') => Ok(self.lex_comment(position)),
            '$' if self.peek_at(1) == Some('{') => self.lex_substitution(position),
            '"' => {
                if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') {
                    self.lex_triple_quoted(position)
                } else {
                    self.lex_quoted('"', position)
                }
            }
            '\'' => self.lex_quoted('\'', position),
            // `&` is reserved except as the `&h`/`&H` hexadecimal prefix
            '&' if matches!(self.peek_at(1), Some('h' | 'H'))
                && matches!(self.peek_at(2), Some(c) if c.is_ascii_hexdigit()) =>
            {
                self.lex_unquoted(position)
            }
            c if c.is_whitespace() => Ok(self.lex_whitespace(position)),
            c if is_unquoted_char(c) => self.lex_unquoted(position),
            c => Err(LexError::UnexpectedCharacter {
                character: c,
                position,
            }),
        }
    }

    /// Collapses a run of non-newline whitespace into a single token,
    /// preserving the text verbatim for literal concatenation
    fn lex_whitespace(&mut self, position: Position) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() && c != '\n' && c != '\r' {
                self.advance();
            } else {
                break;
            }
        }
        let text = self.source_since(start);
        Token::new(
            TokenKind::Literal(LiteralKind::Whitespace),
            text.clone(),
            text,
            position,
        )
    }

    /// Consumes a `#` or `//` comment up to (not including) the newline
    fn lex_comment(&mut self, position: Position) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            self.advance();
        }
        let text = self.source_since(start);
        Token::new(TokenKind::Comment, text.clone(), text, position)
    }

    /// Lexes `${path}` or `${?path}` into a single substitution token
    fn lex_substitution(&mut self, position: Position) -> Result<Token, LexError> {
        let start = self.pos;
        self.advance(); // $
        self.advance(); // {
        let required = if self.peek() == Some('?') {
            self.advance();
            false
        } else {
            true
        };
        let mut path = String::new();
        loop {
            match self.advance() {
                Some('}') => break,
                Some(c) => path.push(c),
                None => return Err(LexError::UnterminatedSubstitution { position }),
            }
        }
        Ok(Token::new(
            TokenKind::Substitution { required },
            path.trim().to_string(),
            self.source_since(start),
            position,
        ))
    }

    /// Lexes a quoted string with the fixed Json+ escape set
    fn lex_quoted(&mut self, quote: char, position: Position) -> Result<Token, LexError> {
        let start = self.pos;
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedString { position }),
                Some('\n') => return Err(LexError::UnterminatedString { position }),
                Some('\\') => {
                    let escape_pos = self.position;
                    match self.advance() {
                        None => return Err(LexError::UnterminatedString { position }),
                        Some('"') => value.push('"'),
                        Some('\'') => value.push('\''),
                        Some('\\') => value.push('\\'),
                        Some('/') => value.push('/'),
                        Some('b') => value.push('\u{0008}'),
                        Some('f') => value.push('\u{000C}'),
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('u') => value.push(self.lex_unicode_escape(escape_pos)?),
                        Some(other) => {
                            return Err(LexError::InvalidEscape {
                                sequence: other.to_string(),
                                position: escape_pos,
                            });
                        }
                    }
                }
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
            }
        }
        Ok(Token::new(
            TokenKind::Literal(LiteralKind::QuotedString),
            value,
            self.source_since(start),
            position,
        ))
    }

    /// Lexes the `XXXX` part of a `\uXXXX` escape
    fn lex_unicode_escape(&mut self, position: Position) -> Result<char, LexError> {
        let mut digits = String::new();
        for _ in 0..4 {
            match self.advance() {
                Some(c) if c.is_ascii_hexdigit() => digits.push(c),
                Some(c) => {
                    digits.push(c);
                    return Err(LexError::InvalidUnicodeEscape {
                        sequence: digits,
                        position,
                    });
                }
                None => {
                    return Err(LexError::InvalidUnicodeEscape {
                        sequence: digits,
                        position,
                    });
                }
            }
        }
        let code = u32::from_str_radix(&digits, 16).map_err(|_| LexError::InvalidUnicodeEscape {
            sequence: digits.clone(),
            position,
        })?;
        char::from_u32(code).ok_or(LexError::InvalidUnicodeEscape {
            sequence: digits,
            position,
        })
    }

    /// Lexes a raw `"""..."""` string; escapes are not processed
    fn lex_triple_quoted(&mut self, position: Position) -> Result<Token, LexError> {
        let start = self.pos;
        self.advance();
        self.advance();
        self.advance();
        let mut value = String::new();
        loop {
            if self.peek() == Some('"') && self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"')
            {
                self.advance();
                self.advance();
                self.advance();
                break;
            }
            match self.advance() {
                Some(c) => value.push(c),
                None => return Err(LexError::UnterminatedTripleQuotedString { position }),
            }
        }
        Ok(Token::new(
            TokenKind::Literal(LiteralKind::TripleQuotedString),
            value,
            self.source_since(start),
            position,
        ))
    }

    /// Lexes a maximal unquoted run and classifies it as a keyword, number
    /// or unquoted string. The word `include` additionally triggers the
    /// include directive matcher with graceful fallback.
    fn lex_unquoted(&mut self, position: Position) -> Result<Token, LexError> {
        let start = self.pos;
        self.advance(); // the first character was vetted by the dispatcher
        while let Some(c) = self.peek() {
            if !is_unquoted_char(c) {
                break;
            }
            if c == '/' && self.peek_at(1) == Some('/') {
                break;
            }
            self.advance();
        }
        let word = self.source_since(start);
        if word == "include" {
            if let Some(token) = self.try_include(position)? {
                return Ok(token);
            }
        }
        let (kind, value) = classify_word(&word);
        Ok(Token::new(
            TokenKind::Literal(kind),
            value,
            word,
            position,
        ))
    }

    /// Attempts to match a complete include directive after the `include`
    /// keyword. On any mismatch the tokenizer rewinds and the keyword
    /// degrades to an ordinary unquoted-string literal.
    fn try_include(&mut self, position: Position) -> Result<Option<Token>, LexError> {
        let mark = self.mark();
        let start = self.pos;
        let optional = if self.peek() == Some('?') {
            self.advance();
            true
        } else {
            false
        };
        self.skip_inline_whitespace();
        match self.include_clause() {
            Some((kind, required, locator)) => {
                let mut source = String::from(if optional { "include?" } else { "include" });
                source.push(' ');
                source.push_str(self.source_since(start).trim_start());
                Ok(Some(Token::new(
                    TokenKind::Include {
                        kind,
                        required,
                        optional,
                    },
                    locator,
                    source,
                    position,
                )))
            }
            None => {
                self.reset(mark);
                Ok(None)
            }
        }
    }

    /// One clause of the include grammar:
    /// quoted path, `required(...)`, or `url|file|classpath("...")`
    fn include_clause(&mut self) -> Option<(IncludeKind, bool, String)> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let token = self.lex_quoted(quote, self.position).ok()?;
                Some((IncludeKind::Unspecified, false, token.value))
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphabetic() {
                        self.advance();
                    } else {
                        break;
                    }
                }
                let word = self.source_since(start);
                self.skip_inline_whitespace();
                if self.peek() != Some('(') {
                    return None;
                }
                self.advance();
                self.skip_inline_whitespace();
                let result = match word.as_str() {
                    "required" => {
                        let (kind, _, locator) = self.include_clause()?;
                        (kind, true, locator)
                    }
                    "url" | "file" | "classpath" => {
                        let quote = match self.peek() {
                            Some(q @ ('"' | '\'')) => q,
                            _ => return None,
                        };
                        let token = self.lex_quoted(quote, self.position).ok()?;
                        let kind = match word.as_str() {
                            "url" => IncludeKind::Url,
                            "file" => IncludeKind::File,
                            _ => IncludeKind::Resource,
                        };
                        (kind, false, token.value)
                    }
                    _ => return None,
                };
                self.skip_inline_whitespace();
                if self.peek() != Some(')') {
                    return None;
                }
                self.advance();
                Some(result)
            }
            _ => None,
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() && c != '\n' && c != '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }
}

/// Classifies an unquoted word as a keyword, number or unquoted string.
///
/// Returns the literal kind and the semantic value. Numbers are validated by
/// attempted 64-bit parses; any word that fails every numeric stage falls
/// through to an unquoted string.
fn classify_word(word: &str) -> (LiteralKind, String) {
    match word {
        "true" | "yes" => return (LiteralKind::Boolean, "true".to_string()),
        "false" | "no" => return (LiteralKind::Boolean, "false".to_string()),
        "null" => return (LiteralKind::Null, "null".to_string()),
        "NaN" | "infinity" | "+infinity" | "-infinity" => {
            return (LiteralKind::Decimal, word.to_string());
        }
        _ => {}
    }

    if let Some(rest) = strip_hex_prefix(word) {
        if !rest.is_empty() {
            if let Ok(n) = i64::from_str_radix(rest, 16) {
                return (LiteralKind::Hexadecimal, n.to_string());
            }
        }
    }

    if word.len() > 1 && word.starts_with('0') && word[1..].chars().all(|c| ('0'..='7').contains(&c))
    {
        if let Ok(n) = i64::from_str_radix(&word[1..], 8) {
            return (LiteralKind::Octal, n.to_string());
        }
    }

    if let Ok(n) = word.parse::<i64>() {
        return (LiteralKind::Integer, n.to_string());
    }

    if is_decimal_shape(word) && word.parse::<f64>().is_ok() {
        return (LiteralKind::Decimal, word.to_string());
    }

    (LiteralKind::UnquotedString, word.to_string())
}

fn strip_hex_prefix(word: &str) -> Option<&str> {
    word.strip_prefix("0x")
        .or_else(|| word.strip_prefix("0X"))
        .or_else(|| word.strip_prefix("&h"))
        .or_else(|| word.strip_prefix("&H"))
}

/// Validates the coefficient / significand / exponent shape of a decimal
/// number: `[+-]? digits ( '.' digits )? ( [eE] [+-]? digits )?`
fn is_decimal_shape(word: &str) -> bool {
    let mut chars = word.chars().peekable();
    if matches!(chars.peek(), Some('+') | Some('-')) {
        chars.next();
    }
    let mut saw_digit = false;
    while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
        chars.next();
        saw_digit = true;
    }
    if !saw_digit {
        return false;
    }
    if chars.peek() == Some(&'.') {
        chars.next();
        let mut saw_fraction = false;
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
            chars.next();
            saw_fraction = true;
        }
        if !saw_fraction {
            return false;
        }
    }
    if matches!(chars.peek(), Some('e') | Some('E')) {
        chars.next();
        if matches!(chars.peek(), Some('+') | Some('-')) {
            chars.next();
        }
        let mut saw_exponent = false;
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
            chars.next();
            saw_exponent = true;
        }
        if !saw_exponent {
            return false;
        }
    }
    chars.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn significant(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .filter(|t| {
                !t.is_whitespace()
                    && t.kind != TokenKind::Comment
                    && t.kind != TokenKind::Newline
                    && t.kind != TokenKind::Eof
            })
            .collect()
    }

    #[test]
    fn test_structural_tokens() {
        assert_eq!(
            kinds("{}[],:="),
            vec![
                TokenKind::ObjectStart,
                TokenKind::ObjectEnd,
                TokenKind::ArrayStart,
                TokenKind::ArrayEnd,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Assign,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_plus_assign() {
        assert_eq!(
            kinds("a += 1")[1..4],
            [
                TokenKind::Literal(LiteralKind::Whitespace),
                TokenKind::PlusAssign,
                TokenKind::Literal(LiteralKind::Whitespace),
            ]
        );
    }

    #[test]
    fn test_newline_is_a_token() {
        assert_eq!(
            kinds("a\nb"),
            vec![
                TokenKind::Literal(LiteralKind::UnquotedString),
                TokenKind::Newline,
                TokenKind::Literal(LiteralKind::UnquotedString),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_crlf_collapses_to_one_newline() {
        assert_eq!(
            kinds("a\r\nb"),
            vec![
                TokenKind::Literal(LiteralKind::UnquotedString),
                TokenKind::Newline,
                TokenKind::Literal(LiteralKind::UnquotedString),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_whitespace_collapsed_but_preserved() {
        let tokens = tokenize("a  \t b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Literal(LiteralKind::Whitespace));
        assert_eq!(tokens[1].source, "  \t ");
    }

    #[test]
    fn test_comments() {
        let tokens = tokenize("a # one\nb // two").unwrap();
        let comments: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Comment)
            .collect();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].value, "# one");
        assert_eq!(comments[1].value, "// two");
    }

    #[test]
    fn test_comment_markers_inside_quoted_strings() {
        let tokens = significant(r##"a = "x # y // z""##);
        assert_eq!(
            tokens[2].kind,
            TokenKind::Literal(LiteralKind::QuotedString)
        );
        assert_eq!(tokens[2].value, "x # y // z");
    }

    #[test]
    fn test_quoted_string_escapes() {
        let tokens = significant(r#"a = "x\n\t\"\\A""#);
        assert_eq!(tokens[2].value, "x\n\t\"\\A");
    }

    #[test]
    fn test_single_quoted_string() {
        let tokens = significant("a = 'hi there'");
        assert_eq!(
            tokens[2].kind,
            TokenKind::Literal(LiteralKind::QuotedString)
        );
        assert_eq!(tokens[2].value, "hi there");
    }

    #[test]
    fn test_triple_quoted_string_is_raw() {
        let tokens = significant("a = \"\"\"line1\nline2\\n\"\"\"");
        assert_eq!(
            tokens[2].kind,
            TokenKind::Literal(LiteralKind::TripleQuotedString)
        );
        assert_eq!(tokens[2].value, "line1\nline2\\n");
    }

    #[test]
    fn test_unterminated_string_errors() {
        assert!(matches!(
            tokenize("a = \"oops"),
            Err(LexError::UnterminatedString { .. })
        ));
        assert!(matches!(
            tokenize("a = \"\"\"oops"),
            Err(LexError::UnterminatedTripleQuotedString { .. })
        ));
        assert!(matches!(
            tokenize("a = ${oops"),
            Err(LexError::UnterminatedSubstitution { .. })
        ));
    }

    #[test]
    fn test_invalid_escape_errors() {
        assert!(matches!(
            tokenize(r#"a = "\q""#),
            Err(LexError::InvalidEscape { .. })
        ));
        assert!(matches!(
            tokenize(r#"a = "\u00ZZ""#),
            Err(LexError::InvalidUnicodeEscape { .. })
        ));
    }

    #[test]
    fn test_keywords() {
        for (text, kind, value) in [
            ("true", LiteralKind::Boolean, "true"),
            ("yes", LiteralKind::Boolean, "true"),
            ("false", LiteralKind::Boolean, "false"),
            ("no", LiteralKind::Boolean, "false"),
            ("null", LiteralKind::Null, "null"),
            ("NaN", LiteralKind::Decimal, "NaN"),
            ("infinity", LiteralKind::Decimal, "infinity"),
            ("+infinity", LiteralKind::Decimal, "+infinity"),
            ("-infinity", LiteralKind::Decimal, "-infinity"),
        ] {
            let tokens = tokenize(text).unwrap();
            assert_eq!(tokens[0].kind, TokenKind::Literal(kind), "{}", text);
            assert_eq!(tokens[0].value, value, "{}", text);
        }
    }

    #[test]
    fn test_integer_literals() {
        let tokens = tokenize("42").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Literal(LiteralKind::Integer));
        assert_eq!(tokens[0].value, "42");

        let tokens = tokenize("-7").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Literal(LiteralKind::Integer));
        assert_eq!(tokens[0].value, "-7");

        let tokens = tokenize("+5").unwrap();
        assert_eq!(tokens[0].value, "5");
    }

    #[test]
    fn test_hexadecimal_literals() {
        for text in ["0x1F", "0X1f", "&h1F", "&H1f"] {
            let tokens = tokenize(text).unwrap();
            assert_eq!(
                tokens[0].kind,
                TokenKind::Literal(LiteralKind::Hexadecimal),
                "{}",
                text
            );
            assert_eq!(tokens[0].value, "31");
            assert_eq!(tokens[0].source, text);
        }
    }

    #[test]
    fn test_ampersand_is_reserved_outside_hex_prefix() {
        for text in ["&", "&x1F", "&h", "&hZZ"] {
            let err = tokenize(text).unwrap_err();
            assert!(
                matches!(err, LexError::UnexpectedCharacter { character: '&', .. }),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_octal_literals() {
        let tokens = tokenize("017").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Literal(LiteralKind::Octal));
        assert_eq!(tokens[0].value, "15");
    }

    #[test]
    fn test_decimal_literals() {
        for text in ["1.5", "-0.25", "2e10", "3.14E-2"] {
            let tokens = tokenize(text).unwrap();
            assert_eq!(
                tokens[0].kind,
                TokenKind::Literal(LiteralKind::Decimal),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_number_like_words_fall_through_to_strings() {
        for text in ["1.2.3", "0x", "10s", "1.5e", "1.", "192.168.0.1", "0xZZ"] {
            let tokens = tokenize(text).unwrap();
            assert_eq!(
                tokens[0].kind,
                TokenKind::Literal(LiteralKind::UnquotedString),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_huge_integer_degrades_to_decimal() {
        let tokens = tokenize("99999999999999999999").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Literal(LiteralKind::Decimal));
    }

    #[test]
    fn test_substitution_tokens() {
        let tokens = tokenize("${a.b}").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Substitution { required: true });
        assert_eq!(tokens[0].value, "a.b");

        let tokens = tokenize("${? a.b }").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Substitution { required: false });
        assert_eq!(tokens[0].value, "a.b");
    }

    #[test]
    fn test_include_bare() {
        let tokens = tokenize("include \"foo.conf\"").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Include {
                kind: IncludeKind::Unspecified,
                required: false,
                optional: false,
            }
        );
        assert_eq!(tokens[0].value, "foo.conf");
    }

    #[test]
    fn test_include_modifiers() {
        let tokens = tokenize("include required(file(\"x.conf\"))").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Include {
                kind: IncludeKind::File,
                required: true,
                optional: false,
            }
        );
        assert_eq!(tokens[0].value, "x.conf");

        let tokens = tokenize("include url(\"http://x/y\")").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Include {
                kind: IncludeKind::Url,
                required: false,
                optional: false,
            }
        );

        let tokens = tokenize("include classpath(\"res.conf\")").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Include {
                kind: IncludeKind::Resource,
                required: false,
                optional: false,
            }
        );
    }

    #[test]
    fn test_optional_include() {
        let tokens = tokenize("include? \"maybe.conf\"").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Include {
                kind: IncludeKind::Unspecified,
                required: false,
                optional: true,
            }
        );
    }

    #[test]
    fn test_malformed_include_falls_back_to_unquoted_string() {
        // "include required file(not valid)" is not a full include grammar,
        // so the keyword degrades to a plain unquoted literal
        let tokens = significant("include required file(x)");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Literal(LiteralKind::UnquotedString)
        );
        assert_eq!(tokens[0].value, "include");

        // `include` used as an ordinary key
        let tokens = significant("include = 5");
        assert_eq!(tokens[0].value, "include");
        assert_eq!(tokens[1].kind, TokenKind::Assign);
    }

    #[test]
    fn test_reserved_character_outside_token_is_an_error() {
        assert!(matches!(
            tokenize("a = @b"),
            Err(LexError::UnexpectedCharacter { character: '@', .. })
        ));
    }

    #[test]
    fn test_positions_are_one_based() {
        let tokens = tokenize("a\n bb").unwrap();
        assert_eq!(tokens[0].position, Position::at(1, 1));
        // newline token
        assert_eq!(tokens[1].position, Position::at(1, 2));
        // leading whitespace on line 2
        assert_eq!(tokens[2].position, Position::at(2, 1));
        // "bb"
        assert_eq!(tokens[3].position, Position::at(2, 2));
    }

    #[test]
    fn test_unquoted_run_stops_at_reserved() {
        let tokens = significant("key:value");
        assert_eq!(tokens[0].value, "key");
        assert_eq!(tokens[1].kind, TokenKind::Colon);
        assert_eq!(tokens[2].value, "value");
    }
}
