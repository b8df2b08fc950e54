//! Json+ recursive-descent parser
//!
//! Consumes the token list from the lexer and builds the raw tree: an
//! object (braced or headless) or an array at the root, members with full
//! key paths and value histories below it. Substitutions are registered in
//! the shared [`SubstitutionRegistry`] as they are encountered; include
//! directives are fetched, parsed with a nested parser and spliced into the
//! enclosing object before parsing continues.

use crate::error::{JsonPlusError, ResolveError, SyntaxError};
use crate::lexer::{tokenize, IncludeKind, Token, TokenKind};
use crate::node::{Literal, Node, ObjectNode, SubstitutionRegistry, Value};
use crate::path::KeyPath;
use std::collections::HashMap;

/// Default limit on object/array nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default limit on include recursion depth
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 50;

/// Provides the text of included documents.
///
/// The parser calls this for every include directive it encounters; the
/// fetcher decides what a locator means. Fetch errors are reported as a
/// human-readable reason string and mapped to an error or a no-op depending
/// on the directive's modifiers.
pub trait IncludeFetcher {
    fn fetch(&self, kind: IncludeKind, locator: &str) -> Result<String, String>;
}

/// A fetcher that resolves every include to an empty document, so bare and
/// `include?` directives become no-ops and `required(...)` directives fail
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyFetcher;

impl IncludeFetcher for EmptyFetcher {
    fn fetch(&self, _kind: IncludeKind, _locator: &str) -> Result<String, String> {
        Ok(String::new())
    }
}

/// A fetcher backed by an in-memory map from locator to document text
#[derive(Debug, Clone, Default)]
pub struct MapFetcher {
    documents: HashMap<String, String>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: &str, text: &str) {
        self.documents.insert(locator.to_string(), text.to_string());
    }

    /// Builder-style insertion
    pub fn with(mut self, locator: &str, text: &str) -> Self {
        self.insert(locator, text);
        self
    }
}

impl IncludeFetcher for MapFetcher {
    fn fetch(&self, _kind: IncludeKind, locator: &str) -> Result<String, String> {
        self.documents
            .get(locator)
            .cloned()
            .ok_or_else(|| format!("no document registered for '{locator}'"))
    }
}

/// The root of a parsed document
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Object(ObjectNode),
    Array(Vec<Value>),
}

/// Separator bookkeeping for object bodies and arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sep {
    /// Start of the block; a comma here is a leading separator
    Start,
    /// Directly after an element; a separator is required before the next
    NeedSeparator,
    /// A newline followed the last element
    Separated,
    /// A comma followed the last element; another comma is repeated
    AfterComma,
}

/// The Json+ parser
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    registry: &'a mut SubstitutionRegistry,
    fetcher: &'a dyn IncludeFetcher,
    /// Full path of the field whose value is currently being parsed
    path: KeyPath,
    depth: usize,
    array_depth: usize,
    include_depth: usize,
    max_depth: usize,
    max_include_depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a token list ending in `Eof`
    pub fn new(
        tokens: Vec<Token>,
        registry: &'a mut SubstitutionRegistry,
        fetcher: &'a dyn IncludeFetcher,
    ) -> Self {
        let mut tokens = tokens;
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            tokens.push(Token::new(
                TokenKind::Eof,
                String::new(),
                String::new(),
                Default::default(),
            ));
        }
        Self {
            tokens,
            pos: 0,
            registry,
            fetcher,
            path: KeyPath::new(),
            depth: 0,
            array_depth: 0,
            include_depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Overrides the nesting and include depth limits
    pub fn with_limits(mut self, max_depth: usize, max_include_depth: usize) -> Self {
        self.max_depth = max_depth;
        self.max_include_depth = max_include_depth;
        self
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Skips whitespace and comments, but not newlines
    fn skip_inline(&mut self) {
        while self.peek().is_whitespace() || self.peek().kind == TokenKind::Comment {
            self.advance();
        }
    }

    /// Skips whitespace, comments and newlines
    fn skip_blank(&mut self) {
        while self.peek().is_whitespace()
            || matches!(self.peek().kind, TokenKind::Comment | TokenKind::Newline)
        {
            self.advance();
        }
    }

    /// Parses a complete document: a root array, a braced root object, or a
    /// headless object body
    pub fn parse(&mut self) -> Result<Document, JsonPlusError> {
        self.skip_blank();
        match self.peek().kind {
            TokenKind::Eof => Err(SyntaxError::EmptyDocument.into()),
            TokenKind::ArrayStart => {
                let elements = self.parse_array()?;
                self.expect_document_end()?;
                Ok(Document::Array(elements))
            }
            TokenKind::ObjectStart => {
                let object = self.parse_braced_object()?;
                self.expect_document_end()?;
                Ok(Document::Object(object))
            }
            _ => Ok(Document::Object(self.parse_object_body(true)?)),
        }
    }

    fn expect_document_end(&mut self) -> Result<(), JsonPlusError> {
        self.skip_blank();
        if self.peek().kind != TokenKind::Eof {
            return Err(SyntaxError::TrailingContent {
                position: self.peek().position,
            }
            .into());
        }
        Ok(())
    }

    /// Parses object members until the terminator: `Eof` for the headless
    /// root form, `}` otherwise (left unconsumed for the caller)
    fn parse_object_body(&mut self, root: bool) -> Result<ObjectNode, JsonPlusError> {
        let mut object = ObjectNode::new();
        let mut state = Sep::Start;
        loop {
            self.skip_inline();
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Newline => {
                    self.advance();
                    if state == Sep::NeedSeparator {
                        state = Sep::Separated;
                    }
                }
                TokenKind::Comma => {
                    match state {
                        Sep::Start => {
                            return Err(SyntaxError::LeadingSeparator {
                                position: token.position,
                            }
                            .into());
                        }
                        Sep::AfterComma => {
                            return Err(SyntaxError::RepeatedSeparator {
                                position: token.position,
                            }
                            .into());
                        }
                        _ => {}
                    }
                    self.advance();
                    state = Sep::AfterComma;
                }
                TokenKind::Eof => {
                    if root {
                        return Ok(object);
                    }
                    return Err(SyntaxError::UnexpectedToken {
                        token: token.kind.type_name().to_string(),
                        position: token.position,
                        expected: "'}'".to_string(),
                    }
                    .into());
                }
                TokenKind::ObjectEnd => {
                    if root {
                        return Err(SyntaxError::UnexpectedToken {
                            token: token.kind.type_name().to_string(),
                            position: token.position,
                            expected: "a key".to_string(),
                        }
                        .into());
                    }
                    return Ok(object);
                }
                _ => {
                    if state == Sep::NeedSeparator {
                        return Err(SyntaxError::UnexpectedToken {
                            token: token.kind.type_name().to_string(),
                            position: token.position,
                            expected: "',' or newline".to_string(),
                        }
                        .into());
                    }
                    self.parse_member(&mut object, root)?;
                    state = Sep::NeedSeparator;
                }
            }
        }
    }

    /// Parses one member: an include directive, or a key path followed by
    /// `:`, `=`, `+=` or an object-shorthand brace
    fn parse_member(&mut self, object: &mut ObjectNode, root: bool) -> Result<(), JsonPlusError> {
        let first = self.peek().clone();
        if let TokenKind::Include {
            kind,
            required,
            optional,
        } = first.kind
        {
            self.advance();
            return self.expand_include(object, kind, required, optional, &first);
        }

        let mut run: Vec<Token> = Vec::new();
        while self.peek().is_literal()
            || matches!(self.peek().kind, TokenKind::Substitution { .. })
        {
            run.push(self.advance());
        }

        let next = self.peek().clone();
        match next.kind {
            TokenKind::Colon | TokenKind::Assign | TokenKind::PlusAssign | TokenKind::ObjectStart
                if !run.is_empty() => {}
            TokenKind::Colon | TokenKind::Assign | TokenKind::PlusAssign => {
                return Err(SyntaxError::MissingKey {
                    position: next.position,
                }
                .into());
            }
            _ if run.is_empty() => {
                return Err(SyntaxError::UnexpectedToken {
                    token: next.kind.type_name().to_string(),
                    position: next.position,
                    expected: "a key".to_string(),
                }
                .into());
            }
            TokenKind::Newline | TokenKind::Comma | TokenKind::Eof | TokenKind::Comment
                if root && object.members.is_empty() =>
            {
                return Err(SyntaxError::BareValueDocument {
                    position: first.position,
                }
                .into());
            }
            _ => {
                return Err(SyntaxError::UnexpectedToken {
                    token: next.kind.type_name().to_string(),
                    position: next.position,
                    expected: "':', '=', '+=' or '{'".to_string(),
                }
                .into());
            }
        }

        let key_path = KeyPath::from_tokens(&run)?;
        if key_path.is_empty() {
            return Err(SyntaxError::MissingKey {
                position: first.position,
            }
            .into());
        }
        let full = key_path.prefixed(&self.path);

        let value = match next.kind {
            TokenKind::ObjectStart => {
                let saved = std::mem::replace(&mut self.path, full.clone());
                let result = self.parse_braced_object();
                self.path = saved;
                Value::single(Node::Object(result?))
            }
            TokenKind::Colon | TokenKind::Assign => {
                self.advance();
                let saved = std::mem::replace(&mut self.path, full.clone());
                let result = self.parse_value();
                self.path = saved;
                result?
            }
            TokenKind::PlusAssign => {
                self.advance();
                // k += v desugars to k = ${?k} [v]
                let sub = self.registry.register(
                    full.clone(),
                    false,
                    next.position,
                    Some(full.clone()),
                    self.array_depth > 0,
                );
                let saved = std::mem::replace(&mut self.path, full.clone());
                let result = self.parse_value();
                self.path = saved;
                let element = result?;
                let mut value = Value::new();
                value.append(Node::Substitution(sub), next.position, &full)?;
                value.append(Node::Array(vec![element]), next.position, &full)?;
                value
            }
            _ => unreachable!("member introducer validated above"),
        };

        self.assign_at(object, &key_path, value);
        Ok(())
    }

    /// Assigns `value` at the (possibly dotted) key path, creating
    /// intermediate objects on the way down
    fn assign_at(&mut self, object: &mut ObjectNode, key_path: &KeyPath, value: Value) {
        let Some((first, rest)) = key_path.keys().split_first() else {
            return;
        };
        let mut full = self.path.child(first);
        let mut member = object.member_mut(first, &full);
        for key in rest {
            full.push(key.clone());
            member = member.nested_object_mut().member_mut(key, &full);
        }
        member.assign(value);
    }

    /// Parses a value: a concatenation of literals, substitutions, arrays
    /// and objects. The value may start on a later line, but once started it
    /// ends at a newline, comma, comment, closing bracket or end of file.
    fn parse_value(&mut self) -> Result<Value, JsonPlusError> {
        self.skip_blank();
        let mut value = Value::new();
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Literal(_) => {
                    self.advance();
                    if let Some(literal) = Literal::from_token(&token) {
                        value.append(Node::Literal(literal), token.position, &self.path)?;
                    }
                }
                TokenKind::Substitution { required } => {
                    self.advance();
                    let path = KeyPath::parse(&token.value).map_err(|_| {
                        SyntaxError::InvalidPathExpression {
                            text: token.value.clone(),
                            position: token.position,
                        }
                    })?;
                    let owner = if self.path.is_empty() {
                        None
                    } else {
                        Some(self.path.clone())
                    };
                    let id = self.registry.register(
                        path,
                        required,
                        token.position,
                        owner,
                        self.array_depth > 0,
                    );
                    value.append(Node::Substitution(id), token.position, &self.path)?;
                }
                TokenKind::ArrayStart => {
                    let elements = self.parse_array()?;
                    value.append(Node::Array(elements), token.position, &self.path)?;
                }
                TokenKind::ObjectStart => {
                    let object = self.parse_braced_object()?;
                    value.append(Node::Object(object), token.position, &self.path)?;
                }
                TokenKind::Include {
                    kind,
                    required,
                    optional,
                } => {
                    self.advance();
                    let node = match self.include_document(kind, required, optional, &token)? {
                        Some(Document::Object(included)) => Node::Object(included),
                        Some(Document::Array(elements)) => Node::Array(elements),
                        None => Node::Empty,
                    };
                    value.append(node, token.position, &self.path)?;
                }
                _ => break,
            }
        }
        value.trim_whitespace();
        if value.is_empty() {
            let token = self.peek();
            return Err(SyntaxError::UnexpectedToken {
                token: token.kind.type_name().to_string(),
                position: token.position,
                expected: "a value".to_string(),
            }
            .into());
        }
        Ok(value)
    }

    fn parse_array(&mut self) -> Result<Vec<Value>, JsonPlusError> {
        let open = self.advance();
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(SyntaxError::MaxDepthExceeded {
                depth: self.max_depth,
                position: open.position,
            }
            .into());
        }
        self.array_depth += 1;

        let mut elements = Vec::new();
        let mut state = Sep::Start;
        let result: Result<(), JsonPlusError> = loop {
            self.skip_inline();
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Newline => {
                    self.advance();
                    if state == Sep::NeedSeparator {
                        state = Sep::Separated;
                    }
                }
                TokenKind::Comma => {
                    match state {
                        Sep::Start => {
                            break Err(SyntaxError::LeadingSeparator {
                                position: token.position,
                            }
                            .into());
                        }
                        Sep::AfterComma => {
                            break Err(SyntaxError::RepeatedSeparator {
                                position: token.position,
                            }
                            .into());
                        }
                        _ => {}
                    }
                    self.advance();
                    state = Sep::AfterComma;
                }
                TokenKind::ArrayEnd => {
                    self.advance();
                    break Ok(());
                }
                TokenKind::Eof => {
                    break Err(SyntaxError::UnexpectedToken {
                        token: token.kind.type_name().to_string(),
                        position: token.position,
                        expected: "']'".to_string(),
                    }
                    .into());
                }
                // an included array document splices its elements in place
                TokenKind::Include {
                    kind,
                    required,
                    optional,
                } if state != Sep::NeedSeparator => {
                    self.advance();
                    match self.include_document(kind, required, optional, &token) {
                        Ok(Some(Document::Array(included))) => elements.extend(included),
                        Ok(Some(Document::Object(included))) => {
                            elements.push(Value::single(Node::Object(included)));
                        }
                        Ok(None) => {}
                        Err(e) => break Err(e),
                    }
                    state = Sep::NeedSeparator;
                }
                _ => {
                    if state == Sep::NeedSeparator {
                        break Err(SyntaxError::UnexpectedToken {
                            token: token.kind.type_name().to_string(),
                            position: token.position,
                            expected: "',' or newline".to_string(),
                        }
                        .into());
                    }
                    match self.parse_value() {
                        Ok(element) => elements.push(element),
                        Err(e) => break Err(e),
                    }
                    state = Sep::NeedSeparator;
                }
            }
        };

        self.array_depth -= 1;
        self.depth -= 1;
        result?;
        Ok(elements)
    }

    fn parse_braced_object(&mut self) -> Result<ObjectNode, JsonPlusError> {
        let open = self.advance();
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(SyntaxError::MaxDepthExceeded {
                depth: self.max_depth,
                position: open.position,
            }
            .into());
        }
        let object = self.parse_object_body(false)?;
        self.advance(); // the closing brace
        self.depth -= 1;
        Ok(object)
    }

    /// Fetches, parses and splices an included document into the enclosing
    /// object. Only object documents can splice at member position.
    fn expand_include(
        &mut self,
        object: &mut ObjectNode,
        kind: IncludeKind,
        required: bool,
        optional: bool,
        token: &Token,
    ) -> Result<(), JsonPlusError> {
        let Some(document) = self.include_document(kind, required, optional, token)? else {
            return Ok(());
        };
        match document {
            Document::Object(included) => {
                object.merge_from(included);
                Ok(())
            }
            Document::Array(_) => Err(SyntaxError::IncludeNotAnObject {
                position: token.position,
                path: self.path.to_string(),
            }
            .into()),
        }
    }

    /// Fetches and parses an included document. Substitutions and member
    /// paths from the included document are re-rooted under the include
    /// site's path. `None` means the include produced nothing to splice.
    fn include_document(
        &mut self,
        kind: IncludeKind,
        required: bool,
        optional: bool,
        token: &Token,
    ) -> Result<Option<Document>, JsonPlusError> {
        let locator = token.value.clone();
        if self.include_depth >= self.max_include_depth {
            return Err(SyntaxError::MaxIncludeDepthExceeded {
                depth: self.max_include_depth,
                position: token.position,
            }
            .into());
        }

        let source = match self.fetcher.fetch(kind, &locator) {
            Ok(text) => text,
            Err(reason) => {
                if optional {
                    return Ok(None);
                }
                if required {
                    return Err(ResolveError::RequiredIncludeFailed {
                        locator,
                        position: token.position,
                    }
                    .into());
                }
                return Err(ResolveError::IncludeFailed {
                    locator,
                    reason,
                    position: token.position,
                }
                .into());
            }
        };

        let tokens = tokenize(&source)?;
        let significant = tokens.iter().any(|t| {
            !t.is_whitespace()
                && !matches!(t.kind, TokenKind::Comment | TokenKind::Newline | TokenKind::Eof)
        });
        if !significant {
            if required {
                return Err(ResolveError::RequiredIncludeFailed {
                    locator,
                    position: token.position,
                }
                .into());
            }
            return Ok(None);
        }

        let before = self.registry.len();
        let mut nested = Parser {
            tokens,
            pos: 0,
            registry: &mut *self.registry,
            fetcher: self.fetcher,
            path: KeyPath::new(),
            depth: 0,
            array_depth: 0,
            include_depth: self.include_depth + 1,
            max_depth: self.max_depth,
            max_include_depth: self.max_include_depth,
        };
        let mut document = nested.parse()?;
        if let Document::Object(included) = &mut document {
            if !self.path.is_empty() {
                included.prefix_paths(&self.path);
            }
        }
        self.registry.reroot(before, &self.path, self.array_depth > 0);
        Ok(Some(document))
    }
}
