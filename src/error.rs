//! Error types and position tracking for Json+ parsing
//!
//! Three error kinds, matching the three phases of a parse: lexical errors
//! from the tokenizer, syntax errors from the parser, and resolution errors
//! from the substitution resolver. Every kind carries a source position where
//! one is known; resolution errors additionally carry the dotted path of the
//! field being resolved.

use std::fmt;
use thiserror::Error;

/// Represents a position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl Position {
    /// Creates a new position at the start of input
    pub fn new() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Creates a position at the given line and column
    pub fn at(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Advances the position by one character
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Main error type for Json+ parsing operations
#[derive(Debug, Error)]
pub enum JsonPlusError {
    /// Lexical analysis error
    #[error("Lexical error: {0}")]
    Lex(#[from] LexError),

    /// Parsing error
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// Substitution resolution error
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),
}

/// Lexical analysis errors
#[derive(Debug, Error)]
pub enum LexError {
    /// Unexpected character outside any recognized token start
    #[error("Unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: Position },

    /// String literal not properly terminated
    #[error("Unterminated string at {position}")]
    UnterminatedString { position: Position },

    /// Triple-quoted string not properly terminated
    #[error("Unterminated triple-quoted string at {position}")]
    UnterminatedTripleQuotedString { position: Position },

    /// Substitution opened with `${` but never closed
    #[error("Unterminated substitution at {position}")]
    UnterminatedSubstitution { position: Position },

    /// Invalid escape sequence in string
    #[error("Invalid escape sequence '\\{sequence}' at {position}")]
    InvalidEscape {
        sequence: String,
        position: Position,
    },

    /// Invalid Unicode escape sequence
    #[error("Invalid unicode escape '\\u{sequence}' at {position}")]
    InvalidUnicodeEscape {
        sequence: String,
        position: Position,
    },
}

/// Parsing errors
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// Unexpected token encountered
    #[error("Unexpected token {token} at {position}, expected {expected}")]
    UnexpectedToken {
        token: String,
        position: Position,
        expected: String,
    },

    /// The document contains no members at all
    #[error("Empty document")]
    EmptyDocument,

    /// The document consists of a bare literal or substitution
    #[error("Document contains only a bare value at {position}")]
    BareValueDocument { position: Position },

    /// Content found after the closing bracket of a root array or object
    #[error("Unexpected content after the document root at {position}")]
    TrailingContent { position: Position },

    /// A separator comma with no element before it
    #[error("Leading separator at {position}")]
    LeadingSeparator { position: Position },

    /// Two separator commas in a row
    #[error("Repeated separator at {position}")]
    RepeatedSeparator { position: Position },

    /// A member key was expected but none was found
    #[error("Missing key at {position}")]
    MissingKey { position: Position },

    /// Triple-quoted strings are not permitted as path segments
    #[error("Triple-quoted string in path at {position}")]
    TripleQuotedKey { position: Position },

    /// A path segment between dots is empty
    #[error("Empty key in path '{text}' at {position}")]
    EmptyKey { text: String, position: Position },

    /// The text of a path expression could not be parsed
    #[error("Invalid path expression '{text}' at {position}")]
    InvalidPathExpression { text: String, position: Position },

    /// Substitutions are not allowed in keys
    #[error("Substitution in key at {position}")]
    SubstitutionInKey { position: Position },

    /// Adjacent value elements of incompatible concrete types
    #[error("Cannot concatenate {found} with {established} at {position} (path: {path})")]
    MixedConcatenation {
        established: String,
        found: String,
        position: Position,
        path: String,
    },

    /// A bare include directive spliced something other than an object
    #[error("Include at {position} does not produce an object (path: {path})")]
    IncludeNotAnObject { position: Position, path: String },

    /// Maximum object/array nesting depth exceeded
    #[error("Maximum nesting depth {depth} exceeded at {position}")]
    MaxDepthExceeded { depth: usize, position: Position },

    /// Maximum include recursion depth exceeded
    #[error("Maximum include depth {depth} exceeded at {position}")]
    MaxIncludeDepthExceeded { depth: usize, position: Position },
}

/// Substitution resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A required substitution has no value anywhere
    #[error("Unresolved substitution ${{{path}}} at {position}")]
    UnresolvedSubstitution { path: String, position: Position },

    /// A self-referential substitution with no older value to fall back to
    #[error("Self-referential substitution ${{{path}}} at {position} has no previous value")]
    UnresolvedSelfReference { path: String, position: Position },

    /// Self-reference inside an array element
    #[error("Self-referential substitution ${{{path}}} at {position} inside an array")]
    SelfReferenceInArray { path: String, position: Position },

    /// A field referencing an object that encloses it
    #[error("Substitution ${{{path}}} at {position} refers to an ancestor of field '{owner}'")]
    AncestorReference {
        path: String,
        owner: String,
        position: Position,
    },

    /// A cycle in the substitution dependency graph
    #[error("Cyclic substitution chain {chain} at {position}")]
    CyclicSubstitution { chain: String, position: Position },

    /// Type mismatch discovered after a substitution resolved
    #[error("Cannot concatenate {found} with {established} at {position} (path: {path})")]
    TypeMismatch {
        established: String,
        found: String,
        position: Position,
        path: String,
    },

    /// A non-optional include whose fetch failed
    #[error("Include of '{locator}' failed at {position}: {reason}")]
    IncludeFailed {
        locator: String,
        reason: String,
        position: Position,
    },

    /// A `required(...)` include that fetched empty content
    #[error("Required include of '{locator}' at {position} produced no content")]
    RequiredIncludeFailed { locator: String, position: Position },
}
