//! # Json+
//!
//! A parser and resolver for Json+, a superset of JSON aimed at hand-written
//! configuration: unquoted keys and strings, `#` and `//` comments, newlines
//! as separators, object merging across repeated definitions, value
//! concatenation, `${path}` substitutions with environment fallback, `+=`
//! appends and include directives.
//!
//! ## Basic Usage
//!
//! ```rust
//! let config = jsonplus::parse(r#"
//!     server {
//!         host = localhost
//!         port = 8080
//!     }
//!     server.port = 9090           # later definitions win
//!     url = "http://"${server.host}
//! "#)?;
//!
//! assert_eq!(config.get_i64("server.port"), Some(9090));
//! assert_eq!(config.get_str("url"), Some("http://localhost"));
//! # Ok::<(), jsonplus::JsonPlusError>(())
//! ```
//!
//! ## Includes and options
//!
//! Include directives are resolved through an [`IncludeFetcher`]; the
//! default fetcher treats every include as empty. [`ParseOptions`] carries
//! the fetcher, the environment used for substitution fallback and the
//! depth limits.
//!
//! ```rust
//! use jsonplus::{MapFetcher, ParseOptions};
//!
//! let fetcher = MapFetcher::new().with("defaults.conf", "timeout = 30s");
//! let options = ParseOptions::new().with_include_fetcher(fetcher);
//! let config = jsonplus::parse_with("include \"defaults.conf\"", &options)?;
//!
//! assert_eq!(
//!     config.get_duration("timeout"),
//!     Some(std::time::Duration::from_secs(30))
//! );
//! # Ok::<(), jsonplus::JsonPlusError>(())
//! ```

pub mod error;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod path;
pub mod resolver;
pub mod value;

pub use error::{JsonPlusError, LexError, Position, ResolveError, SyntaxError};
pub use lexer::{tokenize, IncludeKind, LiteralKind, Token, TokenKind};
pub use parser::{Document, EmptyFetcher, IncludeFetcher, MapFetcher, Parser};
pub use path::KeyPath;
pub use resolver::{EnvLookup, MapEnv, Resolver, SystemEnv};
pub use value::{Config, ConfigValue};

use node::SubstitutionRegistry;

/// Options controlling parsing and resolution
pub struct ParseOptions {
    include_fetcher: Box<dyn IncludeFetcher>,
    env: Box<dyn EnvLookup>,
    resolve_env: bool,
    max_nesting_depth: usize,
    max_include_depth: usize,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self {
            include_fetcher: Box::new(EmptyFetcher),
            env: Box::new(SystemEnv),
            resolve_env: true,
            max_nesting_depth: parser::DEFAULT_MAX_DEPTH,
            max_include_depth: parser::DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Sets the fetcher used to load included documents
    pub fn with_include_fetcher(mut self, fetcher: impl IncludeFetcher + 'static) -> Self {
        self.include_fetcher = Box::new(fetcher);
        self
    }

    /// Sets the environment used as the substitution fallback
    pub fn with_env(mut self, env: impl EnvLookup + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Enables or disables the environment fallback entirely
    pub fn with_env_resolution(mut self, resolve_env: bool) -> Self {
        self.resolve_env = resolve_env;
        self
    }

    /// Sets the maximum object/array nesting depth
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Sets the maximum include recursion depth
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a Json+ document with default options
pub fn parse(source: &str) -> Result<Config, JsonPlusError> {
    parse_with(source, &ParseOptions::new())
}

/// Parses a Json+ document: tokenize, build the raw tree, resolve every
/// substitution, then project the tree into plain values
pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Config, JsonPlusError> {
    let tokens = tokenize(source)?;
    let mut registry = SubstitutionRegistry::new();
    let mut parser = Parser::new(tokens, &mut registry, options.include_fetcher.as_ref())
        .with_limits(options.max_nesting_depth, options.max_include_depth);
    let document = parser.parse()?;

    let mut resolver = Resolver::new(
        &document,
        &mut registry,
        options.env.as_ref(),
        options.resolve_env,
    );
    resolver.run()?;
    let root = value::project(&mut resolver, &document)?;
    Ok(Config::from_root(root))
}
