//! Resolved configuration values
//!
//! After substitution resolution the raw tree is projected into
//! [`ConfigValue`], a closed JSON-like value type with insertion-ordered
//! objects. Fields and array elements whose value resolved to nothing are
//! omitted here. [`Config`] wraps the root value with dotted-path access,
//! unit-aware coercions and a renderer whose output parses back to an
//! equivalent document.

use crate::error::ResolveError;
use crate::lexer::LiteralKind;
use crate::node::{Literal, ObjectNode, Resolved};
use crate::parser::Document;
use crate::path::{needs_quoting, quote_string, KeyPath};
use crate::resolver::Resolver;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// A fully resolved configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(IndexMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Booleans, plus the keyword spellings when they arrive as strings
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.as_str() {
                "true" | "yes" | "on" => Some(true),
                "false" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Interprets the value as a duration. Bare numbers are milliseconds;
    /// strings take a unit suffix (`ns`, `us`, `ms`, `s`, `m`, `h`, `d` and
    /// their long forms); `infinite` is the longest representable duration.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            ConfigValue::Integer(n) if *n >= 0 => Some(Duration::from_millis(*n as u64)),
            ConfigValue::Float(f) if *f >= 0.0 => Some(Duration::from_nanos((f * 1e6) as u64)),
            ConfigValue::String(s) => parse_duration(s),
            _ => None,
        }
    }

    /// Interprets the value as a byte count. Unit suffixes ending in `B` are
    /// decimal powers (`kB` = 1000), lowercase suffixes are binary powers
    /// (`kb` = 1024).
    pub fn as_bytes(&self) -> Option<u64> {
        match self {
            ConfigValue::Integer(n) if *n >= 0 => Some(*n as u64),
            ConfigValue::String(s) => parse_bytes(s),
            _ => None,
        }
    }
}

fn split_unit(text: &str) -> (&str, &str) {
    let split = text
        .find(|c: char| c.is_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    (number.trim(), unit.trim())
}

fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text == "infinite" {
        return Some(Duration::MAX);
    }
    let (number, unit) = split_unit(text);
    let value: f64 = number.parse().ok()?;
    if value < 0.0 {
        return None;
    }
    let nanos_per_unit: f64 = match unit {
        "" | "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => 1e6,
        "ns" | "nano" | "nanos" | "nanosecond" | "nanoseconds" => 1.0,
        "us" | "micro" | "micros" | "microsecond" | "microseconds" => 1e3,
        "s" | "second" | "seconds" => 1e9,
        "m" | "minute" | "minutes" => 60e9,
        "h" | "hour" | "hours" => 3600e9,
        "d" | "day" | "days" => 86400e9,
        _ => return None,
    };
    Some(Duration::from_nanos((value * nanos_per_unit) as u64))
}

fn parse_bytes(text: &str) -> Option<u64> {
    let (number, unit) = split_unit(text.trim());
    let value: f64 = number.parse().ok()?;
    if value < 0.0 {
        return None;
    }
    let factor: f64 = match unit {
        "" | "b" | "B" | "byte" | "bytes" => 1.0,
        "kB" => 1e3,
        "kb" => 1024.0,
        "mB" | "MB" => 1e6,
        "mb" => 1024.0 * 1024.0,
        "gB" | "GB" => 1e9,
        "gb" => 1024.0 * 1024.0 * 1024.0,
        "tB" | "TB" => 1e12,
        "tb" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "pB" | "PB" => 1e15,
        "pb" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some((value * factor) as u64)
}

impl Serialize for ConfigValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ConfigValue::Null => serializer.serialize_unit(),
            ConfigValue::Bool(b) => serializer.serialize_bool(*b),
            ConfigValue::Integer(n) => serializer.serialize_i64(*n),
            ConfigValue::Float(f) => serializer.serialize_f64(*f),
            ConfigValue::String(s) => serializer.serialize_str(s),
            ConfigValue::Array(elements) => elements.serialize(serializer),
            ConfigValue::Object(map) => map.serialize(serializer),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(self, f, 0)
    }
}

fn render(value: &ConfigValue, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    match value {
        ConfigValue::Null => f.write_str("null"),
        ConfigValue::Bool(b) => write!(f, "{b}"),
        ConfigValue::Integer(n) => write!(f, "{n}"),
        ConfigValue::Float(x) => render_float(*x, f),
        ConfigValue::String(s) => f.write_str(&quote_string(s)),
        ConfigValue::Array(elements) => {
            f.write_str("[")?;
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                render(element, f, indent)?;
            }
            f.write_str("]")
        }
        ConfigValue::Object(map) => {
            if map.is_empty() {
                return f.write_str("{}");
            }
            f.write_str("{\n")?;
            let inner = indent + 2;
            for (key, value) in map {
                write!(f, "{:inner$}", "")?;
                if needs_quoting(key) {
                    f.write_str(&quote_string(key))?;
                } else {
                    f.write_str(key)?;
                }
                f.write_str(": ")?;
                render(value, f, inner)?;
                f.write_str("\n")?;
            }
            write!(f, "{:indent$}}}", "")
        }
    }
}

/// Floats render so that the text parses back as a decimal: special values
/// use the keyword spellings, everything else uses the shortest round-trip
/// form which always keeps a fractional or exponent part
fn render_float(x: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.is_nan() {
        f.write_str("NaN")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "infinity" } else { "-infinity" })
    } else {
        write!(f, "{x:?}")
    }
}

/// A resolved configuration document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Config {
    root: ConfigValue,
}

impl Config {
    pub(crate) fn from_root(root: ConfigValue) -> Self {
        Self { root }
    }

    /// The root value: an object or, for array documents, an array
    pub fn value(&self) -> &ConfigValue {
        &self.root
    }

    /// Looks up a value by dotted path expression
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        let path = KeyPath::parse(path).ok()?;
        self.get_path(&path)
    }

    /// Looks up a value by pre-parsed path
    pub fn get_path(&self, path: &KeyPath) -> Option<&ConfigValue> {
        let mut current = &self.root;
        for key in path.keys() {
            match current {
                ConfigValue::Object(map) => current = map.get(key)?,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path)?.as_i64()
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path)?.as_f64()
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path)?.as_bool()
    }

    pub fn get_duration(&self, path: &str) -> Option<Duration> {
        self.get(path)?.as_duration()
    }

    pub fn get_bytes(&self, path: &str) -> Option<u64> {
        self.get(path)?.as_bytes()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

/// Projects the resolved raw tree into plain values. Members and array
/// elements whose value resolved to nothing disappear here.
pub(crate) fn project(
    resolver: &mut Resolver<'_>,
    document: &Document,
) -> Result<ConfigValue, ResolveError> {
    match document {
        Document::Object(obj) => Ok(ConfigValue::Object(project_object(resolver, obj)?)),
        Document::Array(elements) => {
            let at = KeyPath::new();
            let mut out = Vec::new();
            for element in elements {
                let resolved = resolver.effective(element, &at)?;
                if let Some(value) = project_resolved(resolver, &resolved, &at)? {
                    out.push(value);
                }
            }
            Ok(ConfigValue::Array(out))
        }
    }
}

fn project_object(
    resolver: &mut Resolver<'_>,
    obj: &ObjectNode,
) -> Result<IndexMap<String, ConfigValue>, ResolveError> {
    let mut map = IndexMap::new();
    for (key, member) in &obj.members {
        if let Some(resolved) = resolver.history_value(&member.history, &member.path)? {
            if let Some(value) = project_resolved(resolver, &resolved, &member.path)? {
                map.insert(key.clone(), value);
            }
        }
    }
    Ok(map)
}

fn project_resolved(
    resolver: &mut Resolver<'_>,
    resolved: &Resolved,
    at: &KeyPath,
) -> Result<Option<ConfigValue>, ResolveError> {
    match resolved {
        Resolved::Empty => Ok(None),
        Resolved::Literal(lit) => Ok(Some(literal_value(lit))),
        Resolved::Array(elements) => {
            let mut out = Vec::new();
            for element in elements {
                let resolved = resolver.effective(element, at)?;
                if let Some(value) = project_resolved(resolver, &resolved, at)? {
                    out.push(value);
                }
            }
            Ok(Some(ConfigValue::Array(out)))
        }
        Resolved::Object(obj) => Ok(Some(ConfigValue::Object(project_object(resolver, obj)?))),
    }
}

fn literal_value(lit: &Literal) -> ConfigValue {
    match lit.kind {
        LiteralKind::Null => ConfigValue::Null,
        LiteralKind::Boolean => ConfigValue::Bool(lit.value == "true"),
        LiteralKind::Integer | LiteralKind::Hexadecimal | LiteralKind::Octal => {
            match lit.value.parse::<i64>() {
                Ok(n) => ConfigValue::Integer(n),
                Err(_) => ConfigValue::String(lit.value.clone()),
            }
        }
        LiteralKind::Decimal => decimal_value(&lit.value),
        _ => ConfigValue::String(lit.value.clone()),
    }
}

fn decimal_value(text: &str) -> ConfigValue {
    match text {
        "NaN" => ConfigValue::Float(f64::NAN),
        "infinity" | "+infinity" => ConfigValue::Float(f64::INFINITY),
        "-infinity" => ConfigValue::Float(f64::NEG_INFINITY),
        _ => match text.parse::<f64>() {
            Ok(x) => ConfigValue::Float(x),
            Err(_) => ConfigValue::String(text.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(pairs: Vec<(&str, ConfigValue)>) -> ConfigValue {
        ConfigValue::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_accessors() {
        assert_eq!(ConfigValue::Integer(3).as_i64(), Some(3));
        assert_eq!(ConfigValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(ConfigValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(ConfigValue::Bool(true).as_bool(), Some(true));
        assert_eq!(
            ConfigValue::String("yes".to_string()).as_bool(),
            Some(true)
        );
        assert_eq!(ConfigValue::String("hi".to_string()).as_str(), Some("hi"));
        assert!(ConfigValue::Null.is_null());
        assert_eq!(ConfigValue::Null.as_i64(), None);
    }

    #[test]
    fn test_duration_coercion() {
        assert_eq!(
            ConfigValue::Integer(250).as_duration(),
            Some(Duration::from_millis(250))
        );
        for (text, expected) in [
            ("10s", Duration::from_secs(10)),
            ("5 seconds", Duration::from_secs(5)),
            ("100ms", Duration::from_millis(100)),
            ("42", Duration::from_millis(42)),
            ("1.5s", Duration::from_millis(1500)),
            ("2m", Duration::from_secs(120)),
            ("1h", Duration::from_secs(3600)),
            ("1d", Duration::from_secs(86400)),
            ("500us", Duration::from_micros(500)),
            ("7ns", Duration::from_nanos(7)),
        ] {
            assert_eq!(
                ConfigValue::String(text.to_string()).as_duration(),
                Some(expected),
                "{text}"
            );
        }
        assert_eq!(
            ConfigValue::String("infinite".to_string()).as_duration(),
            Some(Duration::MAX)
        );
        assert_eq!(
            ConfigValue::String("10 fortnights".to_string()).as_duration(),
            None
        );
    }

    #[test]
    fn test_byte_size_coercion() {
        assert_eq!(ConfigValue::Integer(512).as_bytes(), Some(512));
        for (text, expected) in [
            ("128 bytes", 128),
            ("1kB", 1_000),
            ("1kb", 1_024),
            ("2mB", 2_000_000),
            ("2mb", 2 * 1024 * 1024),
            ("1gB", 1_000_000_000),
            ("1gb", 1024 * 1024 * 1024),
        ] {
            assert_eq!(
                ConfigValue::String(text.to_string()).as_bytes(),
                Some(expected),
                "{text}"
            );
        }
        assert_eq!(ConfigValue::String("3 parsecs".to_string()).as_bytes(), None);
    }

    #[test]
    fn test_dotted_path_access() {
        let config = Config::from_root(object(vec![(
            "server",
            object(vec![
                ("port", ConfigValue::Integer(8080)),
                ("host", ConfigValue::String("localhost".to_string())),
            ]),
        )]));
        assert_eq!(config.get_i64("server.port"), Some(8080));
        assert_eq!(config.get_str("server.host"), Some("localhost"));
        assert_eq!(config.get("server.missing"), None);
        assert_eq!(config.get("server.port.too.deep"), None);
    }

    #[test]
    fn test_quoted_key_access() {
        let config = Config::from_root(object(vec![(
            "a.b",
            ConfigValue::Integer(1),
        )]));
        assert_eq!(config.get_i64("\"a.b\""), Some(1));
        assert_eq!(config.get("a.b"), None);
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(ConfigValue::Null.to_string(), "null");
        assert_eq!(ConfigValue::Bool(true).to_string(), "true");
        assert_eq!(ConfigValue::Integer(-7).to_string(), "-7");
        assert_eq!(ConfigValue::Float(1.0).to_string(), "1.0");
        assert_eq!(ConfigValue::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(ConfigValue::Float(f64::INFINITY).to_string(), "infinity");
        assert_eq!(
            ConfigValue::Float(f64::NEG_INFINITY).to_string(),
            "-infinity"
        );
        assert_eq!(
            ConfigValue::String("a \"b\"\n".to_string()).to_string(),
            "\"a \\\"b\\\"\\n\""
        );
    }

    #[test]
    fn test_render_array_inline() {
        let value = ConfigValue::Array(vec![
            ConfigValue::Integer(1),
            ConfigValue::String("two".to_string()),
        ]);
        assert_eq!(value.to_string(), "[1, \"two\"]");
    }

    #[test]
    fn test_render_object_quotes_awkward_keys() {
        let value = object(vec![
            ("plain", ConfigValue::Integer(1)),
            ("needs.quoting", ConfigValue::Integer(2)),
        ]);
        let text = value.to_string();
        assert!(text.contains("plain: 1"));
        assert!(text.contains("\"needs.quoting\": 2"));
    }

    #[test]
    fn test_serialize_to_json() {
        let value = object(vec![
            ("a", ConfigValue::Integer(1)),
            (
                "b",
                ConfigValue::Array(vec![ConfigValue::Bool(true), ConfigValue::Null]),
            ),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "{\"a\":1,\"b\":[true,null]}");
    }
}
