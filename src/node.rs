//! The Json+ tree data model
//!
//! Nodes form a closed tagged union (`Empty | Literal | Array | Object |
//! Substitution`); a [`Value`] is an ordered node list representing value
//! concatenation; a [`Member`] is an object field carrying the append-only
//! history of every value ever assigned to it. Substitution nodes hold only
//! an id into the flat [`SubstitutionRegistry`], so the tree contains no
//! back-references.

use crate::error::{Position, SyntaxError};
use crate::lexer::{LiteralKind, Token, TokenKind};
use crate::path::{quote_string, KeyPath};
use indexmap::map::Entry;
use indexmap::IndexMap;
use smallvec::SmallVec;

/// A literal leaf carrying both the semantic value and the raw source form
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    /// Semantic text: unescaped string content, canonical number text
    pub value: String,
    /// Raw re-serializable form
    pub source: String,
}

impl Literal {
    /// Builds a literal from a literal token produced by the tokenizer
    pub fn from_token(token: &Token) -> Option<Self> {
        match token.kind {
            TokenKind::Literal(kind) => Some(Self {
                kind,
                value: token.value.clone(),
                source: token.source.clone(),
            }),
            _ => None,
        }
    }

    /// Builds a quoted string literal from plain text (used for environment
    /// fallback values)
    pub fn quoted(value: &str) -> Self {
        Self {
            kind: LiteralKind::QuotedString,
            value: value.to_string(),
            source: quote_string(value),
        }
    }

    /// Builds a synthetic string literal from already-concatenated parts
    pub fn concatenated(value: String, source: String) -> Self {
        Self {
            kind: LiteralKind::QuotedString,
            value,
            source,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == LiteralKind::Whitespace
    }

    /// The text this literal contributes to a string concatenation: the
    /// unescaped value for strings and whitespace, the original source
    /// spelling for numbers, booleans and null
    pub fn concat_text(&self) -> &str {
        match self.kind {
            LiteralKind::QuotedString
            | LiteralKind::TripleQuotedString
            | LiteralKind::UnquotedString
            | LiteralKind::Whitespace => &self.value,
            _ => &self.source,
        }
    }
}

/// Identifier of a substitution in the [`SubstitutionRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubId(pub(crate) u32);

impl SubId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Coarse value categories used by the concatenation type rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Literal,
    Array,
    Object,
}

impl NodeType {
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Literal => "string",
            NodeType::Array => "array",
            NodeType::Object => "object",
        }
    }
}

/// One element of a value concatenation
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Placeholder for unresolved-optional substitutions and empty includes;
    /// type-compatible with every other type
    Empty,
    Literal(Literal),
    Array(Vec<Value>),
    Object(ObjectNode),
    Substitution(SubId),
}

impl Node {
    /// The concrete type of the node, if it has one. Empty nodes,
    /// substitutions (unknown until resolution) and whitespace literals
    /// (trimmed or absorbed during concatenation) have none.
    pub fn concrete_type(&self) -> Option<NodeType> {
        match self {
            Node::Empty | Node::Substitution(_) => None,
            Node::Literal(lit) if lit.is_whitespace() => None,
            Node::Literal(_) => Some(NodeType::Literal),
            Node::Array(_) => Some(NodeType::Array),
            Node::Object(_) => Some(NodeType::Object),
        }
    }
}

/// An ordered sequence of nodes representing value concatenation.
///
/// Almost every value has exactly one node; the inline capacity avoids a
/// heap allocation for that case.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Value {
    pub nodes: SmallVec<[Node; 2]>,
}

impl Value {
    pub fn new() -> Self {
        Self::default()
    }

    /// A value consisting of a single node
    pub fn single(node: Node) -> Self {
        let mut nodes = SmallVec::new();
        nodes.push(node);
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The established concrete type: the type of the first node that has one
    pub fn concrete_type(&self) -> Option<NodeType> {
        self.nodes.iter().find_map(|n| n.concrete_type())
    }

    /// Appends a concatenation element, rejecting mixes of concrete types.
    /// Substitutions and Empty nodes always append; their type is checked
    /// again after resolution.
    pub fn append(
        &mut self,
        node: Node,
        position: Position,
        path: &KeyPath,
    ) -> Result<(), SyntaxError> {
        if let (Some(established), Some(found)) = (self.concrete_type(), node.concrete_type()) {
            if established != found {
                return Err(SyntaxError::MixedConcatenation {
                    established: established.name().to_string(),
                    found: found.name().to_string(),
                    position,
                    path: path.to_string(),
                });
            }
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Removes leading and trailing whitespace nodes; interior whitespace
    /// between literals is preserved for concatenation
    pub fn trim_whitespace(&mut self) {
        while matches!(self.nodes.last(), Some(Node::Literal(l)) if l.is_whitespace()) {
            self.nodes.pop();
        }
        while matches!(self.nodes.first(), Some(Node::Literal(l)) if l.is_whitespace()) {
            self.nodes.remove(0);
        }
    }

    /// True if any substitution occurs anywhere inside this value, at any
    /// depth. Values that carry substitutions never clear field history.
    pub fn carries_substitution(&self) -> bool {
        self.nodes.iter().any(|node| match node {
            Node::Substitution(_) => true,
            Node::Array(elements) => elements.iter().any(Value::carries_substitution),
            Node::Object(obj) => obj
                .members
                .values()
                .any(|m| m.history.iter().any(Value::carries_substitution)),
            Node::Empty | Node::Literal(_) => false,
        })
    }

    /// True if the given substitution occurs at concatenation level of this
    /// value, descending through arrays but not into object members (those
    /// belong to deeper fields)
    pub fn contains_sub(&self, id: SubId) -> bool {
        self.nodes.iter().any(|node| match node {
            Node::Substitution(sub) => *sub == id,
            Node::Array(elements) => elements.iter().any(|v| v.contains_sub(id)),
            _ => false,
        })
    }
}

/// A field in an object: its full path and the history of every value ever
/// assigned to it during the parse, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub path: KeyPath,
    pub history: Vec<Value>,
}

impl Member {
    pub fn new(path: KeyPath) -> Self {
        Self {
            path,
            history: Vec::new(),
        }
    }

    /// The current value is the last history entry
    pub fn value(&self) -> Option<&Value> {
        self.history.last()
    }

    /// Assigns a new value.
    ///
    /// A substitution-free literal or array value makes every older entry
    /// unreachable (no merge target, no self-reference source), so history is
    /// cleared. Object values and anything carrying a substitution keep the
    /// history linear.
    pub fn assign(&mut self, value: Value) {
        let plain = !value.carries_substitution();
        let kind = value.concrete_type();
        if plain && matches!(kind, Some(NodeType::Literal) | Some(NodeType::Array)) {
            self.history.clear();
        }
        self.history.push(value);
    }

    /// Returns the object node to parse nested path-key assignments into
    /// (`a.b : 1` navigates through `a`). Reuses the trailing history entry
    /// when it is a plain single-object value; otherwise starts a fresh
    /// object entry so that merge-on-read applies.
    pub fn nested_object_mut(&mut self) -> &mut ObjectNode {
        let reusable = matches!(
            self.history.last(),
            Some(v) if v.nodes.len() == 1 && matches!(v.nodes[0], Node::Object(_))
        );
        if !reusable {
            self.history
                .push(Value::single(Node::Object(ObjectNode::new())));
        }
        if let Some(value) = self.history.last_mut() {
            if let Node::Object(obj) = &mut value.nodes[0] {
                return obj;
            }
        }
        unreachable!("nested_object_mut always ends on an object entry")
    }
}

/// An insertion-ordered object: key to member
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectNode {
    pub members: IndexMap<String, Member>,
}

impl ObjectNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    /// Returns the member for `key`, creating it with the given full path
    pub fn member_mut(&mut self, key: &str, path: &KeyPath) -> &mut Member {
        match self.members.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Member::new(path.clone())),
        }
    }

    /// Merges another object into this one. Member histories are
    /// concatenated rather than replaced, so values replaced away stay
    /// reachable for self-reference resolution; the current value is
    /// computed by the read-time backward scan.
    pub fn merge_from(&mut self, other: ObjectNode) {
        for (key, member) in other.members {
            match self.members.entry(key) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().history.extend(member.history);
                }
                Entry::Vacant(entry) => {
                    entry.insert(member);
                }
            }
        }
    }

    /// Recursively prepends `prefix` to every member path. Used when an
    /// included document is spliced into the tree at a non-root path.
    pub fn prefix_paths(&mut self, prefix: &KeyPath) {
        for member in self.members.values_mut() {
            member.path = member.path.prefixed(prefix);
            for value in &mut member.history {
                prefix_value_paths(value, prefix);
            }
        }
    }
}

fn prefix_value_paths(value: &mut Value, prefix: &KeyPath) {
    for node in &mut value.nodes {
        match node {
            Node::Object(obj) => obj.prefix_paths(prefix),
            Node::Array(elements) => {
                for element in elements {
                    prefix_value_paths(element, prefix);
                }
            }
            _ => {}
        }
    }
}

/// A substitution's resolved form, set exactly once by the resolver
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Empty,
    Literal(Literal),
    Array(Vec<Value>),
    Object(ObjectNode),
}

impl Resolved {
    pub fn concrete_type(&self) -> Option<NodeType> {
        match self {
            Resolved::Empty => None,
            Resolved::Literal(lit) if lit.is_whitespace() => None,
            Resolved::Literal(_) => Some(NodeType::Literal),
            Resolved::Array(_) => Some(NodeType::Array),
            Resolved::Object(_) => Some(NodeType::Object),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.concrete_type() {
            Some(t) => t.name(),
            None => "empty",
        }
    }
}

/// One registered substitution: the referenced path, the owning field, and
/// the resolved value once the resolver has run
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    /// The referenced path, prefixed for includes
    pub path: KeyPath,
    /// `${path}` is required, `${?path}` is optional
    pub required: bool,
    pub position: Position,
    /// Path of the innermost field whose value contains this substitution;
    /// `None` for elements of a root-level array document
    pub owner: Option<KeyPath>,
    /// True if the substitution sits inside an array element, where
    /// self-reference has no meaning
    pub in_array: bool,
    pub resolved: Option<Resolved>,
}

/// Flat registry of every substitution in the document, in encounter order,
/// including those pulled in through includes
#[derive(Debug, Default)]
pub struct SubstitutionRegistry {
    subs: Vec<Substitution>,
}

impl SubstitutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Registers a substitution and returns its id
    pub fn register(
        &mut self,
        path: KeyPath,
        required: bool,
        position: Position,
        owner: Option<KeyPath>,
        in_array: bool,
    ) -> SubId {
        let id = SubId(self.subs.len() as u32);
        self.subs.push(Substitution {
            path,
            required,
            position,
            owner,
            in_array,
            resolved: None,
        });
        id
    }

    pub fn get(&self, id: SubId) -> &Substitution {
        &self.subs[id.index()]
    }

    pub fn get_mut(&mut self, id: SubId) -> &mut Substitution {
        &mut self.subs[id.index()]
    }

    /// All ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = SubId> + use<> {
        (0..self.subs.len() as u32).map(SubId)
    }

    /// Re-paths substitutions registered at or after `from` (the ones
    /// produced by a nested include parse) under the include site's path.
    /// `in_array` marks include sites inside array elements.
    pub fn reroot(&mut self, from: usize, prefix: &KeyPath, in_array: bool) {
        for sub in &mut self.subs[from..] {
            sub.path = sub.path.prefixed(prefix);
            sub.owner = match sub.owner.take() {
                Some(owner) => Some(owner.prefixed(prefix)),
                None if !prefix.is_empty() => Some(prefix.clone()),
                None => None,
            };
            if in_array {
                sub.in_array = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> Node {
        Node::Literal(Literal {
            kind: LiteralKind::UnquotedString,
            value: text.to_string(),
            source: text.to_string(),
        })
    }

    fn whitespace() -> Node {
        Node::Literal(Literal {
            kind: LiteralKind::Whitespace,
            value: " ".to_string(),
            source: " ".to_string(),
        })
    }

    fn path(text: &str) -> KeyPath {
        KeyPath::parse(text).unwrap()
    }

    #[test]
    fn test_append_rejects_mixed_concrete_types() {
        let mut value = Value::new();
        value
            .append(Node::Array(vec![]), Position::new(), &path("a"))
            .unwrap();
        let err = value
            .append(Node::Object(ObjectNode::new()), Position::new(), &path("a"))
            .unwrap_err();
        assert!(matches!(err, SyntaxError::MixedConcatenation { .. }));
    }

    #[test]
    fn test_append_defers_substitution_types() {
        let mut value = Value::new();
        value
            .append(Node::Substitution(SubId(0)), Position::new(), &path("a"))
            .unwrap();
        value
            .append(Node::Array(vec![]), Position::new(), &path("a"))
            .unwrap();
        value
            .append(Node::Empty, Position::new(), &path("a"))
            .unwrap();
    }

    #[test]
    fn test_whitespace_does_not_establish_type() {
        let mut value = Value::new();
        value
            .append(whitespace(), Position::new(), &path("a"))
            .unwrap();
        value
            .append(Node::Array(vec![]), Position::new(), &path("a"))
            .unwrap();
        assert_eq!(value.concrete_type(), Some(NodeType::Array));
    }

    #[test]
    fn test_trim_whitespace_keeps_interior() {
        let mut value = Value::new();
        for node in [whitespace(), literal("a"), whitespace(), literal("b"), whitespace()] {
            value.append(node, Position::new(), &path("x")).unwrap();
        }
        value.trim_whitespace();
        assert_eq!(value.nodes.len(), 3);
        assert!(matches!(&value.nodes[1], Node::Literal(l) if l.is_whitespace()));
    }

    #[test]
    fn test_assign_plain_literal_clears_history() {
        let mut member = Member::new(path("a"));
        member.assign(Value::single(literal("one")));
        member.assign(Value::single(literal("two")));
        assert_eq!(member.history.len(), 1);
    }

    #[test]
    fn test_assign_object_keeps_history() {
        let mut member = Member::new(path("a"));
        member.assign(Value::single(Node::Object(ObjectNode::new())));
        member.assign(Value::single(Node::Object(ObjectNode::new())));
        assert_eq!(member.history.len(), 2);
    }

    #[test]
    fn test_assign_substitution_keeps_history() {
        let mut member = Member::new(path("a"));
        member.assign(Value::single(literal("one")));
        member.assign(Value::single(Node::Substitution(SubId(0))));
        assert_eq!(member.history.len(), 2);
    }

    #[test]
    fn test_carries_substitution_is_deep() {
        let inner = Value::single(Node::Substitution(SubId(3)));
        let array = Value::single(Node::Array(vec![inner]));
        assert!(array.carries_substitution());

        let mut obj = ObjectNode::new();
        obj.member_mut("k", &path("o.k"))
            .assign(Value::single(Node::Substitution(SubId(1))));
        let value = Value::single(Node::Object(obj));
        assert!(value.carries_substitution());
    }

    #[test]
    fn test_contains_sub_ignores_object_members() {
        let mut obj = ObjectNode::new();
        obj.member_mut("k", &path("o.k"))
            .assign(Value::single(Node::Substitution(SubId(1))));
        let value = Value::single(Node::Object(obj));
        assert!(!value.contains_sub(SubId(1)));

        let array = Value::single(Node::Array(vec![Value::single(Node::Substitution(
            SubId(2),
        ))]));
        assert!(array.contains_sub(SubId(2)));
    }

    #[test]
    fn test_merge_concatenates_histories() {
        let mut a = ObjectNode::new();
        a.member_mut("k", &path("k"))
            .assign(Value::single(literal("old")));
        let mut b = ObjectNode::new();
        b.member_mut("k", &path("k"))
            .assign(Value::single(Node::Substitution(SubId(0))));
        a.merge_from(b);
        assert_eq!(a.get("k").unwrap().history.len(), 2);
    }

    #[test]
    fn test_merge_preserves_insertion_order() {
        let mut a = ObjectNode::new();
        a.member_mut("first", &path("first"))
            .assign(Value::single(literal("1")));
        let mut b = ObjectNode::new();
        b.member_mut("second", &path("second"))
            .assign(Value::single(literal("2")));
        a.merge_from(b);
        let keys: Vec<_> = a.members.keys().cloned().collect();
        assert_eq!(keys, ["first", "second"]);
    }

    #[test]
    fn test_registry_reroot() {
        let mut registry = SubstitutionRegistry::new();
        registry.register(path("x"), true, Position::new(), None, false);
        let before = registry.len();
        let id = registry.register(path("y"), true, Position::new(), Some(path("z")), false);
        registry.reroot(before, &path("outer"), true);

        let sub = registry.get(id);
        assert_eq!(sub.path, path("outer.y"));
        assert_eq!(sub.owner, Some(path("outer.z")));
        assert!(sub.in_array);
        // earlier registrations untouched
        assert_eq!(registry.get(SubId(0)).path, path("x"));
    }

    #[test]
    fn test_nested_object_mut_reuses_trailing_object() {
        let mut member = Member::new(path("a"));
        member.nested_object_mut().member_mut("b", &path("a.b"));
        member.nested_object_mut().member_mut("c", &path("a.c"));
        assert_eq!(member.history.len(), 1);

        member.assign(Value::single(literal("x")));
        member.nested_object_mut();
        assert_eq!(member.history.len(), 2);
    }
}
