//! Substitution resolution
//!
//! After parsing, every substitution in the registry is resolved against the
//! final tree. Lookups are merge-aware: a member's value is computed by a
//! backward scan of its history, merging adjacent object entries and
//! skipping entries that resolved to nothing. Self-referential substitutions
//! see the value their field had before the entry that contains them.
//! Resolution is demand-driven with memoization; a visiting stack detects
//! dependency cycles.

use crate::error::ResolveError;
use crate::node::{
    Literal, Node, NodeType, ObjectNode, Resolved, SubId, Substitution, SubstitutionRegistry,
    Value,
};
use crate::parser::Document;
use crate::path::KeyPath;
use std::collections::HashMap;

/// Environment variable lookup used as the fallback for substitutions that
/// match nothing in the document
pub trait EnvLookup {
    fn var(&self, name: &str) -> Option<String>;
}

/// Looks variables up in the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl EnvLookup for SystemEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// An in-memory environment, mainly for tests and sandboxed callers
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    /// Builder-style insertion
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }
}

impl EnvLookup for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// How a substitution's target path relates to the field that contains it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    /// The substitution names its own field
    SelfReference,
    /// The substitution names a path inside its own field
    Descendant,
    /// The substitution names an object that encloses its field
    Ancestor,
    /// An unrelated path, looked up against the final tree
    Ordinary,
}

/// Resolves every substitution in a parsed document
pub struct Resolver<'a> {
    root: &'a Document,
    registry: &'a mut SubstitutionRegistry,
    env: &'a dyn EnvLookup,
    resolve_env: bool,
    visiting: Vec<SubId>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        root: &'a Document,
        registry: &'a mut SubstitutionRegistry,
        env: &'a dyn EnvLookup,
        resolve_env: bool,
    ) -> Self {
        Self {
            root,
            registry,
            env,
            resolve_env,
            visiting: Vec::new(),
        }
    }

    /// Resolves all registered substitutions in registration order
    pub fn run(&mut self) -> Result<(), ResolveError> {
        let ids: Vec<SubId> = self.registry.ids().collect();
        for id in ids {
            self.resolve_sub(id)?;
        }
        Ok(())
    }

    /// Resolves one substitution, memoizing the result
    fn resolve_sub(&mut self, id: SubId) -> Result<Resolved, ResolveError> {
        if let Some(resolved) = &self.registry.get(id).resolved {
            return Ok(resolved.clone());
        }
        let sub = self.registry.get(id).clone();
        if self.visiting.contains(&id) {
            return Err(ResolveError::CyclicSubstitution {
                chain: self.render_chain(id, &sub),
                position: sub.position,
            });
        }

        self.visiting.push(id);
        let result = self.classify_and_resolve(&sub, id);
        self.visiting.pop();

        let resolved = result?;
        self.registry.get_mut(id).resolved = Some(resolved.clone());
        Ok(resolved)
    }

    fn render_chain(&self, id: SubId, sub: &Substitution) -> String {
        let start = self.visiting.iter().position(|v| *v == id).unwrap_or(0);
        let mut parts: Vec<String> = self.visiting[start..]
            .iter()
            .map(|v| format!("${{{}}}", self.registry.get(*v).path))
            .collect();
        parts.push(format!("${{{}}}", sub.path));
        parts.join(" -> ")
    }

    fn classify_and_resolve(
        &mut self,
        sub: &Substitution,
        id: SubId,
    ) -> Result<Resolved, ResolveError> {
        let relation = match &sub.owner {
            Some(owner) if sub.path == *owner => Relation::SelfReference,
            Some(owner) if sub.path.starts_with(owner) => Relation::Descendant,
            Some(owner) if owner.starts_with(&sub.path) => Relation::Ancestor,
            _ => Relation::Ordinary,
        };

        match relation {
            Relation::Ancestor => {
                if !sub.required {
                    return Ok(Resolved::Empty);
                }
                let owner = sub.owner.as_ref().map(KeyPath::to_string).unwrap_or_default();
                Err(ResolveError::AncestorReference {
                    path: sub.path.to_string(),
                    owner,
                    position: sub.position,
                })
            }
            Relation::SelfReference | Relation::Descendant if sub.in_array => {
                // the prior-value rule has no meaning for array elements
                if !sub.required {
                    return Ok(Resolved::Empty);
                }
                Err(ResolveError::SelfReferenceInArray {
                    path: sub.path.to_string(),
                    position: sub.position,
                })
            }
            Relation::SelfReference | Relation::Descendant => self.resolve_self(sub, id),
            Relation::Ordinary => self.resolve_lookup(sub),
        }
    }

    /// Resolves a self- or descendant-reference: the target is looked up in
    /// the value the owning field had before the history entry containing
    /// this substitution
    fn resolve_self(&mut self, sub: &Substitution, id: SubId) -> Result<Resolved, ResolveError> {
        let owner = match &sub.owner {
            Some(owner) => owner.clone(),
            None => return self.resolve_lookup(sub),
        };
        let prior = match self.member_history(&owner)? {
            Some(history) => {
                let cut = history
                    .iter()
                    .position(|v| v.contains_sub(id))
                    .unwrap_or(history.len());
                self.history_value(&history[..cut], &owner)?
            }
            None => None,
        };

        let remaining = sub.path.strip_prefix(&owner).unwrap_or_default();
        let resolved = match prior {
            Some(value) if remaining.is_empty() => Some(value),
            Some(Resolved::Object(obj)) => self.lookup_in(obj, remaining.keys(), &sub.path)?,
            _ => None,
        };
        match resolved {
            Some(value) => Ok(value),
            None => self.fallback(sub, true),
        }
    }

    /// Resolves an ordinary substitution by path lookup against the tree
    fn resolve_lookup(&mut self, sub: &Substitution) -> Result<Resolved, ResolveError> {
        match self.lookup_path(&sub.path)? {
            Some(value) => Ok(value),
            None => self.fallback(sub, false),
        }
    }

    /// Environment fallback for substitutions that matched nothing
    fn fallback(&mut self, sub: &Substitution, self_reference: bool) -> Result<Resolved, ResolveError> {
        if self.resolve_env {
            let name = sub.path.keys().join(".");
            if let Some(text) = self.env.var(&name) {
                return Ok(Resolved::Literal(Literal::quoted(&text)));
            }
        }
        if !sub.required {
            return Ok(Resolved::Empty);
        }
        if self_reference {
            Err(ResolveError::UnresolvedSelfReference {
                path: sub.path.to_string(),
                position: sub.position,
            })
        } else {
            Err(ResolveError::UnresolvedSubstitution {
                path: sub.path.to_string(),
                position: sub.position,
            })
        }
    }

    fn lookup_path(&mut self, path: &KeyPath) -> Result<Option<Resolved>, ResolveError> {
        let Document::Object(root) = self.root else {
            return Ok(None);
        };
        let root = root.clone();
        self.lookup_in(root, path.keys(), path)
    }

    /// Walks `keys` down from `obj`, computing each step's merged value
    fn lookup_in(
        &mut self,
        obj: ObjectNode,
        keys: &[String],
        at: &KeyPath,
    ) -> Result<Option<Resolved>, ResolveError> {
        let mut current = obj;
        for (i, key) in keys.iter().enumerate() {
            let history = match current.get(key) {
                Some(member) => member.history.clone(),
                None => return Ok(None),
            };
            let resolved = self.history_value(&history, at)?;
            if i == keys.len() - 1 {
                return Ok(resolved);
            }
            match resolved {
                Some(Resolved::Object(inner)) => current = inner,
                _ => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Returns the merged history of the member at `path`: duplicate parent
    /// objects on the way down are merged, which concatenates the member's
    /// history entries across them
    fn member_history(&mut self, path: &KeyPath) -> Result<Option<Vec<Value>>, ResolveError> {
        let Document::Object(root) = self.root else {
            return Ok(None);
        };
        let mut current = root.clone();
        let keys = path.keys();
        for (i, key) in keys.iter().enumerate() {
            let history = match current.get(key) {
                Some(member) => member.history.clone(),
                None => return Ok(None),
            };
            if i == keys.len() - 1 {
                return Ok(Some(history));
            }
            match self.history_value(&history, path)? {
                Some(Resolved::Object(inner)) => current = inner,
                _ => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Computes a member's value from its history by a backward scan:
    /// entries that resolve to nothing are skipped, consecutive object
    /// entries merge with later ones winning, and any other value (null
    /// included) stops the scan
    pub(crate) fn history_value(
        &mut self,
        history: &[Value],
        at: &KeyPath,
    ) -> Result<Option<Resolved>, ResolveError> {
        let mut merged: Option<ObjectNode> = None;
        for value in history.iter().rev() {
            match self.effective(value, at)? {
                Resolved::Empty => continue,
                Resolved::Object(obj) => {
                    merged = Some(match merged {
                        None => obj,
                        Some(newer) => {
                            let mut base = obj;
                            base.merge_from(newer);
                            base
                        }
                    });
                }
                other => {
                    return Ok(Some(match merged {
                        None => other,
                        Some(m) => Resolved::Object(m),
                    }));
                }
            }
        }
        Ok(merged.map(Resolved::Object))
    }

    /// Evaluates a value's concatenation once its substitutions resolve.
    ///
    /// Nodes that resolved to nothing and whitespace carry no type; if
    /// exactly one typed node remains the value takes its type unchanged,
    /// otherwise the nodes concatenate as strings, arrays or merged objects.
    pub(crate) fn effective(
        &mut self,
        value: &Value,
        at: &KeyPath,
    ) -> Result<Resolved, ResolveError> {
        let mut pieces = Vec::with_capacity(value.nodes.len());
        for node in value.nodes.iter() {
            let piece = match node {
                Node::Empty => (Resolved::Empty, None),
                Node::Literal(lit) => (Resolved::Literal(lit.clone()), None),
                Node::Array(elements) => (Resolved::Array(elements.clone()), None),
                Node::Object(obj) => (Resolved::Object(obj.clone()), None),
                Node::Substitution(id) => {
                    let position = self.registry.get(*id).position;
                    (self.resolve_sub(*id)?, Some(position))
                }
            };
            pieces.push(piece);
        }

        let content: Vec<usize> = (0..pieces.len())
            .filter(|i| pieces[*i].0.concrete_type().is_some())
            .collect();
        match content.len() {
            0 => Ok(Resolved::Empty),
            1 => Ok(pieces[content[0]].0.clone()),
            _ => self.concatenate(&pieces, &content, at),
        }
    }

    fn concatenate(
        &mut self,
        pieces: &[(Resolved, Option<crate::error::Position>)],
        content: &[usize],
        at: &KeyPath,
    ) -> Result<Resolved, ResolveError> {
        let established = match pieces[content[0]].0.concrete_type() {
            Some(t) => t,
            None => return Ok(Resolved::Empty),
        };
        for &i in content {
            let found = pieces[i].0.concrete_type();
            if found != Some(established) {
                return Err(ResolveError::TypeMismatch {
                    established: established.name().to_string(),
                    found: pieces[i].0.type_name().to_string(),
                    position: pieces[i].1.unwrap_or_default(),
                    path: at.to_string(),
                });
            }
        }

        match established {
            NodeType::Literal => {
                // whitespace between resolved pieces is part of the string,
                // including whitespace left dangling by emptied-out pieces
                let mut text = String::new();
                for (piece, _) in pieces {
                    if let Resolved::Literal(lit) = piece {
                        text.push_str(lit.concat_text());
                    }
                }
                Ok(Resolved::Literal(Literal::quoted(&text)))
            }
            NodeType::Array => {
                let mut elements = Vec::new();
                for &i in content {
                    if let Resolved::Array(part) = &pieces[i].0 {
                        elements.extend(part.iter().cloned());
                    }
                }
                Ok(Resolved::Array(elements))
            }
            NodeType::Object => {
                let mut merged = ObjectNode::new();
                for &i in content {
                    if let Resolved::Object(part) = &pieces[i].0 {
                        merged.merge_from(part.clone());
                    }
                }
                Ok(Resolved::Object(merged))
            }
        }
    }
}
