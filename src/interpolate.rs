//! Lazy `${ref}` interpolation over the document tree.
//!
//! A reference is resolved, in order, against the referencing section's own
//! keys, its ancestors up to the root, and finally the document's ordered
//! fallback [`Lookup`] chain (environment variables or caller-supplied
//! tables). Resolution is recursive: a resolved value may itself contain
//! further references. A visited set of `(section path, key)` pairs rides
//! along the recursion, so reference cycles fail with
//! [`Error::CyclicReference`] instead of recursing forever.
//!
//! Interpolation never mutates stored raw values; it runs at value access
//! and always reflects the current tree state.
//!
//! ## Examples
//!
//! ```rust
//! use initree::parse;
//!
//! let doc = parse("base = /opt\npath = ${base}/bin").unwrap();
//! assert_eq!(doc.get("path").unwrap().as_deref(), Some("/opt/bin"));
//! assert_eq!(doc.raw("path").as_deref(), Some("${base}/bin"));
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use crate::node::Node;
use crate::{Error, Result};

/// Policy for `${ref}` tokens that resolve nowhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Unresolved {
    /// Fail the read with [`Error::UnresolvedReference`].
    #[default]
    Error,
    /// Leave the `${ref}` token in the output verbatim.
    Keep,
}

/// A fallback resolver consulted after the document tree.
pub trait Lookup {
    /// Returns the replacement for `name`, or `None` to pass to the next
    /// resolver in the chain.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Resolves references against process environment variables.
///
/// # Examples
///
/// ```rust
/// use initree::{parse, EnvLookup};
///
/// std::env::set_var("INITREE_DOC_HOME", "/home/doc");
/// let doc = parse("dir = ${INITREE_DOC_HOME}/cfg").unwrap();
/// doc.push_lookup(EnvLookup);
/// assert_eq!(doc.get("dir").unwrap().as_deref(), Some("/home/doc/cfg"));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvLookup;

impl Lookup for EnvLookup {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Resolves references against a caller-supplied table.
#[derive(Clone, Debug, Default)]
pub struct MapLookup {
    entries: HashMap<String, String>,
}

impl MapLookup {
    /// Builds a lookup table from `(name, value)` pairs.
    #[must_use]
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        MapLookup {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Lookup for MapLookup {
    fn lookup(&self, name: &str) -> Option<String> {
        self.entries.get(name).cloned()
    }
}

/// One `(section path, key)` pair on the resolution stack.
type Visited = (Vec<String>, String);

/// Expands every `${ref}` token in `raw` in the context of `node`.
pub(crate) fn resolve(node: &Node, raw: &str) -> Result<String> {
    let (lookups, unresolved) = node.root_lookups();
    let mut visited: Vec<Visited> = Vec::new();
    expand(node, raw, &lookups, unresolved, &mut visited)
}

fn expand(
    node: &Node,
    input: &str,
    lookups: &[Rc<dyn Lookup>],
    unresolved: Unresolved,
    visited: &mut Vec<Visited>,
) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'$') {
            // `\$` suppresses interpolation of the following token.
            out.push('$');
            chars.next();
            continue;
        }
        if c != '$' || chars.peek() != Some(&'{') {
            out.push(c);
            continue;
        }
        chars.next();
        let mut name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            name.push(c);
        }
        if !closed {
            // Unterminated token: literal text, not a reference.
            out.push_str("${");
            out.push_str(&name);
            break;
        }
        out.push_str(&substitute(node, &name, lookups, unresolved, visited)?);
    }
    Ok(out)
}

fn substitute(
    node: &Node,
    name: &str,
    lookups: &[Rc<dyn Lookup>],
    unresolved: Unresolved,
    visited: &mut Vec<Visited>,
) -> Result<String> {
    // (a) own keys, (b) ancestors up to the root.
    let mut scope = Some(node.clone());
    while let Some(owner) = scope {
        if let Some(value) = owner.raw(name) {
            let pair = visited_pair(&owner, name);
            if visited.contains(&pair) {
                return Err(cycle_error(visited, name));
            }
            visited.push(pair);
            let expanded = expand(&owner, &value, lookups, unresolved, visited)?;
            visited.pop();
            return Ok(expanded);
        }
        scope = owner.parent();
    }

    // (c) the fallback chain, in push order.
    for lookup in lookups {
        if let Some(value) = lookup.lookup(name) {
            let pair = (vec!["@lookup".to_string()], name.to_string());
            if visited.contains(&pair) {
                return Err(cycle_error(visited, name));
            }
            visited.push(pair);
            let expanded = expand(node, &value, lookups, unresolved, visited)?;
            visited.pop();
            return Ok(expanded);
        }
    }

    match unresolved {
        Unresolved::Error => Err(Error::unresolved(name)),
        Unresolved::Keep => Ok(format!("${{{}}}", name)),
    }
}

fn visited_pair(owner: &Node, name: &str) -> Visited {
    let key = if owner.case_sensitive() {
        name.to_string()
    } else {
        name.to_lowercase()
    };
    (owner.path(), key)
}

fn cycle_error(visited: &[Visited], name: &str) -> Error {
    let mut chain: Vec<String> = visited
        .iter()
        .map(|(path, key)| {
            if path.is_empty() || path[0] == "@lookup" {
                key.clone()
            } else {
                format!("{}/{}", path.join("."), key)
            }
        })
        .collect();
    chain.push(name.to_string());
    Error::cyclic(&chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Document;

    #[test]
    fn expands_same_section_reference() {
        let doc = Document::new();
        doc.put("base", "/opt");
        doc.put("path", "${base}/bin");
        assert_eq!(doc.get("path").unwrap().as_deref(), Some("/opt/bin"));
    }

    #[test]
    fn expands_ancestor_reference() {
        let doc = Document::new();
        doc.put("root", "/srv");
        let sub = doc.obtain(&["app", "paths"]);
        sub.put("data", "${root}/data");
        assert_eq!(sub.get("data").unwrap().as_deref(), Some("/srv/data"));
    }

    #[test]
    fn own_key_shadows_ancestor() {
        let doc = Document::new();
        doc.put("name", "outer");
        let sub = doc.obtain(&["s"]);
        sub.put("name", "inner");
        sub.put("greeting", "hello ${name}");
        assert_eq!(sub.get("greeting").unwrap().as_deref(), Some("hello inner"));
    }

    #[test]
    fn recursive_expansion() {
        let doc = Document::new();
        doc.put("a", "A");
        doc.put("b", "${a}B");
        doc.put("c", "${b}C");
        assert_eq!(doc.get("c").unwrap().as_deref(), Some("ABC"));
    }

    #[test]
    fn two_key_cycle_fails() {
        let doc = Document::new();
        doc.put("a", "${b}");
        doc.put("b", "${a}");
        assert!(matches!(
            doc.get("a"),
            Err(Error::CyclicReference { .. })
        ));
        assert!(matches!(
            doc.get("b"),
            Err(Error::CyclicReference { .. })
        ));
    }

    #[test]
    fn self_cycle_fails() {
        let doc = Document::new();
        doc.put("a", "${a}");
        assert!(matches!(doc.get("a"), Err(Error::CyclicReference { .. })));
    }

    #[test]
    fn same_key_in_different_sections_is_not_a_cycle() {
        let doc = Document::new();
        doc.put("v", "top");
        let sub = doc.obtain(&["s"]);
        sub.put("v", "${w}");
        sub.put("w", "uses ${x}");
        doc.put("x", "${v}");
        // s/v -> s/w -> root/x -> root/v: four distinct pairs.
        assert_eq!(sub.get("v").unwrap().as_deref(), Some("uses top"));
    }

    #[test]
    fn unresolved_reference_errors_by_default() {
        let doc = Document::new();
        doc.put("p", "${missing}");
        assert!(matches!(
            doc.get("p"),
            Err(Error::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn keep_policy_passes_token_through() {
        let doc = Document::new();
        doc.set_unresolved(Unresolved::Keep);
        doc.put("p", "x ${missing} y");
        assert_eq!(doc.get("p").unwrap().as_deref(), Some("x ${missing} y"));
    }

    #[test]
    fn escaped_dollar_is_literal() {
        let doc = Document::new();
        doc.put("p", "cost: \\${amount}");
        assert_eq!(doc.get("p").unwrap().as_deref(), Some("cost: ${amount}"));
    }

    #[test]
    fn unterminated_token_is_literal() {
        let doc = Document::new();
        doc.put("p", "${open");
        assert_eq!(doc.get("p").unwrap().as_deref(), Some("${open"));
    }

    #[test]
    fn map_lookup_fallback() {
        let doc = Document::new();
        doc.push_lookup(MapLookup::new([("city", "Oslo")]));
        doc.put("p", "in ${city}");
        assert_eq!(doc.get("p").unwrap().as_deref(), Some("in Oslo"));
    }

    #[test]
    fn tree_wins_over_lookup_chain() {
        let doc = Document::new();
        doc.push_lookup(MapLookup::new([("v", "from-lookup")]));
        doc.put("v", "from-tree");
        doc.put("p", "${v}");
        assert_eq!(doc.get("p").unwrap().as_deref(), Some("from-tree"));
    }

    #[test]
    fn env_lookup_fallback() {
        std::env::set_var("INITREE_TEST_VAR", "42");
        let doc = Document::new();
        doc.push_lookup(EnvLookup);
        doc.put("p", "${INITREE_TEST_VAR}");
        assert_eq!(doc.get("p").unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn lookup_chain_order_is_push_order() {
        let doc = Document::new();
        doc.push_lookup(MapLookup::new([("k", "first")]));
        doc.push_lookup(MapLookup::new([("k", "second")]));
        doc.put("p", "${k}");
        assert_eq!(doc.get("p").unwrap().as_deref(), Some("first"));
    }
}
