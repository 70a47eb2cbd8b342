//! The in-memory document tree.
//!
//! A parsed document is a tree of [`Node`]s rooted at exactly one root
//! node. Every node owns an insertion-ordered table of multi-valued
//! properties and an insertion-ordered table of child sections; duplicate
//! same-key sibling sections are held in a list ordered by first-seen
//! index.
//!
//! [`Node`] is a cheap handle (`Rc`-backed); cloning a handle does not
//! clone the tree. Parent links are weak references used for path lookup
//! only, so ownership stays strictly tree-shaped. The tree is not
//! synchronized: handles are intentionally single-threaded and a document
//! must not be mutated concurrently.
//!
//! ## Examples
//!
//! ```rust
//! use initree::Document;
//!
//! let doc = Document::new();
//! let server = doc.obtain(&["net", "server"]);
//! server.put("port", "8080");
//!
//! assert_eq!(server.path(), vec!["net", "server"]);
//! assert_eq!(doc.section(&["net", "server"]).unwrap().raw("port").as_deref(), Some("8080"));
//! ```

use std::cell::RefCell;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::interpolate::{self, Lookup, Unresolved};
use crate::{Error, Result};

/// Compares two keys or section names, optionally folding case.
/// Stored text always keeps its original casing; only comparison folds.
pub(crate) fn keys_equal(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a == b || a.to_lowercase() == b.to_lowercase()
    }
}

enum NodeKind {
    Root {
        lookups: Vec<Rc<dyn Lookup>>,
        unresolved: Unresolved,
    },
    Section {
        key: String,
        index: usize,
    },
}

struct NodeData {
    kind: NodeKind,
    parent: Weak<RefCell<NodeData>>,
    case_sensitive: bool,
    properties: IndexMap<String, Vec<String>>,
    sections: IndexMap<String, Vec<Node>>,
}

impl NodeData {
    fn stored_property_key(&self, key: &str) -> Option<String> {
        self.properties
            .keys()
            .find(|k| keys_equal(k, key, self.case_sensitive))
            .cloned()
    }

    fn stored_section_key(&self, key: &str) -> Option<String> {
        self.sections
            .keys()
            .find(|k| keys_equal(k, key, self.case_sensitive))
            .cloned()
    }
}

/// A handle to one node of a document tree: either the root or a named
/// section.
///
/// Handles are cheap to clone and compare by identity via
/// [`Node::same_node`]. All accessors return owned data because the
/// underlying storage is interior-mutable.
#[derive(Clone)]
pub struct Node {
    inner: Rc<RefCell<NodeData>>,
}

impl Node {
    pub(crate) fn new_root(case_sensitive: bool) -> Node {
        Node {
            inner: Rc::new(RefCell::new(NodeData {
                kind: NodeKind::Root {
                    lookups: Vec::new(),
                    unresolved: Unresolved::Error,
                },
                parent: Weak::new(),
                case_sensitive,
                properties: IndexMap::new(),
                sections: IndexMap::new(),
            })),
        }
    }

    fn new_section(parent: &Node, key: String, index: usize) -> Node {
        let case_sensitive = parent.inner.borrow().case_sensitive;
        Node {
            inner: Rc::new(RefCell::new(NodeData {
                kind: NodeKind::Section { key, index },
                parent: Rc::downgrade(&parent.inner),
                case_sensitive,
                properties: IndexMap::new(),
                sections: IndexMap::new(),
            })),
        }
    }

    /// Returns `true` if both handles point at the same node.
    #[must_use]
    pub fn same_node(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns `true` for the document root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self.inner.borrow().kind, NodeKind::Root { .. })
    }

    /// The section's own key, or `None` for the root.
    #[must_use]
    pub fn key(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            NodeKind::Root { .. } => None,
            NodeKind::Section { key, .. } => Some(key.clone()),
        }
    }

    /// The section's index among same-key siblings at creation time.
    /// Stable once assigned; `0` for the root.
    #[must_use]
    pub fn index(&self) -> usize {
        match &self.inner.borrow().kind {
            NodeKind::Root { .. } => 0,
            NodeKind::Section { index, .. } => *index,
        }
    }

    /// The full path from the root: ancestor keys plus the own key.
    /// Empty for the root.
    #[must_use]
    pub fn path(&self) -> Vec<String> {
        let mut path = match self.parent() {
            Some(parent) => parent.path(),
            None => Vec::new(),
        };
        if let Some(key) = self.key() {
            path.push(key);
        }
        path
    }

    /// The parent node, or `None` for the root or a detached section.
    #[must_use]
    pub fn parent(&self) -> Option<Node> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| Node { inner })
    }

    /// All ancestors from the immediate parent up to the root.
    #[must_use]
    pub fn parents(&self) -> Vec<Node> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            out.push(node);
        }
        out
    }

    pub(crate) fn root(&self) -> Node {
        self.parents().into_iter().last().unwrap_or_else(|| self.clone())
    }

    pub(crate) fn case_sensitive(&self) -> bool {
        self.inner.borrow().case_sensitive
    }

    /// Returns `true` if the node has neither properties nor child
    /// sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let data = self.inner.borrow();
        data.properties.is_empty() && data.sections.is_empty()
    }

    // ---- properties ------------------------------------------------------

    /// All property keys in table order, stored casing preserved.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().properties.keys().cloned().collect()
    }

    /// Returns `true` if a property with this key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().stored_property_key(key).is_some()
    }

    /// The first raw (pre-interpolation) value of a key.
    ///
    /// Returns `None` when the key is absent or has zero values.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        let data = self.inner.borrow();
        let stored = data.stored_property_key(key)?;
        data.properties.get(&stored)?.first().cloned()
    }

    /// All raw values of a key, or `None` when the key is absent.
    /// A present key with zero values yields `Some(vec![])`.
    #[must_use]
    pub fn raw_all(&self, key: &str) -> Option<Vec<String>> {
        let data = self.inner.borrow();
        let stored = data.stored_property_key(key)?;
        data.properties.get(&stored).cloned()
    }

    /// A snapshot of the whole property table, pre-interpolation, in table
    /// order.
    #[must_use]
    pub fn raw_values(&self) -> IndexMap<String, Vec<String>> {
        self.inner.borrow().properties.clone()
    }

    /// The first value of a key with `${ref}` interpolation applied.
    ///
    /// Interpolation is performed lazily at each access and never mutates
    /// the stored raw value, so re-reading reflects current tree state.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedReference`] or [`Error::CyclicReference`] when a
    /// reference cannot be expanded.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match self.raw(key) {
            Some(raw) => Ok(Some(interpolate::resolve(self, &raw)?)),
            None => Ok(None),
        }
    }

    /// All values of a key with interpolation applied. `None` when the key
    /// is absent.
    pub fn get_all(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.raw_all(key) {
            Some(raws) => raws
                .iter()
                .map(|raw| interpolate::resolve(self, raw))
                .collect::<Result<Vec<_>>>()
                .map(Some),
            None => Ok(None),
        }
    }

    /// Sets a key to a single value, replacing any existing values. The
    /// stored key casing is kept when a case-folded match already exists.
    pub fn put(&self, key: &str, value: &str) {
        self.put_all(key, [value.to_string()]);
    }

    /// Sets a key to an ordered list of values, replacing any existing
    /// list. An empty iterator produces a present key with zero values.
    pub fn put_all<I>(&self, key: &str, values: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut data = self.inner.borrow_mut();
        let stored = data
            .stored_property_key(key)
            .unwrap_or_else(|| key.to_string());
        data.properties.insert(stored, values.into_iter().collect());
    }

    /// Appends one value to a key, creating the key if absent.
    pub fn add(&self, key: &str, value: &str) {
        let mut data = self.inner.borrow_mut();
        let stored = data
            .stored_property_key(key)
            .unwrap_or_else(|| key.to_string());
        data.properties
            .entry(stored)
            .or_default()
            .push(value.to_string());
    }

    /// Removes a property. Returns `true` if it existed.
    pub fn remove_key(&self, key: &str) -> bool {
        let mut data = self.inner.borrow_mut();
        match data.stored_property_key(key) {
            Some(stored) => data.properties.shift_remove(&stored).is_some(),
            None => false,
        }
    }

    // ---- sections --------------------------------------------------------

    /// A snapshot of the section table: key to same-key siblings, in table
    /// order.
    #[must_use]
    pub fn sections(&self) -> IndexMap<String, Vec<Node>> {
        self.inner.borrow().sections.clone()
    }

    /// Returns `true` if a direct child section with this key exists.
    #[must_use]
    pub fn contains_section(&self, key: &str) -> bool {
        self.inner.borrow().stored_section_key(key).is_some()
    }

    /// All direct child sections sharing `key`, ordered by index.
    #[must_use]
    pub fn all_sections(&self, key: &str) -> Vec<Node> {
        let data = self.inner.borrow();
        match data.stored_section_key(key) {
            Some(stored) => data.sections.get(&stored).cloned().unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Resolves a path of section keys, taking the first same-key sibling
    /// at every step. Returns `None` when any component is missing.
    ///
    /// `node.section(&["a", "b"])` is equivalent to
    /// `node.section(&["a"])` followed by `.section(&["b"])`.
    #[must_use]
    pub fn section(&self, path: &[&str]) -> Option<Node> {
        let mut current = self.clone();
        for component in path {
            current = current.all_sections(component).into_iter().next()?;
        }
        Some(current)
    }

    /// Resolves a path like [`Node::section`], creating missing
    /// components. Existing sections are reused.
    pub fn obtain(&self, path: &[&str]) -> Node {
        let mut current = self.clone();
        for component in path {
            current = match current.all_sections(component).into_iter().next() {
                Some(existing) => existing,
                None => current.add_section(component),
            };
        }
        current
    }

    /// Creates a section at `path`. Intermediate components are reused
    /// when present; the final component is always created as a new
    /// sibling with the next free index. An empty path returns this node
    /// itself, like [`Node::obtain`].
    pub fn create(&self, path: &[&str]) -> Node {
        match path.split_last() {
            Some((last, ancestors)) => self.obtain(ancestors).add_section(last),
            None => self.clone(),
        }
    }

    /// Appends a new child section under this node, assigning the next
    /// free index among same-key siblings.
    pub(crate) fn add_section(&self, key: &str) -> Node {
        let stored = {
            let data = self.inner.borrow();
            data.stored_section_key(key).unwrap_or_else(|| key.to_string())
        };
        let index = self.all_sections(key).len();
        let child = Node::new_section(self, key.to_string(), index);
        self.inner
            .borrow_mut()
            .sections
            .entry(stored)
            .or_default()
            .push(child.clone());
        child
    }

    /// Detaches this section (and all its descendants) from its parent.
    /// Returns `false` for the root or an already-detached section.
    /// Sibling indices are not renumbered.
    pub fn remove(&self) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        let key = match self.key() {
            Some(key) => key,
            None => return false,
        };
        let mut data = parent.inner.borrow_mut();
        let Some(stored) = data.stored_section_key(&key) else {
            return false;
        };
        let Some(siblings) = data.sections.get_mut(&stored) else {
            return false;
        };
        let before = siblings.len();
        siblings.retain(|s| !s.same_node(self));
        let removed = siblings.len() < before;
        if removed {
            self.inner.borrow_mut().parent = Weak::new();
            if data.sections.get(&stored).is_some_and(Vec::is_empty) {
                data.sections.shift_remove(&stored);
            }
        }
        removed
    }

    /// Removes all properties and child sections, keeping the node itself
    /// in place.
    pub fn clear(&self) {
        let children: Vec<Node> = {
            let data = self.inner.borrow();
            data.sections.values().flatten().cloned().collect()
        };
        for child in children {
            child.inner.borrow_mut().parent = Weak::new();
        }
        let mut data = self.inner.borrow_mut();
        data.properties.clear();
        data.sections.clear();
    }

    /// Wraps this node in an immutable view whose mutators all fail with
    /// [`Error::ReadOnly`].
    #[must_use]
    pub fn read_only(&self) -> ReadOnlyNode {
        ReadOnlyNode { node: self.clone() }
    }

    /// Structural deep equality: kind, key, index, properties (order,
    /// stored casing and values) and child sections, recursively.
    #[must_use]
    pub fn deep_eq(&self, other: &Node) -> bool {
        if self.key() != other.key() || self.index() != other.index() {
            return false;
        }
        let a = self.inner.borrow();
        let b = other.inner.borrow();
        if a.properties != b.properties {
            return false;
        }
        if a.sections.len() != b.sections.len() {
            return false;
        }
        a.sections.iter().zip(b.sections.iter()).all(
            |((key_a, subs_a), (key_b, subs_b))| {
                key_a == key_b
                    && subs_a.len() == subs_b.len()
                    && subs_a.iter().zip(subs_b).all(|(x, y)| x.deep_eq(y))
            },
        )
    }

    pub(crate) fn root_lookups(&self) -> (Vec<Rc<dyn Lookup>>, Unresolved) {
        let root = self.root();
        let data = root.inner.borrow();
        match &data.kind {
            NodeKind::Root { lookups, unresolved } => (lookups.clone(), *unresolved),
            NodeKind::Section { .. } => (Vec::new(), Unresolved::Error),
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("Node")
            .field("path", &self.path())
            .field("index", &self.index())
            .field("properties", &data.properties)
            .field("sections", &data.sections)
            .finish()
    }
}

/// Policy for [`Document::merge`]: what to do when a key or section from
/// the incoming document already exists in the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// Incoming values and sections overwrite existing ones.
    Replace,
    /// Incoming values and sections are appended alongside existing ones.
    Append,
    /// Any collision fails with a duplicate error.
    Deny,
}

/// A full document: one root node plus document-wide interpolation
/// configuration (fallback lookups and the unresolved-reference policy).
///
/// Dereferences to [`Node`], so the whole node API applies to the root.
///
/// # Examples
///
/// ```rust
/// use initree::Document;
///
/// let doc = Document::new();
/// doc.put("base", "/opt");
/// doc.put("bin", "${base}/bin");
/// assert_eq!(doc.get("bin").unwrap().as_deref(), Some("/opt/bin"));
/// ```
pub struct Document {
    root: Node,
}

impl Document {
    /// Creates an empty, case-insensitive document.
    #[must_use]
    pub fn new() -> Self {
        Self::with_case_sensitive(false)
    }

    /// Creates an empty document with an explicit key-comparison rule.
    #[must_use]
    pub fn with_case_sensitive(case_sensitive: bool) -> Self {
        Document {
            root: Node::new_root(case_sensitive),
        }
    }

    /// The root node of the tree.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Appends a fallback resolver to the interpolation lookup chain.
    /// Resolvers are consulted in push order after the tree itself.
    pub fn push_lookup<L: Lookup + 'static>(&self, lookup: L) {
        let mut data = self.root.inner.borrow_mut();
        if let NodeKind::Root { lookups, .. } = &mut data.kind {
            lookups.push(Rc::new(lookup));
        }
    }

    /// Sets the policy for `${ref}` tokens that resolve nowhere.
    /// Default is [`Unresolved::Error`].
    pub fn set_unresolved(&self, policy: Unresolved) {
        let mut data = self.root.inner.borrow_mut();
        if let NodeKind::Root { unresolved, .. } = &mut data.kind {
            *unresolved = policy;
        }
    }

    /// Merges `other` into this document, implemented purely through the
    /// public mutators. `mode` governs collisions for keys and sections
    /// alike.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`] / [`Error::DuplicateSection`] under
    /// [`MergeMode::Deny`]; the target may be partially merged when the
    /// error is reported.
    pub fn merge(&self, mode: MergeMode, other: &Document) -> Result<()> {
        merge_node(&self.root, &other.root, mode)
    }

    /// Merges several documents in order; later inputs see the effects of
    /// earlier ones.
    pub fn merge_all<'a, I>(&self, mode: MergeMode, others: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        for other in others {
            self.merge(mode, other)?;
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Document {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.root
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Document").field(&self.root).finish()
    }
}

fn merge_node(target: &Node, source: &Node, mode: MergeMode) -> Result<()> {
    for (key, values) in source.raw_values() {
        match mode {
            MergeMode::Replace => target.put_all(&key, values),
            MergeMode::Append => {
                if target.contains_key(&key) {
                    for value in values {
                        target.add(&key, &value);
                    }
                } else {
                    target.put_all(&key, values);
                }
            }
            MergeMode::Deny => {
                if target.contains_key(&key) {
                    return Err(Error::duplicate_key(0, &key));
                }
                target.put_all(&key, values);
            }
        }
    }
    for (key, siblings) in source.sections() {
        match mode {
            MergeMode::Replace => {
                for existing in target.all_sections(&key) {
                    existing.remove();
                }
                for sibling in siblings {
                    let fresh = target.add_section(&key);
                    merge_node(&fresh, &sibling, MergeMode::Replace)?;
                }
            }
            MergeMode::Append => {
                for sibling in siblings {
                    let fresh = target.add_section(&key);
                    merge_node(&fresh, &sibling, MergeMode::Append)?;
                }
            }
            MergeMode::Deny => {
                if target.contains_section(&key) {
                    return Err(Error::duplicate_section(0, &key));
                }
                for sibling in siblings {
                    let fresh = target.add_section(&key);
                    merge_node(&fresh, &sibling, MergeMode::Deny)?;
                }
            }
        }
    }
    Ok(())
}

/// An immutable view over a [`Node`].
///
/// Accessors behave exactly like the underlying node; every mutator fails
/// with [`Error::ReadOnly`]. Section lookups hand back further read-only
/// views, so a subtree reached through a view stays immutable.
///
/// # Examples
///
/// ```rust
/// use initree::Document;
///
/// let doc = Document::new();
/// doc.put("key", "value");
///
/// let view = doc.read_only();
/// assert_eq!(view.raw("key").as_deref(), Some("value"));
/// assert!(view.put("key", "other").is_err());
/// ```
#[derive(Clone, Debug)]
pub struct ReadOnlyNode {
    node: Node,
}

impl ReadOnlyNode {
    /// See [`Node::key`].
    #[must_use]
    pub fn key(&self) -> Option<String> {
        self.node.key()
    }

    /// See [`Node::index`].
    #[must_use]
    pub fn index(&self) -> usize {
        self.node.index()
    }

    /// See [`Node::path`].
    #[must_use]
    pub fn path(&self) -> Vec<String> {
        self.node.path()
    }

    /// See [`Node::is_root`].
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.node.is_root()
    }

    /// See [`Node::is_empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    /// Like [`Node::parent`], returning a read-only view.
    #[must_use]
    pub fn parent(&self) -> Option<ReadOnlyNode> {
        self.node.parent().map(|node| node.read_only())
    }

    /// Like [`Node::parents`], returning read-only views.
    #[must_use]
    pub fn parents(&self) -> Vec<ReadOnlyNode> {
        self.node
            .parents()
            .into_iter()
            .map(|node| node.read_only())
            .collect()
    }

    /// See [`Node::keys`].
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.node.keys()
    }

    /// See [`Node::contains_key`].
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.node.contains_key(key)
    }

    /// See [`Node::raw`].
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.node.raw(key)
    }

    /// See [`Node::raw_all`].
    #[must_use]
    pub fn raw_all(&self, key: &str) -> Option<Vec<String>> {
        self.node.raw_all(key)
    }

    /// See [`Node::raw_values`].
    #[must_use]
    pub fn raw_values(&self) -> IndexMap<String, Vec<String>> {
        self.node.raw_values()
    }

    /// See [`Node::get`].
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.node.get(key)
    }

    /// See [`Node::get_all`].
    pub fn get_all(&self, key: &str) -> Result<Option<Vec<String>>> {
        self.node.get_all(key)
    }

    /// See [`Node::contains_section`].
    #[must_use]
    pub fn contains_section(&self, key: &str) -> bool {
        self.node.contains_section(key)
    }

    /// Like [`Node::section`], returning a read-only view.
    #[must_use]
    pub fn section(&self, path: &[&str]) -> Option<ReadOnlyNode> {
        self.node.section(path).map(|node| node.read_only())
    }

    /// Like [`Node::all_sections`], returning read-only views.
    #[must_use]
    pub fn all_sections(&self, key: &str) -> Vec<ReadOnlyNode> {
        self.node
            .all_sections(key)
            .into_iter()
            .map(|node| node.read_only())
            .collect()
    }

    /// Like [`Node::sections`], returning read-only views.
    #[must_use]
    pub fn sections(&self) -> IndexMap<String, Vec<ReadOnlyNode>> {
        self.node
            .sections()
            .into_iter()
            .map(|(key, siblings)| {
                let views = siblings.into_iter().map(|node| node.read_only()).collect();
                (key, views)
            })
            .collect()
    }

    /// Fails with [`Error::ReadOnly`].
    pub fn put(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::read_only("put"))
    }

    /// Fails with [`Error::ReadOnly`].
    pub fn put_all<I>(&self, _key: &str, _values: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        Err(Error::read_only("put_all"))
    }

    /// Fails with [`Error::ReadOnly`].
    pub fn add(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::read_only("add"))
    }

    /// Fails with [`Error::ReadOnly`].
    pub fn remove_key(&self, _key: &str) -> Result<bool> {
        Err(Error::read_only("remove_key"))
    }

    /// Fails with [`Error::ReadOnly`].
    pub fn create(&self, _path: &[&str]) -> Result<Node> {
        Err(Error::read_only("create"))
    }

    /// Fails with [`Error::ReadOnly`].
    pub fn obtain(&self, _path: &[&str]) -> Result<Node> {
        Err(Error::read_only("obtain"))
    }

    /// Fails with [`Error::ReadOnly`].
    pub fn remove(&self) -> Result<bool> {
        Err(Error::read_only("remove"))
    }

    /// Fails with [`Error::ReadOnly`].
    pub fn clear(&self) -> Result<()> {
        Err(Error::read_only("clear"))
    }
}
