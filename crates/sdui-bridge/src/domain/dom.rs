//! Minimal mount tree shared between the bridge and the rendering runtime.
//!
//! The bridge does not render anything — the runtime owns all content
//! decisions — but two bridge responsibilities need *visibility* into
//! the mounted element tree:
//!
//! 1. Waiting for placeholder elements to materialize (the element
//!    waiter subscribes to mutations).
//! 2. Splicing resolved sub-widget output into those placeholders.
//!
//! So this module models just enough of a document tree to support
//! querying and splicing: elements with a tag, an optional id, classes,
//! string attributes, text content and children, plus a tree-wide
//! mutation version published on a `tokio::sync::watch` channel.
//!
//! Elements are handles (`Arc` inside), so clones refer to the same
//! node and the tree can be shared freely across tasks.  The tree is
//! not self-validating: callers must not append an element underneath
//! itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

// ── Selectors ─────────────────────────────────────────────────────────────────

/// The selector subset the bridge needs: tag name, `#id`, `.class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Matches elements by tag name (`div`).
    Tag(String),
    /// Matches the element whose id equals the value (`#sidebar`).
    Id(String),
    /// Matches elements carrying the class (`.widget-model-id-abc`).
    Class(String),
}

impl Selector {
    /// Parses the textual form: `#…` is an id, `.…` is a class,
    /// anything else is a tag name.
    pub fn parse(text: &str) -> Self {
        if let Some(id) = text.strip_prefix('#') {
            Self::Id(id.to_string())
        } else if let Some(class) = text.strip_prefix('.') {
            Self::Class(class.to_string())
        } else {
            Self::Tag(text.to_string())
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(t) => write!(f, "{t}"),
            Self::Id(i) => write!(f, "#{i}"),
            Self::Class(c) => write!(f, ".{c}"),
        }
    }
}

// ── Tree internals ────────────────────────────────────────────────────────────

/// Tree-wide mutation state shared by all elements of one tree.
struct TreeShared {
    /// Monotonic mutation version; bumped on every structural or
    /// attribute mutation anywhere in the tree.
    version: watch::Sender<u64>,
}

impl TreeShared {
    fn bump(&self) {
        // `send_modify` notifies subscribers even when nobody is
        // currently waiting, and never fails on zero receivers.
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

#[derive(Default)]
struct ElementState {
    id: Option<String>,
    classes: Vec<String>,
    attributes: HashMap<String, String>,
    children: Vec<Element>,
    text: String,
}

struct ElementInner {
    tag: String,
    shared: Arc<TreeShared>,
    state: RwLock<ElementState>,
}

// ── Public handles ────────────────────────────────────────────────────────────

/// A handle to one element of a mount tree.
///
/// Cloning the handle does not clone the node; both handles refer to
/// the same element.
#[derive(Clone)]
pub struct Element {
    inner: Arc<ElementInner>,
}

impl Element {
    fn new(tag: &str, shared: Arc<TreeShared>) -> Self {
        Self {
            inner: Arc::new(ElementInner {
                tag: tag.to_string(),
                shared,
                state: RwLock::new(ElementState::default()),
            }),
        }
    }

    /// Returns the element's tag name.
    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    /// Returns `true` when both handles refer to the same element.
    pub fn same(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the element's id, if one was set.
    pub fn id(&self) -> Option<String> {
        self.inner.state.read().unwrap().id.clone()
    }

    /// Sets the element's id.
    pub fn set_id(&self, id: &str) {
        self.inner.state.write().unwrap().id = Some(id.to_string());
        self.inner.shared.bump();
    }

    /// Adds a class to the element (duplicates are ignored).
    pub fn add_class(&self, class: &str) {
        {
            let mut state = self.inner.state.write().unwrap();
            if state.classes.iter().any(|c| c == class) {
                return;
            }
            state.classes.push(class.to_string());
        }
        self.inner.shared.bump();
    }

    /// Returns `true` when the element carries the class.
    pub fn has_class(&self, class: &str) -> bool {
        self.inner.state.read().unwrap().classes.iter().any(|c| c == class)
    }

    /// Sets a string attribute.
    pub fn set_attribute(&self, name: &str, value: &str) {
        self.inner
            .state
            .write()
            .unwrap()
            .attributes
            .insert(name.to_string(), value.to_string());
        self.inner.shared.bump();
    }

    /// Returns the value of an attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.state.read().unwrap().attributes.get(name).cloned()
    }

    /// Replaces the element's text content.
    pub fn set_text(&self, text: &str) {
        self.inner.state.write().unwrap().text = text.to_string();
        self.inner.shared.bump();
    }

    /// Returns the element's text content.
    pub fn text(&self) -> String {
        self.inner.state.read().unwrap().text.clone()
    }

    /// Appends a child element.
    pub fn append_child(&self, child: Element) {
        self.inner.state.write().unwrap().children.push(child);
        self.inner.shared.bump();
    }

    /// Replaces all children with `children`.
    ///
    /// This is the splice operation used for sub-widget attachment: the
    /// placeholder keeps its own identity (and thus its placeholder
    /// class), only its contents are swapped out.
    pub fn replace_children(&self, children: Vec<Element>) {
        self.inner.state.write().unwrap().children = children;
        self.inner.shared.bump();
    }

    /// Returns the element's children (handles, in order).
    pub fn children(&self) -> Vec<Element> {
        self.inner.state.read().unwrap().children.clone()
    }

    /// Returns `true` when this element matches the selector.
    pub fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Tag(tag) => self.inner.tag == *tag,
            Selector::Id(id) => self.id().as_deref() == Some(id.as_str()),
            Selector::Class(class) => self.has_class(class),
        }
    }

    /// Returns all descendants matching the selector, in depth-first
    /// document order.  The element itself is not considered.
    pub fn query_all(&self, selector: &Selector) -> Vec<Element> {
        let mut found = Vec::new();
        for child in self.children() {
            child.collect_matches(selector, &mut found);
        }
        found
    }

    fn collect_matches(&self, selector: &Selector, out: &mut Vec<Element>) {
        if self.matches(selector) {
            out.push(self.clone());
        }
        for child in self.children() {
            child.collect_matches(selector, out);
        }
    }

    /// Creates an independent deep copy of this element and its subtree.
    ///
    /// One rendered subtree cannot sit under two parents; splicing the
    /// same sub-widget into several placeholders therefore instantiates
    /// a copy per placeholder.  The copy belongs to the same tree (for
    /// mutation notification) but shares no state with the original.
    pub fn deep_clone(&self) -> Element {
        let copy = Element::new(&self.inner.tag, Arc::clone(&self.inner.shared));
        let state = self.inner.state.read().unwrap();
        {
            let mut copy_state = copy.inner.state.write().unwrap();
            copy_state.id = state.id.clone();
            copy_state.classes = state.classes.clone();
            copy_state.attributes = state.attributes.clone();
            copy_state.text = state.text.clone();
            copy_state.children = state.children.iter().map(Element::deep_clone).collect();
        }
        copy
    }

    /// Subscribes to the mutation version of the tree this element
    /// belongs to.  The receiver wakes on every subsequent mutation
    /// anywhere in the tree.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.shared.version.subscribe()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read().unwrap();
        f.debug_struct("Element")
            .field("tag", &self.inner.tag)
            .field("id", &state.id)
            .field("classes", &state.classes)
            .field("children", &state.children.len())
            .finish()
    }
}

/// One mount tree: a root element plus the tree-wide mutation version.
pub struct MountTree {
    shared: Arc<TreeShared>,
    root: Element,
}

impl MountTree {
    /// Creates an empty tree with a `body` root.
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let shared = Arc::new(TreeShared { version });
        let root = Element::new("body", Arc::clone(&shared));
        Self { shared, root }
    }

    /// Returns a handle to the root element.
    pub fn root(&self) -> Element {
        self.root.clone()
    }

    /// Creates a detached element belonging to this tree.
    ///
    /// The element participates in mutation notification from the
    /// moment of creation, attached or not.
    pub fn create_element(&self, tag: &str) -> Element {
        Element::new(tag, Arc::clone(&self.shared))
    }

    /// Subscribes to the tree-wide mutation version.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.shared.version.subscribe()
    }
}

impl Default for MountTree {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse_forms() {
        assert_eq!(Selector::parse("div"), Selector::Tag("div".into()));
        assert_eq!(Selector::parse("#main"), Selector::Id("main".into()));
        assert_eq!(Selector::parse(".note"), Selector::Class("note".into()));
    }

    #[test]
    fn test_selector_display_round_trips() {
        for text in ["div", "#main", ".note"] {
            assert_eq!(Selector::parse(text).to_string(), text);
        }
    }

    #[test]
    fn test_query_all_finds_nested_matches_in_document_order() {
        // Arrange: body > section(.hit) > div(.hit), body > div
        let tree = MountTree::new();
        let section = tree.create_element("section");
        section.add_class("hit");
        let inner = tree.create_element("div");
        inner.add_class("hit");
        section.append_child(inner.clone());
        tree.root().append_child(section.clone());
        tree.root().append_child(tree.create_element("div"));

        // Act
        let hits = tree.root().query_all(&Selector::Class("hit".into()));

        // Assert: depth-first order, the container itself excluded
        assert_eq!(hits.len(), 2);
        assert!(hits[0].same(&section));
        assert!(hits[1].same(&inner));
    }

    #[test]
    fn test_query_all_excludes_container_itself() {
        let tree = MountTree::new();
        let el = tree.create_element("div");
        el.add_class("x");
        tree.root().append_child(el);

        // The matching element does not find itself
        let found = tree.root().query_all(&Selector::Tag("body".into()));
        assert!(found.is_empty());
    }

    #[test]
    fn test_query_by_id_and_tag() {
        let tree = MountTree::new();
        let el = tree.create_element("span");
        el.set_id("status");
        tree.root().append_child(el.clone());

        assert!(tree.root().query_all(&Selector::Id("status".into()))[0].same(&el));
        assert!(tree.root().query_all(&Selector::Tag("span".into()))[0].same(&el));
        assert!(tree.root().query_all(&Selector::Id("other".into())).is_empty());
    }

    #[test]
    fn test_mutations_bump_the_tree_version() {
        let tree = MountTree::new();
        let rx = tree.changes();
        let before = *rx.borrow();

        let el = tree.create_element("div");
        el.add_class("a");
        el.set_attribute("k", "v");
        tree.root().append_child(el);

        assert!(*rx.borrow() > before, "mutations must advance the version");
    }

    #[test]
    fn test_duplicate_class_is_ignored_and_does_not_notify() {
        let tree = MountTree::new();
        let el = tree.create_element("div");
        el.add_class("a");

        let rx = tree.changes();
        let before = *rx.borrow();
        el.add_class("a");

        assert_eq!(*rx.borrow(), before);
        assert!(el.has_class("a"));
    }

    #[test]
    fn test_replace_children_swaps_content_keeps_identity() {
        // Arrange: a placeholder with filler content
        let tree = MountTree::new();
        let placeholder = tree.create_element("div");
        placeholder.add_class("widget-model-id-abc");
        placeholder.append_child(tree.create_element("span"));
        tree.root().append_child(placeholder.clone());

        // Act: splice in the rendered sub-widget
        let widget = tree.create_element("section");
        placeholder.replace_children(vec![widget.clone()]);

        // Assert: contents swapped, placeholder still findable by class
        let children = placeholder.children();
        assert_eq!(children.len(), 1);
        assert!(children[0].same(&widget));
        assert!(placeholder.has_class("widget-model-id-abc"));
    }

    #[test]
    fn test_clone_is_the_same_element() {
        let tree = MountTree::new();
        let el = tree.create_element("div");
        let alias = el.clone();

        alias.set_id("shared");

        assert_eq!(el.id().as_deref(), Some("shared"));
        assert!(el.same(&alias));
    }

    #[test]
    fn test_deep_clone_copies_the_subtree_without_sharing_state() {
        // Arrange
        let tree = MountTree::new();
        let original = tree.create_element("section");
        original.set_attribute("data-widget", "table");
        let child = tree.create_element("span");
        child.set_text("cell");
        original.append_child(child);

        // Act
        let copy = original.deep_clone();
        copy.set_attribute("data-widget", "changed");

        // Assert: structure copied, mutations independent
        assert!(!copy.same(&original));
        assert_eq!(copy.children().len(), 1);
        assert_eq!(copy.children()[0].text(), "cell");
        assert_eq!(original.attribute("data-widget").as_deref(), Some("table"));
    }

    #[test]
    fn test_text_content() {
        let tree = MountTree::new();
        let el = tree.create_element("script");
        el.set_text(r#"{"baseUrl": "http://x/"}"#);
        assert_eq!(el.text(), r#"{"baseUrl": "http://x/"}"#);
    }
}
