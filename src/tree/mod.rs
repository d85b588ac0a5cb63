//! The wikitext syntax tree.
//!
//! Nodes are held through cheap [`Node`] handles. The child structure is an
//! intrusive doubly-linked list: every node carries its own sibling links and
//! non-owning back-references to its parent and owning collection, while
//! ownership flows strictly parent→child (a collection owns its head, every
//! node owns its next sibling). Re-attaching a node that already has a parent
//! deep-clones it first, so a subtree only ever exists in one tree position.
//!
//! Rendering a node with [`core::fmt::Display`] reproduces exactly the text
//! it was parsed from, for any node that was not edited since parsing.

use crate::codemap::Span;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub(crate) mod list;
mod nodes;

pub use list::{Iter, NodeClass, NodeCollection, classes};
pub use nodes::{
    ArgumentReference, AttributeQuote, CellKind, Comment, Document, ExternalLink, FormatSwitch,
    Heading, HorizontalRule, ListItem, NodeKind, Paragraph, PlainText, Run, SwitchKind, Table,
    TableCell, TableRow, Tag, TagAttribute, TagStyle, Template, TemplateArgument, WikiLink,
};

use list::ListCore;

/// An error raised by a structural tree edit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// The node is held by a single-child property (or by nothing at all)
    /// rather than by a collection, so sibling edits do not apply to it.
    #[error("node is not a member of a collection")]
    NotInCollection,
}

/// Out-of-band metadata attached to a node.
///
/// This is not a general extension point; the parser only ever records the
/// source span and the inferred-closing-mark marker here.
#[derive(Clone, Debug)]
pub enum Annotation {
    /// The source range the node was parsed from.
    Span(Span),
    /// The node's closing mark was missing from the source and was inferred.
    InferredClosingMark,
}

/// The backing storage of a node.
pub(crate) struct NodeData {
    kind: NodeKind,
    links: RefCell<Links>,
    annotations: RefCell<Vec<Annotation>>,
}

/// Intrusive structure links of a node.
///
/// `parent`, `collection` and `prev` are non-owning back-references; `next`
/// owns the following sibling, forming the ownership chain of a sibling
/// list. All four are updated together by the list operations.
#[derive(Default)]
struct Links {
    parent: Option<Weak<NodeData>>,
    collection: Option<Weak<ListCore>>,
    prev: Option<Weak<NodeData>>,
    next: Option<Node>,
}

/// A handle to a syntax tree node.
///
/// Cloning the handle does not clone the node; two handles compare equal
/// exactly when they refer to the same node.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl Node {
    /// Creates a node from its variant data and wires up the back-references
    /// of any children already present in it.
    pub(crate) fn new(kind: NodeKind) -> Node {
        let node = Node(Rc::new(NodeData {
            kind,
            links: RefCell::new(Links::default()),
            annotations: RefCell::new(Vec::new()),
        }));
        let owner = Rc::downgrade(&node.0);
        nodes::visit_slots(&node.0.kind, &mut |slot| match slot {
            SlotRef::List(core) => {
                core.set_owner(owner.clone());
                let mut cursor = core.head();
                while let Some(child) = cursor {
                    child.0.links.borrow_mut().parent = Some(owner.clone());
                    cursor = child.next_sibling();
                }
            }
            SlotRef::Single(slot) => {
                slot.set_owner(owner.clone());
                if let Some(child) = slot.get() {
                    child.0.links.borrow_mut().parent = Some(owner.clone());
                }
            }
        });
        node
    }

    /// The variant data of this node.
    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// The container of this node, or `None` for a root.
    pub fn parent(&self) -> Option<Node> {
        self.0
            .links
            .borrow()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Node)
    }

    /// The previous sibling within the owning collection.
    pub fn previous_sibling(&self) -> Option<Node> {
        self.0
            .links
            .borrow()
            .prev
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Node)
    }

    /// The next sibling within the owning collection.
    pub fn next_sibling(&self) -> Option<Node> {
        self.0.links.borrow().next.clone()
    }

    /// Removes this node from its owning collection, clearing the parent and
    /// sibling links in one step.
    ///
    /// Fails with [`TreeError::NotInCollection`] if the node is held by a
    /// single-child property (such as a template's name); those are detached
    /// by replacing the property instead.
    pub fn remove(&self) -> Result<(), TreeError> {
        let core = self
            .0
            .links
            .borrow()
            .collection
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(TreeError::NotInCollection)?;
        core.unlink(self);
        Ok(())
    }

    /// Inserts `node` immediately before this node in its owning collection,
    /// returning the attached handle (a deep clone if `node` was already
    /// parented elsewhere).
    pub fn insert_before(&self, node: Node) -> Result<Node, TreeError> {
        let core = self
            .0
            .links
            .borrow()
            .collection
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(TreeError::NotInCollection)?;
        Ok(core.insert(Some(self), node, true))
    }

    /// Inserts `node` immediately after this node in its owning collection,
    /// returning the attached handle (a deep clone if `node` was already
    /// parented elsewhere).
    pub fn insert_after(&self, node: Node) -> Result<Node, TreeError> {
        let core = self
            .0
            .links
            .borrow()
            .collection
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(TreeError::NotInCollection)?;
        Ok(core.insert(Some(self), node, false))
    }

    /// Creates a structural copy of this node and its whole subtree. The
    /// copy is detached and carries the same annotations.
    pub fn deep_clone(&self) -> Node {
        let clone = Node::new(nodes::clone_kind(&self.0.kind));
        clone
            .0
            .annotations
            .borrow_mut()
            .clone_from(&self.0.annotations.borrow());
        clone
    }

    /// Iterates the direct children of this node, in document order.
    pub fn children(&self) -> Children {
        let mut sources = Vec::new();
        nodes::visit_slots(&self.0.kind, &mut |slot| {
            sources.push(match slot {
                SlotRef::List(core) => ChildSource::List(core.head()),
                SlotRef::Single(slot) => ChildSource::Single(slot.get()),
            });
        });
        Children {
            sources: sources.into_iter(),
            current: None,
        }
    }

    /// Iterates all descendants of this node in depth-first pre-order,
    /// excluding the node itself.
    ///
    /// The walk keeps an explicit stack of child iterators, so arbitrarily
    /// deep trees do not recurse on the call stack.
    pub fn descendants(&self) -> Descendants {
        Descendants {
            stack: vec![self.children()],
        }
    }

    /// The source span recorded for this node, if line tracking was
    /// requested for the parse that produced it.
    pub fn span(&self) -> Option<Span> {
        self.0.annotations.borrow().iter().find_map(|a| match a {
            Annotation::Span(span) => Some(*span),
            Annotation::InferredClosingMark => None,
        })
    }

    /// Records the source span of this node, replacing any earlier one.
    pub(crate) fn set_span(&self, span: Span) {
        let mut annotations = self.0.annotations.borrow_mut();
        for a in annotations.iter_mut() {
            if let Annotation::Span(existing) = a {
                *existing = span;
                return;
            }
        }
        annotations.push(Annotation::Span(span));
    }

    /// Returns true if this node's closing mark was missing from the source
    /// and inferred by the parser.
    pub fn closing_mark_inferred(&self) -> bool {
        self.0
            .annotations
            .borrow()
            .iter()
            .any(|a| matches!(a, Annotation::InferredClosingMark))
    }

    /// Marks this node's closing mark as inferred.
    pub(crate) fn mark_closing_inferred(&self) {
        if !self.closing_mark_inferred() {
            self.0
                .annotations
                .borrow_mut()
                .push(Annotation::InferredClosingMark);
        }
    }

    /// Prepares `node` for attachment somewhere: an unparented node is moved
    /// as-is, a parented one is deep-cloned first so the tree never aliases
    /// a subtree between two positions.
    pub(crate) fn prepare_attach(node: &Node) -> Node {
        if node.parent().is_some() {
            node.deep_clone()
        } else {
            node.clone()
        }
    }

    /// Severs all links of this node. The caller is responsible for the
    /// sibling and collection bookkeeping around it.
    pub(crate) fn clear_links(&self) {
        *self.0.links.borrow_mut() = Links::default();
    }

    pub(crate) fn set_membership(
        &self,
        parent: Option<Weak<NodeData>>,
        collection: Option<Weak<ListCore>>,
        prev: Option<Weak<NodeData>>,
        next: Option<Node>,
    ) {
        let mut links = self.0.links.borrow_mut();
        links.parent = parent;
        links.collection = collection;
        links.prev = prev;
        links.next = next;
    }

    pub(crate) fn set_prev(&self, prev: Option<Weak<NodeData>>) {
        self.0.links.borrow_mut().prev = prev;
    }

    pub(crate) fn set_next(&self, next: Option<Node>) {
        self.0.links.borrow_mut().next = next;
    }

    pub(crate) fn set_parent_raw(&self, parent: Option<Weak<NodeData>>) {
        self.0.links.borrow_mut().parent = parent;
    }

    pub(crate) fn set_collection_raw(&self, collection: Option<Weak<ListCore>>) {
        self.0.links.borrow_mut().collection = collection;
    }

    pub(crate) fn take_next(&self) -> Option<Node> {
        self.0.links.borrow_mut().next.take()
    }

    pub(crate) fn prev_raw(&self) -> Option<Weak<NodeData>> {
        self.0.links.borrow().prev.clone()
    }

    pub(crate) fn downgrade(&self) -> Weak<NodeData> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn same_core(&self, core: &Rc<ListCore>) -> bool {
        self.0
            .links
            .borrow()
            .collection
            .as_ref()
            .is_some_and(|c| Weak::ptr_eq(c, &Rc::downgrade(core)))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl core::fmt::Display for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        nodes::emit(self, f)
    }
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct(self.0.kind.name());
        if let Some(span) = self.span() {
            s.field("span", &format_args!("{span}"));
        }
        s.field("text", &self.to_string()).finish()
    }
}

/// A reference to one child slot of a node, used to wire back-references and
/// to enumerate children without duplicating the per-variant layout.
pub(crate) enum SlotRef<'a> {
    List(&'a Rc<ListCore>),
    Single(&'a NodeSlot),
}

/// A single-child property of a node.
///
/// Unlike collection membership, a property child has a parent but no owning
/// collection; [`Node::remove`] refuses to operate on it and callers replace
/// the property instead.
pub(crate) struct NodeSlot {
    owner: RefCell<Option<Weak<NodeData>>>,
    child: RefCell<Option<Node>>,
}

impl NodeSlot {
    pub(crate) fn new(child: Option<Node>) -> Self {
        Self {
            owner: RefCell::new(None),
            child: RefCell::new(child),
        }
    }

    pub(crate) fn get(&self) -> Option<Node> {
        self.child.borrow().clone()
    }

    /// Replaces the held child, returning the detached previous one.
    pub(crate) fn set(&self, child: Option<Node>) -> Option<Node> {
        let child = child.map(|c| {
            let c = Node::prepare_attach(&c);
            c.set_parent_raw(self.owner.borrow().clone());
            c
        });
        let old = self.child.replace(child);
        if let Some(old) = &old {
            old.set_parent_raw(None);
        }
        old
    }

    pub(crate) fn set_owner(&self, owner: Weak<NodeData>) {
        *self.owner.borrow_mut() = Some(owner);
    }
}

enum ChildSource {
    Single(Option<Node>),
    List(Option<Node>),
}

/// Iterator over the direct children of a node.
pub struct Children {
    sources: std::vec::IntoIter<ChildSource>,
    current: Option<ChildSource>,
}

impl Iterator for Children {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        loop {
            match &mut self.current {
                None => self.current = Some(self.sources.next()?),
                Some(ChildSource::Single(child)) => {
                    let child = child.take();
                    self.current = None;
                    if let Some(child) = child {
                        return Some(child);
                    }
                }
                Some(ChildSource::List(cursor)) => match cursor.take() {
                    Some(node) => {
                        *cursor = node.next_sibling();
                        return Some(node);
                    }
                    None => self.current = None,
                },
            }
        }
    }
}

/// Iterator over all descendants of a node in depth-first pre-order.
pub struct Descendants {
    stack: Vec<Children>,
}

impl Iterator for Descendants {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(node) => {
                    self.stack.push(node.children());
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
