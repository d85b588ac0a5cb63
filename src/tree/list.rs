//! Ordered child collections, implemented as intrusive doubly-linked lists.
//!
//! One untyped [`ListCore`] carries all of the link bookkeeping; the public
//! [`NodeCollection`] wraps it with a compile-time child-class parameter so
//! each node variant exposes collections of the right child kind without
//! duplicating the list logic.

use super::{Node, NodeData, NodeKind, TreeError};
use crate::helpers::normalize_argument_name;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

/// A family of node kinds a collection accepts.
pub trait NodeClass {
    /// Human-readable class name, used in violation messages.
    const NAME: &'static str;

    /// Returns true if a node of the given kind belongs to this class.
    fn admits(kind: &NodeKind) -> bool;
}

/// The child-class markers used by the node catalog.
pub mod classes {
    use super::super::NodeKind;
    use super::NodeClass;

    macro_rules! class {
        ($(#[$doc:meta])* $name:ident, $pattern:pat) => {
            $(#[$doc])*
            #[derive(Clone, Copy, Debug)]
            pub struct $name;

            impl NodeClass for $name {
                const NAME: &'static str = stringify!($name);

                fn admits(kind: &NodeKind) -> bool {
                    matches!(kind, $pattern)
                }
            }
        };
    }

    class!(
        /// Inline flow items.
        Inline,
        NodeKind::PlainText(_)
            | NodeKind::WikiLink(_)
            | NodeKind::ExternalLink(_)
            | NodeKind::FormatSwitch(_)
            | NodeKind::Template(_)
            | NodeKind::ArgumentReference(_)
            | NodeKind::Tag(_)
            | NodeKind::Comment(_)
            | NodeKind::Run(_)
    );
    class!(
        /// Line-level items of a document.
        Line,
        NodeKind::Paragraph(_)
            | NodeKind::Heading(_)
            | NodeKind::ListItem(_)
            | NodeKind::HorizontalRule(_)
            | NodeKind::Table(_)
    );
    class!(
        /// Template arguments.
        Argument,
        NodeKind::TemplateArgument(_)
    );
    class!(
        /// Tag attributes.
        Attribute,
        NodeKind::TagAttribute(_)
    );
    class!(
        /// Table rows.
        Row,
        NodeKind::TableRow(_)
    );
    class!(
        /// Table cells.
        Cell,
        NodeKind::TableCell(_)
    );
    class!(
        /// Nested wikitext blocks.
        Wikitext,
        NodeKind::Document(_)
    );
}

/// The untyped linked-list state shared by all collections.
pub(crate) struct ListCore {
    head: RefCell<Option<Node>>,
    tail: RefCell<Option<Weak<NodeData>>>,
    len: Cell<usize>,
    owner: RefCell<Option<Weak<NodeData>>>,
}

impl ListCore {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            head: RefCell::new(None),
            tail: RefCell::new(None),
            len: Cell::new(0),
            owner: RefCell::new(None),
        })
    }

    pub(crate) fn head(&self) -> Option<Node> {
        self.head.borrow().clone()
    }

    fn tail(&self) -> Option<Node> {
        self.tail.borrow().as_ref().and_then(Weak::upgrade).map(Node)
    }

    pub(crate) fn set_owner(&self, owner: Weak<NodeData>) {
        *self.owner.borrow_mut() = Some(owner);
    }

    /// Appends `node` at the tail, returning the attached handle.
    fn append(self: &Rc<Self>, node: Node) -> Node {
        let node = Node::prepare_attach(&node);
        let tail = self.tail();
        node.set_membership(
            self.owner.borrow().clone(),
            Some(Rc::downgrade(self)),
            tail.as_ref().map(Node::downgrade),
            None,
        );
        match &tail {
            Some(tail) => tail.set_next(Some(node.clone())),
            None => *self.head.borrow_mut() = Some(node.clone()),
        }
        *self.tail.borrow_mut() = Some(node.downgrade());
        self.len.set(self.len.get() + 1);
        node
    }

    /// Inserts `node` next to `anchor`, which must be a member of this list.
    pub(crate) fn insert(self: &Rc<Self>, anchor: Option<&Node>, node: Node, before: bool) -> Node {
        let Some(anchor) = anchor else {
            return self.append(node);
        };
        let node = Node::prepare_attach(&node);
        if before {
            let prev = anchor.previous_sibling();
            node.set_membership(
                self.owner.borrow().clone(),
                Some(Rc::downgrade(self)),
                prev.as_ref().map(Node::downgrade),
                Some(anchor.clone()),
            );
            match &prev {
                Some(prev) => prev.set_next(Some(node.clone())),
                None => *self.head.borrow_mut() = Some(node.clone()),
            }
            anchor.set_prev(Some(node.downgrade()));
        } else {
            let next = anchor.next_sibling();
            node.set_membership(
                self.owner.borrow().clone(),
                Some(Rc::downgrade(self)),
                Some(anchor.downgrade()),
                next.clone(),
            );
            match &next {
                Some(next) => next.set_prev(Some(node.downgrade())),
                None => *self.tail.borrow_mut() = Some(node.downgrade()),
            }
            anchor.set_next(Some(node.clone()));
        }
        self.len.set(self.len.get() + 1);
        node
    }

    /// Unlinks `node`, which must be a member of this list, severing its
    /// parent, collection and sibling links in one step.
    pub(crate) fn unlink(&self, node: &Node) {
        let prev = node.previous_sibling();
        let next = node.take_next();
        match &prev {
            Some(prev) => prev.set_next(next.clone()),
            None => *self.head.borrow_mut() = next.clone(),
        }
        match &next {
            Some(next) => next.set_prev(prev.as_ref().map(Node::downgrade)),
            None => *self.tail.borrow_mut() = prev.as_ref().map(Node::downgrade),
        }
        node.clear_links();
        self.len.set(self.len.get() - 1);
    }

    /// Moves every node of `src` to the tail of `self`, preserving order.
    ///
    /// The chain is spliced whole — no node is copied or re-allocated; only
    /// the moved nodes' back-references are repointed.
    fn absorb(self: &Rc<Self>, src: &Rc<Self>) {
        if Rc::ptr_eq(self, src) {
            return;
        }
        let Some(src_head) = src.head.borrow_mut().take() else {
            return;
        };
        let src_tail = src.tail.borrow_mut().take();

        let owner = self.owner.borrow().clone();
        let mut cursor = Some(src_head.clone());
        while let Some(node) = cursor {
            node.set_parent_raw(owner.clone());
            node.set_collection_raw(Some(Rc::downgrade(self)));
            cursor = node.next_sibling();
        }

        match self.tail() {
            Some(tail) => {
                src_head.set_prev(Some(tail.downgrade()));
                tail.set_next(Some(src_head));
            }
            None => *self.head.borrow_mut() = Some(src_head),
        }
        *self.tail.borrow_mut() = src_tail;
        self.len.set(self.len.get() + src.len.replace(0));
    }
}

/// An ordered collection of child nodes of one class, owned by exactly one
/// parent node.
pub struct NodeCollection<C: NodeClass> {
    core: Rc<ListCore>,
    _class: PhantomData<C>,
}

impl<C: NodeClass> NodeCollection<C> {
    pub(crate) fn new() -> Self {
        Self {
            core: ListCore::new(),
            _class: PhantomData,
        }
    }

    pub(crate) fn core(&self) -> &Rc<ListCore> {
        &self.core
    }

    fn check_class(node: &Node) {
        assert!(
            C::admits(node.kind()),
            "a {} collection cannot hold a {} node",
            C::NAME,
            node.kind().name(),
        );
    }

    /// The first member, if any.
    pub fn first(&self) -> Option<Node> {
        self.core.head()
    }

    /// The last member, if any.
    pub fn last(&self) -> Option<Node> {
        self.core.tail()
    }

    /// The number of members.
    pub fn len(&self) -> usize {
        self.core.len.get()
    }

    /// Returns true if the collection has no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `node` at the end, returning the attached handle (a deep
    /// clone if `node` was already parented elsewhere).
    ///
    /// # Panics
    ///
    /// Panics if the node's kind does not belong to this collection's class.
    pub fn append(&self, node: Node) -> Node {
        Self::check_class(&node);
        self.core.append(node)
    }

    /// Appends every node of `nodes`, in order.
    pub fn extend(&self, nodes: impl IntoIterator<Item = Node>) {
        for node in nodes {
            self.append(node);
        }
    }

    /// Inserts `node` immediately before `member`.
    pub fn insert_before(&self, member: &Node, node: Node) -> Result<Node, TreeError> {
        Self::check_class(&node);
        if !member.same_core(&self.core) {
            return Err(TreeError::NotInCollection);
        }
        Ok(self.core.insert(Some(member), node, true))
    }

    /// Inserts `node` immediately after `member`.
    pub fn insert_after(&self, member: &Node, node: Node) -> Result<Node, TreeError> {
        Self::check_class(&node);
        if !member.same_core(&self.core) {
            return Err(TreeError::NotInCollection);
        }
        Ok(self.core.insert(Some(member), node, false))
    }

    /// Removes `member` from the collection, detaching it completely.
    pub fn remove(&self, member: &Node) -> Result<(), TreeError> {
        if !member.same_core(&self.core) {
            return Err(TreeError::NotInCollection);
        }
        self.core.unlink(member);
        Ok(())
    }

    /// Moves all members of `src` to the end of this collection without
    /// copying any of them.
    pub fn absorb(&self, src: &NodeCollection<C>) {
        self.core.absorb(&src.core);
    }

    /// Iterates the members in order.
    pub fn iter(&self) -> Iter {
        Iter {
            cursor: self.core.head(),
        }
    }
}

impl NodeCollection<classes::Argument> {
    /// Looks up a template argument by name or position.
    ///
    /// The key and stored names are compared after trimming surrounding
    /// whitespace. Positional arguments occupy the names `1`..`N` in
    /// document order, and compete with explicitly-named arguments for the
    /// same key; on any collision the **last** match in document order wins,
    /// mirroring the rendering engine's last-assignment-wins semantics.
    pub fn get(&self, name: &str) -> Option<Node> {
        let wanted = normalize_argument_name(name);
        let mut found = None;
        let mut position = 0_usize;
        for member in self.iter() {
            let Some(argument) = member.kind().as_template_argument() else {
                continue;
            };
            let effective = match argument.name() {
                Some(name_node) => normalize_argument_name(&name_node.to_string()),
                None => {
                    position += 1;
                    position.to_string()
                }
            };
            if effective == wanted {
                found = Some(member.clone());
            }
        }
        found
    }
}

impl<C: NodeClass> core::fmt::Debug for NodeCollection<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over the members of a collection.
pub struct Iter {
    cursor: Option<Node>,
}

impl Iterator for Iter {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let node = self.cursor.take()?;
        self.cursor = node.next_sibling();
        Some(node)
    }
}
