//! The in-memory element tree.
//!
//! All nodes of a data set live in a single arena,
//! the [`ElementTree`],
//! and refer to each other through [`NodeId`] handles:
//! parent, previous and next sibling, first and last child.
//! Nodes are only ever created through the tree,
//! and they are dropped together with it.
//!
//! A sequence element (VR `SQ`) never holds a value.
//! Its children are item containers,
//! and the children of an item are ordinary elements
//! (which may be nested sequences).
//!
//! ```
//! # use dcmtree_core::{ElementTree, Tag, VR};
//! let mut tree = ElementTree::new();
//! let seq = tree.append_sequence(None, Tag(0x0054, 0x0016))?;
//! let item = tree.append_item(seq)?;
//! tree.append_element(Some(item), Tag(0x0018, 0x1072), VR::TM, "101500")?;
//!
//! let found = tree.find_tag(Tag(0x0018, 0x1072)).unwrap();
//! assert_eq!(found.to_string_lossy(), "101500");
//! assert_eq!(found.depth(), 1);
//! # Ok::<(), dcmtree_core::tree::TreeError>(())
//! ```

use crate::header::{DataElementHeader, Length, Tag, VR};
use crate::value;
use snafu::{ensure, Backtrace, OptionExt, Snafu};
use std::fmt;

mod search;

/// Error type for invalid tree construction.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum TreeError {
    /// The handle does not address a node of this tree
    #[snafu(display("No such node {}", id))]
    NoSuchNode { id: NodeId, backtrace: Backtrace },
    /// Items can only be attached to sequences
    #[snafu(display("Cannot attach item to {} {}, which is not a sequence", tag, vr))]
    NotASequence {
        tag: Tag,
        vr: VR,
        backtrace: Backtrace,
    },
    /// Elements can only be attached to items or to the top level
    #[snafu(display("Cannot attach element {} to {}, which is not an item", child, parent))]
    NotAnItem {
        child: Tag,
        parent: Tag,
        backtrace: Backtrace,
    },
    /// Items cannot be attached to the top level
    #[snafu(display("Items cannot be placed at the top level"))]
    TopLevelItem { backtrace: Backtrace },
    /// Sequences and items do not hold values
    #[snafu(display("Element {} cannot hold a value", tag))]
    NotALeaf { tag: Tag, backtrace: Backtrace },
    /// The invalid value representation cannot be stored
    #[snafu(display("Element {} has an invalid value representation", tag))]
    InvalidVr { tag: Tag, backtrace: Backtrace },
    /// The value does not fit in a length field
    #[snafu(display("Value of {} bytes for element {} is too long", len, tag))]
    ValueTooLong {
        tag: Tag,
        len: usize,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = TreeError> = std::result::Result<T, E>;

/// A handle to a node in an [`ElementTree`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The position of the node in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A data element, which may be a sequence
    Element,
    /// An item container inside a sequence
    Item,
}

/// A node of the element tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    header: DataElementHeader,
    value: Option<Vec<u8>>,
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

impl Node {
    /// The kind of node.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The element header. Items are recorded with the item tag,
    /// VR `UN` and the item length.
    pub fn header(&self) -> &DataElementHeader {
        &self.header
    }

    /// The value bytes, if they were stored.
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// The parent node.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The previous node at the same level.
    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    /// The next node at the same level.
    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    /// The first child node.
    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    /// The last child node.
    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }

    fn is_sequence(&self) -> bool {
        self.kind == NodeKind::Element && self.header.vr == VR::SQ
    }
}

/// An arena of data elements forming a DICOM data set.
#[derive(Debug, Default, Clone)]
pub struct ElementTree {
    nodes: Vec<Node>,
    first: Option<NodeId>,
    last: Option<NodeId>,
}

/// Make a value suitable for storage:
/// odd lengths are padded according to the VR,
/// empty values are not stored.
fn normalize_value(tag: Tag, vr: VR, mut value: Vec<u8>) -> Result<(Length, Option<Vec<u8>>)> {
    if value.len() % 2 == 1 {
        value.push(vr.padding());
    }
    ensure!(
        value.len() < u32::MAX as usize,
        ValueTooLongSnafu {
            tag,
            len: value.len()
        }
    );
    if value.is_empty() {
        Ok((Length(0), None))
    } else {
        Ok((Length(value.len() as u32), Some(value)))
    }
}

impl ElementTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// The total number of nodes, items included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Access a node by its handle.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Obtain a reference to the element addressed by the handle.
    pub fn get(&self, id: NodeId) -> Option<ElementRef<'_>> {
        let node = self.nodes.get(id.0)?;
        Some(ElementRef {
            tree: self,
            id,
            node,
        })
    }

    /// The first top-level node.
    pub fn first(&self) -> Option<NodeId> {
        self.first
    }

    /// Iterate over the top-level elements.
    pub fn roots(&self) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.first,
        }
    }

    /// Iterate over the children of a node.
    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.node(id).and_then(|n| n.first_child),
        }
    }

    /// Iterate over all nodes in depth-first pre-order,
    /// which is also the order in which they appear on the wire.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            tree: self,
            next: self.first,
        }
    }

    /// Call the visitor for every node in depth-first pre-order.
    pub fn for_each_element<F>(&self, mut visitor: F)
    where
        F: FnMut(ElementRef<'_>),
    {
        for e in self.iter() {
            visitor(e);
        }
    }

    /// Attach a new node as the last child of `parent`,
    /// or at the end of the top level.
    ///
    /// The header and value are stored as given,
    /// so that a parser can record lengths exactly as read.
    /// Only the structural rules are checked:
    /// items go into sequences,
    /// elements go into items or the top level,
    /// and sequences or items carry no value.
    pub fn attach(
        &mut self,
        parent: Option<NodeId>,
        kind: NodeKind,
        header: DataElementHeader,
        value: Option<Vec<u8>>,
    ) -> Result<NodeId> {
        match (kind, parent) {
            (NodeKind::Item, None) => return TopLevelItemSnafu.fail(),
            (NodeKind::Item, Some(p)) => {
                let pnode = self.node(p).context(NoSuchNodeSnafu { id: p })?;
                ensure!(
                    pnode.is_sequence(),
                    NotASequenceSnafu {
                        tag: pnode.header.tag,
                        vr: pnode.header.vr,
                    }
                );
            }
            (NodeKind::Element, Some(p)) => {
                let pnode = self.node(p).context(NoSuchNodeSnafu { id: p })?;
                ensure!(
                    pnode.kind == NodeKind::Item,
                    NotAnItemSnafu {
                        child: header.tag,
                        parent: pnode.header.tag,
                    }
                );
            }
            (NodeKind::Element, None) => {}
        }
        if kind == NodeKind::Element {
            ensure!(header.vr != VR::Invalid, InvalidVrSnafu { tag: header.tag });
        }
        ensure!(
            value.is_none() || (kind == NodeKind::Element && header.vr != VR::SQ),
            NotALeafSnafu { tag: header.tag }
        );

        let id = NodeId(self.nodes.len());
        let prev = match parent {
            Some(p) => self.nodes[p.0].last_child,
            None => self.last,
        };
        self.nodes.push(Node {
            kind,
            header,
            value,
            parent,
            prev_sibling: prev,
            next_sibling: None,
            first_child: None,
            last_child: None,
        });
        if let Some(prev) = prev {
            self.nodes[prev.0].next_sibling = Some(id);
        }
        match parent {
            Some(p) => {
                let pnode = &mut self.nodes[p.0];
                if pnode.first_child.is_none() {
                    pnode.first_child = Some(id);
                }
                pnode.last_child = Some(id);
            }
            None => {
                if self.first.is_none() {
                    self.first = Some(id);
                }
                self.last = Some(id);
            }
        }
        Ok(id)
    }

    /// Append a leaf element to an item, or to the top level.
    ///
    /// Values of odd length are padded to an even length,
    /// with a space for textual values and a null byte otherwise.
    pub fn append_element(
        &mut self,
        parent: Option<NodeId>,
        tag: Tag,
        vr: VR,
        value: impl Into<Vec<u8>>,
    ) -> Result<NodeId> {
        ensure!(vr != VR::SQ, NotALeafSnafu { tag });
        let (len, value) = normalize_value(tag, vr, value.into())?;
        self.attach(
            parent,
            NodeKind::Element,
            DataElementHeader::new(tag, vr, len),
            value,
        )
    }

    /// Append an empty sequence to an item, or to the top level.
    pub fn append_sequence(&mut self, parent: Option<NodeId>, tag: Tag) -> Result<NodeId> {
        self.attach(
            parent,
            NodeKind::Element,
            DataElementHeader::new(tag, VR::SQ, Length::UNDEFINED),
            None,
        )
    }

    /// Append an empty item to a sequence.
    pub fn append_item(&mut self, sequence: NodeId) -> Result<NodeId> {
        self.attach(
            Some(sequence),
            NodeKind::Item,
            DataElementHeader::new(Tag::ITEM, VR::UN, Length::UNDEFINED),
            None,
        )
    }

    /// Replace the value of a leaf element, padding it as in
    /// [`append_element`](ElementTree::append_element).
    pub fn set_value(&mut self, id: NodeId, value: impl Into<Vec<u8>>) -> Result<()> {
        let node = self.nodes.get_mut(id.0).context(NoSuchNodeSnafu { id })?;
        let tag = node.header.tag;
        ensure!(
            node.kind == NodeKind::Element && node.header.vr != VR::SQ,
            NotALeafSnafu { tag }
        );
        let (len, value) = normalize_value(tag, node.header.vr, value.into())?;
        node.header.len = len;
        node.value = value;
        Ok(())
    }

    /// The number of sequences enclosing the node.
    /// Top-level elements are at depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = self.node(id).and_then(|n| n.parent);
        while let Some(p) = cursor {
            let node = &self.nodes[p.0];
            if node.is_sequence() {
                depth += 1;
            }
            cursor = node.parent;
        }
        depth
    }

    /// The number of nested sequence levels in the tree:
    /// 0 without sequences, 1 if no sequence contains another one,
    /// and so on.
    pub fn max_depth(&self) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_sequence())
            .map(|(i, _)| self.depth(NodeId(i)) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Compare two trees by content:
    /// tag, VR, length and value of every element,
    /// and the shape of the tree.
    /// The lengths of sequences and items only describe
    /// how they were framed on the wire, and are not compared.
    pub fn structurally_eq(&self, other: &ElementTree) -> bool {
        self.levels_eq(self.first, other, other.first)
    }

    fn levels_eq(&self, mut a: Option<NodeId>, other: &ElementTree, mut b: Option<NodeId>) -> bool {
        loop {
            match (a, b) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    let (nx, ny) = (&self.nodes[x.0], &other.nodes[y.0]);
                    if nx.kind != ny.kind
                        || nx.header.tag != ny.header.tag
                        || nx.header.vr != ny.header.vr
                    {
                        return false;
                    }
                    let container = nx.kind == NodeKind::Item || nx.header.vr == VR::SQ;
                    if !container && (nx.header.len != ny.header.len || nx.value != ny.value) {
                        return false;
                    }
                    if !self.levels_eq(nx.first_child, other, ny.first_child) {
                        return false;
                    }
                    a = nx.next_sibling;
                    b = ny.next_sibling;
                }
                _ => return false,
            }
        }
    }
}

impl PartialEq for ElementTree {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other)
    }
}

/// A borrowed view of one node of an [`ElementTree`].
#[derive(Debug, Copy, Clone)]
pub struct ElementRef<'a> {
    tree: &'a ElementTree,
    id: NodeId,
    node: &'a Node,
}

impl<'a> ElementRef<'a> {
    /// The handle of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The tree which holds this node.
    pub fn tree(&self) -> &'a ElementTree {
        self.tree
    }

    /// The kind of node.
    pub fn kind(&self) -> NodeKind {
        self.node.kind
    }

    /// The element tag.
    pub fn tag(&self) -> Tag {
        self.node.header.tag
    }

    /// The value representation.
    pub fn vr(&self) -> VR {
        self.node.header.vr
    }

    /// The declared value length.
    pub fn length(&self) -> Length {
        self.node.header.len
    }

    /// The full element header.
    pub fn header(&self) -> DataElementHeader {
        self.node.header
    }

    /// The value bytes, unless they were skipped or the value is empty.
    pub fn value(&self) -> Option<&'a [u8]> {
        self.node.value.as_deref()
    }

    /// Whether this is an item container.
    pub fn is_item(&self) -> bool {
        self.node.kind == NodeKind::Item
    }

    /// Whether this is a sequence element.
    pub fn is_sequence(&self) -> bool {
        self.node.is_sequence()
    }

    /// The enclosing item or sequence.
    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.node.parent.and_then(|id| self.tree.get(id))
    }

    /// The previous node at the same level.
    pub fn prev_sibling(&self) -> Option<ElementRef<'a>> {
        self.node.prev_sibling.and_then(|id| self.tree.get(id))
    }

    /// The next node at the same level.
    pub fn next_sibling(&self) -> Option<ElementRef<'a>> {
        self.node.next_sibling.and_then(|id| self.tree.get(id))
    }

    /// The children of this node.
    pub fn children(&self) -> Siblings<'a> {
        Siblings {
            tree: self.tree,
            next: self.node.first_child,
        }
    }

    /// The number of sequences enclosing this node.
    pub fn depth(&self) -> usize {
        self.tree.depth(self.id)
    }

    /// Render the value as text.
    ///
    /// Sequences, items and values which were not read yield `"na"`,
    /// empty values yield `"empty"`.
    pub fn to_string_lossy(&self) -> String {
        if self.is_item() || self.is_sequence() {
            return "na".to_string();
        }
        if self.length() == Length(0) {
            return "empty".to_string();
        }
        match self.value() {
            Some(v) => value::render(self.vr(), v),
            None => "na".to_string(),
        }
    }

    /// Interpret the first value as an integer.
    /// Only UL, US, SL, SS and IS elements can be converted.
    pub fn to_int(&self) -> value::Result<i64> {
        let v = self.value().context(value::NoValueSnafu)?;
        value::first_integer(self.vr(), v)
    }

    /// Interpret the first value as a real number.
    /// FL, FD, DS, UL, US, SL, SS and IS elements can be converted.
    pub fn to_real(&self) -> value::Result<f64> {
        let v = self.value().context(value::NoValueSnafu)?;
        value::first_real(self.vr(), v)
    }

    /// Render a DA, TM or DT value in international notation.
    pub fn to_iso_string(&self) -> Option<String> {
        let text = value::trim_text(self.value()?);
        match self.vr() {
            VR::DA => value::date_to_iso(&text),
            VR::TM => value::time_to_iso(&text),
            VR::DT => value::datetime_to_iso(&text),
            _ => None,
        }
    }
}

/// An iterator over the nodes at one level of the tree.
#[derive(Debug, Clone)]
pub struct Siblings<'a> {
    tree: &'a ElementTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = ElementRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let e = self.tree.get(self.next?)?;
        self.next = e.node.next_sibling;
        Some(e)
    }
}

/// A depth-first pre-order iterator over all nodes of the tree.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    tree: &'a ElementTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = ElementRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let e = self.tree.get(self.next?)?;
        self.next = match e.node.first_child {
            Some(child) => Some(child),
            None => {
                let mut cursor = Some(e.node);
                let mut next = None;
                while let Some(node) = cursor {
                    if let Some(sibling) = node.next_sibling {
                        next = Some(sibling);
                        break;
                    }
                    cursor = node.parent.and_then(|p| self.tree.node(p));
                }
                next
            }
        };
        Some(e)
    }
}
