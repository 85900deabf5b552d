//! Nodes
//!
//! The tree-participating unit: lifecycle state, parent/root handles,
//! index bookkeeping, layout slot, change-tracking flags, and the owned
//! sparse property store. Parent and root are non-owning back-handles
//! into the arena, so no reference cycles exist between parent and
//! child.

use crate::{Message, Rect, View};
use trellis_props::{MessageId, ObjectType, PropertyKey, PropertyStore, Value};

use crate::message::DispatchModes;
use crate::tree::LogicalTree;

/// Node identifier - stable handle into the tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Lifecycle state machine
///
/// `Initial -> Loading -> Loaded -> Unloading -> Unloaded`, and
/// `Unloaded` may re-enter `Loading` when the node is reattached to a
/// (possibly different) tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Initial,
    Loading,
    Loaded,
    Unloading,
    Unloaded,
}

/// Node kind - which capabilities the node carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Leaf: participates in the tree but owns no children
    Node,
    /// Owns an ordered child list
    Element,
    /// An element anchoring the tree to a view
    Root,
}

impl NodeKind {
    /// Whether this kind owns children
    #[inline]
    pub fn is_element(self) -> bool {
        matches!(self, NodeKind::Element | NodeKind::Root)
    }
}

/// Owner policy answer for child insertion/removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildPolicy {
    /// Proceed with the mutation
    #[default]
    Accept,
    /// Reject: surfaces as [`TreeError::Refused`](crate::TreeError::Refused)
    Refuse,
    /// Policy no-op: the collection stays unchanged, no error
    Cancel,
}

/// Arguments of a pre-change notification; the hook may cancel
#[derive(Debug)]
pub struct ChangingArgs {
    pub key: PropertyKey,
    /// `None` when the key was previously absent
    pub old: Option<Value>,
    pub new: Value,
    cancel: bool,
}

impl ChangingArgs {
    pub(crate) fn new(key: PropertyKey, old: Option<Value>, new: Value) -> Self {
        Self { key, old, new, cancel: false }
    }

    /// Abort the mutation; the store is left untouched
    pub fn cancel(&mut self) {
        self.cancel = true;
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel
    }
}

/// Per-node extension points
///
/// The dynamic surface an element-like type implements instead of a
/// virtual-inheritance chain: child acceptance policy, attach/detach,
/// change notifications, and the message receive/preview hooks. All
/// methods have defaults, so implementors override only what they need.
///
/// Mutating hooks receive `&mut LogicalTree` and may reenter the tree;
/// the runtime takes the hook box out of its node for the duration of
/// the call.
#[allow(unused_variables)]
pub trait NodeHooks {
    /// Asked before a child is inserted under this node
    fn accept_child(&self, child: NodeId) -> ChildPolicy {
        ChildPolicy::Accept
    }

    /// Asked before a child is removed from under this node
    fn release_child(&self, child: NodeId) -> ChildPolicy {
        ChildPolicy::Accept
    }

    /// The node entered `Loading` and recorded its root
    fn on_attached(&mut self, tree: &mut LogicalTree, node: NodeId) {}

    /// The node is `Unloading`; children are already unloaded
    fn on_detached(&mut self, tree: &mut LogicalTree, node: NodeId) {}

    /// Pre-change notification; call [`ChangingArgs::cancel`] to abort
    fn on_property_changing(&mut self, tree: &mut LogicalTree, node: NodeId, args: &mut ChangingArgs) {}

    /// Post-change notification; the store already holds the new value
    fn on_property_changed(&mut self, tree: &mut LogicalTree, node: NodeId, name: &str, key: PropertyKey) {}

    /// Tree-wide interception point, offered to the root before any
    /// propagation
    fn preview(&mut self, tree: &mut LogicalTree, node: NodeId, msg: &mut Message) {}

    /// Receive a message during the bubble or tunnel phase
    fn receive(&mut self, tree: &mut LogicalTree, node: NodeId, msg: &mut Message) {}

    /// Override which dispatch modes apply to a message kind
    /// originating here; `None` keeps the message's own modes
    fn modes_for(&self, id: MessageId) -> Option<DispatchModes> {
        None
    }
}

/// A node in the logical tree
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) parent: NodeId,
    /// Root handle; valid only while `Loading`/`Loaded`
    pub(crate) root: NodeId,
    /// Position among all children of the owning element, -1 out of tree
    pub(crate) tree_index: i32,
    /// Position within the typed collection the node was added through
    pub(crate) collection_index: i32,
    /// Cached layout rectangle
    pub slot: Rect,
    /// Emit pre-change notifications on tracked mutation
    pub track_changing: bool,
    /// Emit post-change notifications on tracked mutation
    pub track_changed: bool,
    pub(crate) owner_type: Option<ObjectType>,
    pub(crate) props: PropertyStore,
    pub(crate) children: Vec<NodeId>,
    pub(crate) hooks: Option<Box<dyn NodeHooks>>,
    /// Present only on root nodes
    pub(crate) view: Option<Box<dyn View>>,
    pub(crate) changed_listeners: Vec<Box<dyn FnMut(&str)>>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            lifecycle: Lifecycle::Initial,
            parent: NodeId::NONE,
            root: NodeId::NONE,
            tree_index: -1,
            collection_index: -1,
            slot: Rect::ZERO,
            track_changing: false,
            track_changed: false,
            owner_type: None,
            props: PropertyStore::new(),
            children: Vec::new(),
            hooks: None,
            view: None,
            changed_listeners: Vec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[inline]
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// The tree's root handle; `NONE` unless `Loading`/`Loaded`
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn tree_index(&self) -> i32 {
        self.tree_index
    }

    #[inline]
    pub fn collection_index(&self) -> i32 {
        self.collection_index
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind.is_element()
    }

    /// The owner type the registry resolves property names against
    #[inline]
    pub fn owner_type(&self) -> Option<ObjectType> {
        self.owner_type
    }

    /// Direct child handles, in tree-index order
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The node's property store
    #[inline]
    pub fn props(&self) -> &PropertyStore {
        &self.props
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("lifecycle", &self.lifecycle)
            .field("parent", &self.parent)
            .field("root", &self.root)
            .field("tree_index", &self.tree_index)
            .field("collection_index", &self.collection_index)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_out_of_tree() {
        let node = Node::new(NodeKind::Node);
        assert_eq!(node.lifecycle(), Lifecycle::Initial);
        assert_eq!(node.parent(), NodeId::NONE);
        assert_eq!(node.root(), NodeId::NONE);
        assert_eq!(node.tree_index(), -1);
        assert_eq!(node.collection_index(), -1);
        assert!(!node.is_element());
    }

    #[test]
    fn test_node_id_sentinel() {
        assert!(!NodeId::NONE.is_valid());
        assert!(NodeId(0).is_valid());
    }

    #[test]
    fn test_kind_is_element() {
        assert!(NodeKind::Element.is_element());
        assert!(NodeKind::Root.is_element());
        assert!(!NodeKind::Node.is_element());
    }
}
