//! Logical Tree (arena-based allocation)
//!
//! Nodes live in an arena and are addressed by stable [`NodeId`]
//! handles; parent/root references are handles too, never owning
//! pointers. The tree owns the lifecycle walk, the child
//! insertion/removal protocol with its index bookkeeping, and the
//! tracked property-mutation pipeline.
//!
//! Single-threaded by design. Hooks may reenter the tree: the hook box
//! is taken out of its node for the duration of a call.

use std::collections::VecDeque;

use crate::error::{TreeError, TreeResult};
use crate::message::{Message, PropertyChange};
use crate::node::{ChangingArgs, ChildPolicy, Lifecycle, Node, NodeHooks, NodeId, NodeKind};
use crate::View;
use crate::dispatch::dispatch;
use trellis_props::{ObjectType, PropertyKey, Value, name_of};

/// Outcome of a tracked property mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The store was mutated and notifications were raised
    Changed,
    /// Old and new value compared equal; nothing happened
    Unchanged,
    /// A pre-change hook cancelled; the store is untouched
    Cancelled,
}

/// Arena of logical-tree nodes
#[derive(Default)]
pub struct LogicalTree {
    nodes: Vec<Node>,
}

impl LogicalTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a leaf node
    pub fn create_node(&mut self) -> NodeId {
        self.push(Node::new(NodeKind::Node))
    }

    /// Create an element (owns children)
    pub fn create_element(&mut self) -> NodeId {
        self.push(Node::new(NodeKind::Element))
    }

    /// Create a root element anchored to a view
    pub fn create_root(&mut self, view: Box<dyn View>) -> NodeId {
        let mut node = Node::new(NodeKind::Root);
        node.view = Some(view);
        self.push(node)
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get a node by id
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by id
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Install the extension hooks for a node
    pub fn set_hooks(&mut self, id: NodeId, hooks: Box<dyn NodeHooks>) {
        self.node_mut(id).hooks = Some(hooks);
    }

    /// Set the owner type used for lazy property-name resolution
    pub fn set_owner_type(&mut self, id: NodeId, owner: ObjectType) {
        self.node_mut(id).owner_type = Some(owner);
    }

    /// Run a closure against a node's hooks, with the tree reborrowable.
    ///
    /// The hook box is taken out of the node so the hook may reenter the
    /// tree; `None` when the node has no hooks installed.
    pub(crate) fn with_hooks<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn NodeHooks, &mut LogicalTree) -> R,
    ) -> Option<R> {
        let mut hooks = self.node_mut(id).hooks.take()?;
        let out = f(hooks.as_mut(), self);
        let slot = &mut self.node_mut(id).hooks;
        if slot.is_none() {
            *slot = Some(hooks);
        }
        Some(out)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Attach a node (and its subtree) to a tree rooted at `root`.
    ///
    /// Idempotent: a no-op while already `Loading` or `Loaded`. The
    /// property store is never touched by attach/detach, so a reattached
    /// node keeps all its values.
    pub fn load(&mut self, id: NodeId, root: NodeId) {
        let lifecycle = self.node(id).lifecycle;
        if matches!(lifecycle, Lifecycle::Loading | Lifecycle::Loaded) {
            return;
        }
        tracing::debug!(node = id.0, root = root.0, "loading node");
        {
            let node = self.node_mut(id);
            node.lifecycle = Lifecycle::Loading;
            node.root = root;
        }
        self.with_hooks(id, |hooks, tree| hooks.on_attached(tree, id));
        let children = self.node(id).children.clone();
        for child in children {
            self.load(child, root);
        }
        self.node_mut(id).lifecycle = Lifecycle::Loaded;
    }

    /// Detach a node: children unload first, then the detach hook runs,
    /// then the root handle is cleared.
    pub fn unload(&mut self, id: NodeId) {
        let lifecycle = self.node(id).lifecycle;
        if matches!(
            lifecycle,
            Lifecycle::Initial | Lifecycle::Unloading | Lifecycle::Unloaded
        ) {
            return;
        }
        tracing::debug!(node = id.0, "unloading node");
        self.node_mut(id).lifecycle = Lifecycle::Unloading;
        let children = self.node(id).children.clone();
        for child in children {
            self.unload(child);
        }
        self.with_hooks(id, |hooks, tree| hooks.on_detached(tree, id));
        let node = self.node_mut(id);
        node.root = NodeId::NONE;
        node.lifecycle = Lifecycle::Unloaded;
    }

    /// A node is tree-loaded only while `Loaded` *and* the reachable
    /// root's view is present. A detached root's subtree reports "not
    /// loaded" before unload propagates.
    pub fn is_tree_loaded(&self, id: NodeId) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        if node.lifecycle != Lifecycle::Loaded {
            return false;
        }
        let root = if node.kind == NodeKind::Root { id } else { node.root };
        if !root.is_valid() {
            return false;
        }
        self.get(root)
            .and_then(|r| r.view.as_ref())
            .is_some_and(|view| view.is_visible())
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Ancestor handles, innermost first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(id).parent;
        while current.is_valid() {
            out.push(current);
            current = self.node(current).parent;
        }
        out
    }

    /// The topmost ancestor (the node itself when detached)
    pub fn find_root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        loop {
            let parent = self.node(current).parent;
            if !parent.is_valid() {
                return current;
            }
            current = parent;
        }
    }

    /// Descendants in depth-first pre-order: a child is yielded, then
    /// its own subtree, then the next sibling
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.node(id).children {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    /// Descendants level by level (queue-based)
    pub fn descendants_breadth_first(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(id);
        while let Some(current) = queue.pop_front() {
            for &child in &self.node(current).children {
                out.push(child);
                queue.push_back(child);
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Child collection protocol
    // ------------------------------------------------------------------

    /// Number of children under an element
    pub fn child_count(&self, parent: NodeId) -> usize {
        self.node(parent).children.len()
    }

    /// Append a child; see [`insert_child`](Self::insert_child)
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<bool> {
        let index = self.node(parent).children.len();
        self.insert_child(parent, index, child)
    }

    /// Insert a child at a position in the untyped children list.
    ///
    /// Returns `Ok(true)` when the child was inserted, `Ok(false)` when
    /// the owner's policy cancelled (the collection is unchanged). All
    /// structural checks run before the first index shift, so a failed
    /// insert leaves the collection untouched.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> TreeResult<bool> {
        self.get(child).ok_or(TreeError::NotFound)?;
        let parent_node = self.get(parent).ok_or(TreeError::NotFound)?;
        if !parent_node.is_element() {
            return Err(TreeError::NotAnElement);
        }
        let len = parent_node.children.len();
        if index > len {
            return Err(TreeError::OutOfRange { index, len });
        }
        match self.accept_policy(parent, child) {
            ChildPolicy::Refuse => return Err(TreeError::Refused),
            ChildPolicy::Cancel => {
                tracing::trace!(parent = parent.0, child = child.0, "insert cancelled by owner");
                return Ok(false);
            }
            ChildPolicy::Accept => {}
        }
        if self.node(child).parent.is_valid() {
            return Err(TreeError::AlreadyParented);
        }

        self.node_mut(parent).children.insert(index, child);
        self.renumber_from(parent, index);
        self.node_mut(child).parent = parent;
        tracing::debug!(parent = parent.0, child = child.0, index, "child inserted");

        // A parent that is already in a tree pulls the child in with it.
        let parent_state = self.node(parent).lifecycle;
        if matches!(parent_state, Lifecycle::Loading | Lifecycle::Loaded) {
            let root = self.root_of(parent);
            self.load(child, root);
        }
        Ok(true)
    }

    /// Remove the child at a position.
    ///
    /// Returns the removed node's id, or `None` when the owner's policy
    /// cancelled the removal.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> TreeResult<Option<NodeId>> {
        let parent_node = self.get(parent).ok_or(TreeError::NotFound)?;
        if !parent_node.is_element() {
            return Err(TreeError::NotAnElement);
        }
        let len = parent_node.children.len();
        if index >= len {
            return Err(TreeError::OutOfRange { index, len });
        }
        let child = parent_node.children[index];
        match self.release_policy(parent, child) {
            ChildPolicy::Refuse => return Err(TreeError::Refused),
            ChildPolicy::Cancel => {
                tracing::trace!(parent = parent.0, child = child.0, "removal cancelled by owner");
                return Ok(None);
            }
            ChildPolicy::Accept => {}
        }

        self.node_mut(parent).children.remove(index);
        {
            let node = self.node_mut(child);
            node.tree_index = -1;
            node.collection_index = -1;
            node.parent = NodeId::NONE;
        }
        self.renumber_from(parent, index);
        tracing::debug!(parent = parent.0, child = child.0, index, "child removed");
        self.unload(child);
        Ok(Some(child))
    }

    /// Remove a specific child node
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<Option<NodeId>> {
        let index = self
            .get(parent)
            .ok_or(TreeError::NotFound)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(TreeError::NotFound)?;
        self.remove_child_at(parent, index)
    }

    /// Bulk clear: suspends per-remove index shifting and invalidates
    /// all indices at once, then unloads every removed child.
    pub fn clear_children(&mut self, parent: NodeId) -> TreeResult<usize> {
        let parent_node = self.get(parent).ok_or(TreeError::NotFound)?;
        if !parent_node.is_element() {
            return Err(TreeError::NotAnElement);
        }
        let children = std::mem::take(&mut self.node_mut(parent).children);
        for &child in &children {
            let node = self.node_mut(child);
            node.tree_index = -1;
            node.collection_index = -1;
            node.parent = NodeId::NONE;
        }
        for &child in &children {
            self.unload(child);
        }
        tracing::debug!(parent = parent.0, count = children.len(), "children cleared");
        Ok(children.len())
    }

    fn accept_policy(&self, parent: NodeId, child: NodeId) -> ChildPolicy {
        self.node(parent)
            .hooks
            .as_ref()
            .map(|h| h.accept_child(child))
            .unwrap_or_default()
    }

    fn release_policy(&self, parent: NodeId, child: NodeId) -> ChildPolicy {
        self.node(parent)
            .hooks
            .as_ref()
            .map(|h| h.release_child(child))
            .unwrap_or_default()
    }

    /// Re-derive tree indices for children at positions >= `start`
    fn renumber_from(&mut self, parent: NodeId, start: usize) {
        let tail: Vec<NodeId> = self.node(parent).children[start..].to_vec();
        for (offset, id) in tail.into_iter().enumerate() {
            self.node_mut(id).tree_index = (start + offset) as i32;
        }
    }

    /// The root handle a child of `parent` should load against
    pub(crate) fn root_of(&self, parent: NodeId) -> NodeId {
        let node = self.node(parent);
        if node.kind == NodeKind::Root { parent } else { node.root }
    }

    // ------------------------------------------------------------------
    // Property access
    // ------------------------------------------------------------------

    /// Read a property value
    pub fn value(&self, id: NodeId, key: PropertyKey) -> Option<&Value> {
        self.node(id).props.get(key)
    }

    /// Check whether a property holds a value
    pub fn has_value(&self, id: NodeId, key: PropertyKey) -> bool {
        self.node(id).props.contains(key)
    }

    /// Write a property value directly, bypassing change tracking
    pub fn set_value(&mut self, id: NodeId, key: PropertyKey, value: Value) {
        self.node_mut(id).props.set(key, value);
    }

    /// Clear a property value
    pub fn clear_value(&mut self, id: NodeId, key: PropertyKey) {
        self.node_mut(id).props.remove(key);
    }

    /// Subscribe to the node's property-changed signal (name only,
    /// raised after the store has been mutated)
    pub fn listen_property_changed(&mut self, id: NodeId, listener: Box<dyn FnMut(&str)>) {
        self.node_mut(id).changed_listeners.push(listener);
    }

    /// Tracked property mutation; the display name is resolved through
    /// the registry only if a notification is actually raised
    pub fn set_tracked(&mut self, id: NodeId, key: PropertyKey, value: Value) -> SetOutcome {
        self.set_tracked_impl(id, key, value, None)
    }

    /// Tracked mutation with an explicit display name, suppressing the
    /// registry lookup
    pub fn set_tracked_named(
        &mut self,
        id: NodeId,
        key: PropertyKey,
        value: Value,
        name: &str,
    ) -> SetOutcome {
        self.set_tracked_impl(id, key, value, Some(name))
    }

    fn set_tracked_impl(
        &mut self,
        id: NodeId,
        key: PropertyKey,
        value: Value,
        explicit_name: Option<&str>,
    ) -> SetOutcome {
        let (track_changing, track_changed) = {
            let node = self.node(id);
            (node.track_changing, node.track_changed)
        };
        // Fast path: nothing observes this node's changes.
        if !track_changing && !track_changed {
            self.node_mut(id).props.set(key, value);
            return SetOutcome::Changed;
        }

        let old = self.node(id).props.get(key).cloned();
        if old.as_ref() == Some(&value) {
            return SetOutcome::Unchanged;
        }

        if track_changing {
            let mut args = ChangingArgs::new(key, old.clone(), value.clone());
            self.with_hooks(id, |hooks, tree| hooks.on_property_changing(tree, id, &mut args));
            if args.is_cancelled() {
                tracing::trace!(node = id.0, key = key.raw(), "property change cancelled");
                return SetOutcome::Cancelled;
            }
        }

        self.node_mut(id).props.set(key, value.clone());

        if track_changed {
            let name = match explicit_name {
                Some(name) => name.to_string(),
                None => self
                    .node(id)
                    .owner_type
                    .map(|owner| name_of(owner, key))
                    .unwrap_or_default(),
            };
            self.with_hooks(id, |hooks, tree| hooks.on_property_changed(tree, id, &name, key));
            if self.is_tree_loaded(id) {
                let mut msg = Message::property_changed(PropertyChange {
                    key,
                    name: name.clone(),
                    old,
                    new: value,
                });
                dispatch(self, &mut msg, id);
                // Observers have seen the change; the owning presenter
                // repaints the node last.
                self.request_refresh(id);
            }
            self.raise_property_changed(id, &name);
        }
        SetOutcome::Changed
    }

    /// Ask the tree's presenter (the root's view) to repaint a node
    fn request_refresh(&mut self, id: NodeId) {
        let root = {
            let node = self.node(id);
            if node.kind == NodeKind::Root { id } else { node.root }
        };
        if !root.is_valid() {
            return;
        }
        if let Some(view) = self.node_mut(root).view.as_mut() {
            view.refresh_node(id);
        }
    }

    fn raise_property_changed(&mut self, id: NodeId, name: &str) {
        // Listeners have no tree access, so take-and-restore is safe.
        let mut listeners = std::mem::take(&mut self.node_mut(id).changed_listeners);
        for listener in listeners.iter_mut() {
            listener(name);
        }
        self.node_mut(id).changed_listeners = listeners;
    }
}

impl std::fmt::Debug for LogicalTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalTree").field("nodes", &self.nodes.len()).finish()
    }
}
