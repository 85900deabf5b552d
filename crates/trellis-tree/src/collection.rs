//! Typed Child Collections
//!
//! A strongly-typed, ordered view over one element's children. Every
//! insert/remove goes through the tree's untyped child protocol, so
//! traversal code stays type-erased; the view independently maintains
//! the per-item collection index, which is distinct from the tree index
//! because several typed views may funnel into one backing list.

use std::marker::PhantomData;

use crate::error::{TreeError, TreeResult};
use crate::node::{NodeId, NodeKind};
use crate::tree::LogicalTree;

/// Compile-time filter pinning which node kinds a typed view accepts
pub trait NodeMarker {
    fn accepts(kind: NodeKind) -> bool;
}

/// Accepts every node kind
pub struct AnyNode;

impl NodeMarker for AnyNode {
    fn accepts(_kind: NodeKind) -> bool {
        true
    }
}

/// Accepts only nodes that own children
pub struct ElementNode;

impl NodeMarker for ElementNode {
    fn accepts(kind: NodeKind) -> bool {
        kind.is_element()
    }
}

/// Ordered, strongly-typed view over an element's children
pub struct TypedChildren<M: NodeMarker = AnyNode> {
    owner: NodeId,
    items: Vec<NodeId>,
    _marker: PhantomData<M>,
}

impl<M: NodeMarker> TypedChildren<M> {
    /// Create a view owned by `owner`
    pub fn new(owner: NodeId) -> Self {
        Self { owner, items: Vec::new(), _marker: PhantomData }
    }

    #[inline]
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at a collection position (O(1) via the cached list)
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.items.get(index).copied()
    }

    /// Collection position of an item
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.items.iter().position(|&id| id == node)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.iter().copied()
    }

    /// Append a node; see [`insert`](Self::insert)
    pub fn add(&mut self, tree: &mut LogicalTree, node: NodeId) -> TreeResult<bool> {
        self.insert(tree, self.items.len(), node)
    }

    /// Insert a node at a collection position.
    ///
    /// Mirrors into the owner's untyped children list through the tree
    /// protocol; `Ok(false)` means the owner's policy cancelled and
    /// both the view and the backing list are unchanged.
    pub fn insert(&mut self, tree: &mut LogicalTree, index: usize, node: NodeId) -> TreeResult<bool> {
        if index > self.items.len() {
            return Err(TreeError::OutOfRange { index, len: self.items.len() });
        }
        let kind = tree.get(node).ok_or(TreeError::NotFound)?.kind();
        if !M::accepts(kind) {
            return Err(TreeError::KindMismatch);
        }
        // Map the collection position onto the backing list: before the
        // item currently at `index`, or after everything on append.
        let backing = if index == self.items.len() {
            tree.child_count(self.owner)
        } else {
            let anchor = self.items[index];
            let tree_index = tree.get(anchor).ok_or(TreeError::NotFound)?.tree_index();
            usize::try_from(tree_index).map_err(|_| TreeError::NotFound)?
        };
        if !tree.insert_child(self.owner, backing, node)? {
            return Ok(false);
        }
        self.items.insert(index, node);
        self.renumber_collection(tree, index);
        Ok(true)
    }

    /// Remove the item at a collection position.
    ///
    /// `Ok(None)` means the owner's policy cancelled the removal.
    pub fn remove_at(&mut self, tree: &mut LogicalTree, index: usize) -> TreeResult<Option<NodeId>> {
        if index >= self.items.len() {
            return Err(TreeError::OutOfRange { index, len: self.items.len() });
        }
        let node = self.items[index];
        if tree.remove_child(self.owner, node)?.is_none() {
            return Ok(None);
        }
        self.items.remove(index);
        self.renumber_collection(tree, index);
        Ok(Some(node))
    }

    /// Remove a specific item
    pub fn remove(&mut self, tree: &mut LogicalTree, node: NodeId) -> TreeResult<Option<NodeId>> {
        let index = self.index_of(node).ok_or(TreeError::NotFound)?;
        self.remove_at(tree, index)
    }

    /// Remove every item of this view from the backing list. Items of
    /// other typed views over the same owner are untouched. Returns the
    /// number actually removed (owner policy may cancel individual
    /// removals, which keeps those items in the view).
    pub fn clear(&mut self, tree: &mut LogicalTree) -> TreeResult<usize> {
        let mut removed = 0;
        let mut index = 0;
        while index < self.items.len() {
            let node = self.items[index];
            if tree.remove_child(self.owner, node)?.is_some() {
                self.items.remove(index);
                removed += 1;
            } else {
                index += 1;
            }
        }
        self.renumber_collection(tree, 0);
        Ok(removed)
    }

    /// Re-derive collection indices for items at positions >= `start`
    fn renumber_collection(&self, tree: &mut LogicalTree, start: usize) {
        for (position, &id) in self.items.iter().enumerate().skip(start) {
            tree.node_mut(id).collection_index = position as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_mirrors_into_backing_list() {
        let mut tree = LogicalTree::new();
        let owner = tree.create_element();
        let mut view: TypedChildren = TypedChildren::new(owner);
        let a = tree.create_node();
        let b = tree.create_node();
        assert_eq!(view.add(&mut tree, a), Ok(true));
        assert_eq!(view.add(&mut tree, b), Ok(true));

        assert_eq!(view.len(), 2);
        assert_eq!(tree.get(owner).unwrap().children(), &[a, b]);
        assert_eq!(tree.get(a).unwrap().collection_index(), 0);
        assert_eq!(tree.get(b).unwrap().collection_index(), 1);
        assert_eq!(tree.get(b).unwrap().tree_index(), 1);
    }

    #[test]
    fn test_collection_index_is_distinct_from_tree_index() {
        // Two typed views funnel into one backing list.
        let mut tree = LogicalTree::new();
        let owner = tree.create_element();
        let mut leaves: TypedChildren = TypedChildren::new(owner);
        let mut panels: TypedChildren<ElementNode> = TypedChildren::new(owner);

        let leaf_a = tree.create_node();
        let panel = tree.create_element();
        let leaf_b = tree.create_node();
        leaves.add(&mut tree, leaf_a).unwrap();
        panels.add(&mut tree, panel).unwrap();
        leaves.add(&mut tree, leaf_b).unwrap();

        // Backing order is insertion order; collection indices count
        // only within each view.
        assert_eq!(tree.get(owner).unwrap().children(), &[leaf_a, panel, leaf_b]);
        assert_eq!(tree.get(leaf_b).unwrap().tree_index(), 2);
        assert_eq!(tree.get(leaf_b).unwrap().collection_index(), 1);
        assert_eq!(tree.get(panel).unwrap().tree_index(), 1);
        assert_eq!(tree.get(panel).unwrap().collection_index(), 0);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let mut tree = LogicalTree::new();
        let owner = tree.create_element();
        let mut panels: TypedChildren<ElementNode> = TypedChildren::new(owner);
        let leaf = tree.create_node();
        assert_eq!(panels.add(&mut tree, leaf), Err(TreeError::KindMismatch));
        assert!(panels.is_empty());
        assert_eq!(tree.child_count(owner), 0);
    }

    #[test]
    fn test_insert_before_existing_item() {
        let mut tree = LogicalTree::new();
        let owner = tree.create_element();
        let mut view: TypedChildren = TypedChildren::new(owner);
        let a = tree.create_node();
        let b = tree.create_node();
        let mid = tree.create_node();
        view.add(&mut tree, a).unwrap();
        view.add(&mut tree, b).unwrap();
        view.insert(&mut tree, 1, mid).unwrap();

        assert_eq!(tree.get(owner).unwrap().children(), &[a, mid, b]);
        assert_eq!(view.get(1), Some(mid));
        assert_eq!(tree.get(mid).unwrap().collection_index(), 1);
        assert_eq!(tree.get(b).unwrap().collection_index(), 2);
    }

    #[test]
    fn test_remove_shifts_collection_indices() {
        let mut tree = LogicalTree::new();
        let owner = tree.create_element();
        let mut view: TypedChildren = TypedChildren::new(owner);
        let ids: Vec<NodeId> = (0..3).map(|_| tree.create_node()).collect();
        for &id in &ids {
            view.add(&mut tree, id).unwrap();
        }

        assert_eq!(view.remove(&mut tree, ids[1]), Ok(Some(ids[1])));
        assert_eq!(view.len(), 2);
        assert_eq!(tree.get(ids[1]).unwrap().collection_index(), -1);
        assert_eq!(tree.get(ids[1]).unwrap().tree_index(), -1);
        assert_eq!(tree.get(ids[2]).unwrap().collection_index(), 1);
        assert_eq!(tree.get(ids[2]).unwrap().tree_index(), 1);
    }

    #[test]
    fn test_clear_leaves_other_views_intact() {
        let mut tree = LogicalTree::new();
        let owner = tree.create_element();
        let mut leaves: TypedChildren = TypedChildren::new(owner);
        let mut panels: TypedChildren<ElementNode> = TypedChildren::new(owner);
        let leaf = tree.create_node();
        let panel = tree.create_element();
        leaves.add(&mut tree, leaf).unwrap();
        panels.add(&mut tree, panel).unwrap();

        assert_eq!(leaves.clear(&mut tree), Ok(1));
        assert!(leaves.is_empty());
        assert_eq!(panels.len(), 1);
        assert_eq!(tree.get(owner).unwrap().children(), &[panel]);
        assert_eq!(tree.get(panel).unwrap().tree_index(), 0);
    }

    #[test]
    fn test_owner_cancel_leaves_view_unchanged() {
        use crate::node::{ChildPolicy, NodeHooks};
        use std::cell::Cell;
        use std::rc::Rc;

        struct Moody {
            allow: Rc<Cell<bool>>,
        }
        impl NodeHooks for Moody {
            fn accept_child(&self, _child: NodeId) -> ChildPolicy {
                if self.allow.get() { ChildPolicy::Accept } else { ChildPolicy::Cancel }
            }
            fn release_child(&self, _child: NodeId) -> ChildPolicy {
                if self.allow.get() { ChildPolicy::Accept } else { ChildPolicy::Cancel }
            }
        }

        let mut tree = LogicalTree::new();
        let owner = tree.create_element();
        let allow = Rc::new(Cell::new(true));
        tree.set_hooks(owner, Box::new(Moody { allow: allow.clone() }));
        let mut view: TypedChildren = TypedChildren::new(owner);
        let a = tree.create_node();
        let b = tree.create_node();
        assert_eq!(view.add(&mut tree, a), Ok(true));

        // Cancelled insert: no error, and neither the view nor the
        // backing list moved.
        allow.set(false);
        assert_eq!(view.add(&mut tree, b), Ok(false));
        assert_eq!(view.len(), 1);
        assert_eq!(tree.get(owner).unwrap().children(), &[a]);
        assert_eq!(tree.get(b).unwrap().parent(), NodeId::NONE);
        assert_eq!(tree.get(b).unwrap().collection_index(), -1);

        // Cancelled removal keeps the item in place.
        assert_eq!(view.remove_at(&mut tree, 0), Ok(None));
        assert_eq!(view.len(), 1);
        assert_eq!(view.get(0), Some(a));
        assert_eq!(tree.get(a).unwrap().parent(), owner);
        assert_eq!(tree.get(a).unwrap().collection_index(), 0);

        allow.set(true);
        assert_eq!(view.remove_at(&mut tree, 0), Ok(Some(a)));
        assert!(view.is_empty());
    }

    #[test]
    fn test_out_of_range_positions() {
        let mut tree = LogicalTree::new();
        let owner = tree.create_element();
        let mut view: TypedChildren = TypedChildren::new(owner);
        let node = tree.create_node();
        assert_eq!(
            view.insert(&mut tree, 1, node),
            Err(TreeError::OutOfRange { index: 1, len: 0 })
        );
        assert_eq!(
            view.remove_at(&mut tree, 0),
            Err(TreeError::OutOfRange { index: 0, len: 0 })
        );
    }
}
