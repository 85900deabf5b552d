//! Root Element
//!
//! Anchors a logical tree to a view and triggers the arrange pass. The
//! view is the only place the runtime learns viewport dimensions; the
//! parameterless arrange entry point fills `(0, 0, width, height)`.

use crate::geometry::Rect;
use crate::node::NodeId;
use crate::tree::LogicalTree;
use crate::View;

/// Handle to a tree's root element
#[derive(Debug, Clone, Copy)]
pub struct RootElement {
    id: NodeId,
}

impl RootElement {
    /// Create a root node anchored to `view`
    pub fn new(tree: &mut LogicalTree, view: Box<dyn View>) -> Self {
        Self { id: tree.create_root(view) }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Load the root and its whole subtree
    pub fn attach(&self, tree: &mut LogicalTree) {
        tree.load(self.id, self.id);
    }

    /// Unload the whole subtree
    pub fn detach(&self, tree: &mut LogicalTree) {
        tree.unload(self.id);
    }

    /// Whether the anchored view is currently present
    pub fn is_view_visible(&self, tree: &LogicalTree) -> bool {
        tree.get(self.id)
            .and_then(|node| node.view.as_ref())
            .is_some_and(|view| view.is_visible())
    }

    /// Arrange the whole tree into the view's viewport rectangle
    pub fn arrange(&self, tree: &mut LogicalTree) {
        let Some(view) = tree.node(self.id).view.as_ref() else {
            return;
        };
        let rect = Rect::from_xywh(0.0, 0.0, view.viewport_width(), view.viewport_height());
        self.arrange_into(tree, rect);
    }

    /// Arrange the whole tree into an explicit rectangle.
    ///
    /// Slot assignment is pass-through: each node inherits its parent's
    /// slot. Concrete controls compute real geometry outside this
    /// runtime; the root only seeds the pass and asks the view to
    /// repaint.
    pub fn arrange_into(&self, tree: &mut LogicalTree, rect: Rect) {
        tracing::debug!(root = self.id.0, ?rect, "arranging tree");
        tree.node_mut(self.id).slot = rect;
        for descendant in tree.descendants(self.id) {
            let parent = tree.node(descendant).parent();
            let slot = tree.node(parent).slot;
            tree.node_mut(descendant).slot = slot;
        }
        if let Some(view) = tree.node_mut(self.id).view.as_mut() {
            view.refresh_node(self.id);
        }
    }
}
