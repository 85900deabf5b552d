//! Message Dispatch
//!
//! Two-phase propagation. The logical root previews every message
//! before normal dispatch; the bubble phase then visits the origin's
//! ancestors innermost-first, and the tunnel phase (when enabled and
//! the origin owns children) visits the origin's descendants in
//! depth-first pre-order. The cancellation flag is checked after every
//! hook call; cancellation is a normal outcome, not an error.

use crate::message::{DispatchModes, Message, Phase};
use crate::node::NodeId;
use crate::tree::LogicalTree;

/// Dispatch a message from `origin` through the tree
pub fn dispatch(tree: &mut LogicalTree, msg: &mut Message, origin: NodeId) {
    msg.origin = origin;

    // Preview: the logical root intercepts tree-wide before anything
    // else sees the message.
    let root = tree.find_root(origin);
    msg.phase = Phase::Preview;
    tree.with_hooks(root, |hooks, tree| hooks.preview(tree, root, &mut *msg));
    if msg.is_cancelled() {
        tracing::trace!(origin = origin.0, "message cancelled in preview");
        return;
    }

    // The origin may override which modes apply to this message kind.
    let modes = tree
        .node(origin)
        .hooks
        .as_ref()
        .and_then(|h| h.modes_for(msg.id))
        .unwrap_or(msg.modes);

    if modes.contains(DispatchModes::BUBBLE) {
        msg.phase = Phase::Bubble;
        let mut current = tree.node(origin).parent();
        while current.is_valid() {
            tree.with_hooks(current, |hooks, tree| hooks.receive(tree, current, &mut *msg));
            if msg.is_cancelled() {
                tracing::trace!(origin = origin.0, at = current.0, "bubble cancelled");
                return;
            }
            current = tree.node(current).parent();
        }
    }

    // Tunnel only means something when the origin owns a subtree.
    if modes.contains(DispatchModes::TUNNEL) && tree.node(origin).is_element() {
        msg.phase = Phase::Tunnel;
        for descendant in tree.descendants(origin) {
            tree.with_hooks(descendant, |hooks, tree| hooks.receive(tree, descendant, &mut *msg));
            if msg.is_cancelled() {
                tracing::trace!(origin = origin.0, at = descendant.0, "tunnel cancelled");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeHooks;
    use std::cell::RefCell;
    use std::rc::Rc;
    use trellis_props::register_message;

    type Log = Rc<RefCell<Vec<(&'static str, Phase)>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        cancel_on_receive: bool,
        modes: Option<DispatchModes>,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self { name, log: log.clone(), cancel_on_receive: false, modes: None }
        }

        fn cancelling(name: &'static str, log: &Log) -> Self {
            Self { cancel_on_receive: true, ..Self::new(name, log) }
        }
    }

    impl NodeHooks for Recorder {
        fn receive(&mut self, _tree: &mut LogicalTree, _node: NodeId, msg: &mut Message) {
            self.log.borrow_mut().push((self.name, msg.phase));
            if self.cancel_on_receive {
                msg.cancel();
            }
        }

        fn preview(&mut self, _tree: &mut LogicalTree, _node: NodeId, msg: &mut Message) {
            self.log.borrow_mut().push((self.name, msg.phase));
        }

        fn modes_for(&self, _id: trellis_props::MessageId) -> Option<DispatchModes> {
            self.modes
        }
    }

    fn visited(log: &Log) -> Vec<&'static str> {
        log.borrow().iter().map(|(name, _)| *name).collect()
    }

    #[test]
    fn test_bubble_visits_ancestors_innermost_first() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut tree = LogicalTree::new();
        let root = tree.create_element();
        let a = tree.create_element();
        let origin = tree.create_node();
        tree.add_child(root, a).unwrap();
        tree.add_child(a, origin).unwrap();
        tree.set_hooks(root, Box::new(Recorder::new("root", &log)));
        tree.set_hooks(a, Box::new(Recorder::new("a", &log)));

        let mut msg = Message::new(register_message("bubble-order"));
        dispatch(&mut tree, &mut msg, origin);

        // Preview at the root first, then bubble inward-out.
        assert_eq!(
            *log.borrow(),
            vec![("root", Phase::Preview), ("a", Phase::Bubble), ("root", Phase::Bubble)]
        );
    }

    #[test]
    fn test_bubble_stops_on_cancel() {
        // Chain root -> a -> b -> c; a cancels. The receive hooks hit
        // exactly {b, a}, never root.
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut tree = LogicalTree::new();
        let root = tree.create_element();
        let a = tree.create_element();
        let b = tree.create_element();
        let c = tree.create_node();
        tree.add_child(root, a).unwrap();
        tree.add_child(a, b).unwrap();
        tree.add_child(b, c).unwrap();
        tree.set_hooks(a, Box::new(Recorder::cancelling("a", &log)));
        tree.set_hooks(b, Box::new(Recorder::new("b", &log)));
        tree.set_hooks(root, Box::new(Recorder::new("root", &log)));

        let mut msg = Message::new(register_message("bubble-cancel"));
        dispatch(&mut tree, &mut msg, c);

        let receives: Vec<&str> = log
            .borrow()
            .iter()
            .filter(|(_, phase)| *phase == Phase::Bubble)
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(receives, vec!["b", "a"]);
        assert!(msg.is_cancelled());
    }

    #[test]
    fn test_tunnel_visits_descendants_depth_first() {
        // E(children: X, Y(children: Z)) tunnels X, Y, Z in order.
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut tree = LogicalTree::new();
        let e = tree.create_element();
        let x = tree.create_node();
        let y = tree.create_element();
        let z = tree.create_node();
        tree.add_child(e, x).unwrap();
        tree.add_child(e, y).unwrap();
        tree.add_child(y, z).unwrap();
        tree.set_hooks(x, Box::new(Recorder::new("x", &log)));
        tree.set_hooks(y, Box::new(Recorder::new("y", &log)));
        tree.set_hooks(z, Box::new(Recorder::new("z", &log)));

        let mut msg =
            Message::new(register_message("tunnel-order")).with_modes(DispatchModes::TUNNEL);
        dispatch(&mut tree, &mut msg, e);

        assert_eq!(visited(&log), vec!["x", "y", "z"]);
        assert!(log.borrow().iter().all(|(_, phase)| *phase == Phase::Tunnel));
    }

    #[test]
    fn test_tunnel_stops_on_cancel() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut tree = LogicalTree::new();
        let e = tree.create_element();
        let x = tree.create_element();
        let y = tree.create_node();
        tree.add_child(e, x).unwrap();
        tree.add_child(e, y).unwrap();
        tree.set_hooks(x, Box::new(Recorder::cancelling("x", &log)));
        tree.set_hooks(y, Box::new(Recorder::new("y", &log)));

        let mut msg =
            Message::new(register_message("tunnel-cancel")).with_modes(DispatchModes::TUNNEL);
        dispatch(&mut tree, &mut msg, e);
        assert_eq!(visited(&log), vec!["x"]);
    }

    #[test]
    fn test_tunnel_from_leaf_is_noop() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut tree = LogicalTree::new();
        let parent = tree.create_element();
        let leaf = tree.create_node();
        tree.add_child(parent, leaf).unwrap();
        tree.set_hooks(parent, Box::new(Recorder::new("parent", &log)));

        let mut msg =
            Message::new(register_message("leaf-tunnel")).with_modes(DispatchModes::TUNNEL);
        dispatch(&mut tree, &mut msg, leaf);
        // No bubble mode, no subtree: only the root preview fires.
        assert_eq!(*log.borrow(), vec![("parent", Phase::Preview)]);
    }

    #[test]
    fn test_preview_cancel_stops_everything() {
        struct Gate;
        impl NodeHooks for Gate {
            fn preview(&mut self, _tree: &mut LogicalTree, _node: NodeId, msg: &mut Message) {
                msg.cancel();
            }
        }

        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut tree = LogicalTree::new();
        let root = tree.create_element();
        let mid = tree.create_element();
        let origin = tree.create_node();
        tree.add_child(root, mid).unwrap();
        tree.add_child(mid, origin).unwrap();
        tree.set_hooks(root, Box::new(Gate));
        tree.set_hooks(mid, Box::new(Recorder::new("mid", &log)));

        let mut msg = Message::new(register_message("preview-gate"));
        dispatch(&mut tree, &mut msg, origin);
        assert!(msg.is_cancelled());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_origin_mode_override() {
        // The message asks for bubble, but the origin's hooks widen it
        // to bubble + tunnel.
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut tree = LogicalTree::new();
        let root = tree.create_element();
        let origin = tree.create_element();
        let below = tree.create_node();
        tree.add_child(root, origin).unwrap();
        tree.add_child(origin, below).unwrap();
        tree.set_hooks(root, Box::new(Recorder::new("root", &log)));
        tree.set_hooks(below, Box::new(Recorder::new("below", &log)));
        let mut widen = Recorder::new("origin", &log);
        widen.modes = Some(DispatchModes::BUBBLE | DispatchModes::TUNNEL);
        tree.set_hooks(origin, Box::new(widen));

        let mut msg = Message::new(register_message("widened"));
        dispatch(&mut tree, &mut msg, origin);
        assert_eq!(
            *log.borrow(),
            vec![("root", Phase::Preview), ("root", Phase::Bubble), ("below", Phase::Tunnel)]
        );
    }
}
