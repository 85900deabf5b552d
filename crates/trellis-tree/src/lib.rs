//! Trellis Tree - Logical-tree runtime
//!
//! The shared substrate the visual controls are built on: an arena of
//! nodes addressed by stable `NodeId` handles, a managed load/unload
//! lifecycle, typed child collections with consistent index bookkeeping,
//! and two-phase (bubble/tunnel) message dispatch.
//!
//! The runtime is single-threaded and reentrant only through hooks; it
//! consumes the outside world strictly through the [`Presenter`] and
//! [`View`] capabilities.

mod capability;
mod collection;
mod dispatch;
mod error;
mod geometry;
mod message;
mod node;
mod root;
mod tree;

pub use capability::{Presenter, View};
pub use collection::{AnyNode, ElementNode, NodeMarker, TypedChildren};
pub use dispatch::dispatch;
pub use error::{TreeError, TreeResult};
pub use geometry::{Rect, Size};
pub use message::{
    DispatchModes, Message, MessagePayload, Phase, PropertyChange, property_changed_message,
};
pub use node::{ChangingArgs, ChildPolicy, Lifecycle, Node, NodeHooks, NodeId, NodeKind};
pub use root::RootElement;
pub use tree::{LogicalTree, SetOutcome};
