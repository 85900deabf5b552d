//! Messages
//!
//! The payload propagated through the tree by [`dispatch`]. A message
//! carries a registered id, the dispatch-mode flags, a mutable payload,
//! and a cooperative cancellation flag checked after every hook call.
//!
//! [`dispatch`]: crate::dispatch

use std::sync::OnceLock;

use crate::NodeId;
use trellis_props::{MessageId, PropertyKey, Value, register_message};

bitflags::bitflags! {
    /// How a message propagates through the tree
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DispatchModes: u8 {
        /// Upward through the origin's ancestors
        const BUBBLE = 1 << 0;
        /// Downward through the origin's descendants, depth-first
        const TUNNEL = 1 << 1;
    }
}

impl Default for DispatchModes {
    fn default() -> Self {
        DispatchModes::BUBBLE
    }
}

/// Current propagation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Preview,
    Bubble,
    Tunnel,
}

/// Old/new record carried by a property-changed message
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub key: PropertyKey,
    /// Display name, resolved lazily at notification time
    pub name: String,
    /// `None` when the key was previously absent
    pub old: Option<Value>,
    pub new: Value,
}

/// Message payload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MessagePayload {
    #[default]
    None,
    PropertyChanged(PropertyChange),
    Value(Value),
}

/// A message travelling through the tree
#[derive(Debug)]
pub struct Message {
    pub id: MessageId,
    pub modes: DispatchModes,
    pub payload: MessagePayload,
    pub phase: Phase,
    /// The node the message was dispatched from
    pub origin: NodeId,
    cancelled: bool,
}

impl Message {
    /// Create a message with the default Bubble-only mode
    pub fn new(id: MessageId) -> Self {
        Self {
            id,
            modes: DispatchModes::default(),
            payload: MessagePayload::None,
            phase: Phase::default(),
            origin: NodeId::NONE,
            cancelled: false,
        }
    }

    pub fn with_modes(mut self, modes: DispatchModes) -> Self {
        self.modes = modes;
        self
    }

    pub fn with_payload(mut self, payload: MessagePayload) -> Self {
        self.payload = payload;
        self
    }

    /// Build the property-changed notification message
    pub fn property_changed(change: PropertyChange) -> Self {
        Self::new(property_changed_message()).with_payload(MessagePayload::PropertyChanged(change))
    }

    /// Stop propagation after the current hook returns
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Well-known id of the property-changed notification message
pub fn property_changed_message() -> MessageId {
    static ID: OnceLock<MessageId> = OnceLock::new();
    *ID.get_or_init(|| register_message("PropertyChanged"))
}
