//! Trellis Properties - Sparse property storage
//!
//! Per-instance property storage for the logical tree: objects hold a
//! sorted array of packed 4-slot entries instead of one field per
//! property, and property keys are small integers handed out by a
//! process-wide registry.

mod registry;
mod store;
mod value;

pub use registry::{
    MessageId, ObjectType, PropertyFlags, flags_of, message_name_of, name_of, register,
    register_message, register_type, register_with_flags,
};
pub use store::{PropertyKey, PropertyStore};
pub use value::Value;
