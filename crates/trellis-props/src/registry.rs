//! Property Registry
//!
//! Process-wide table assigning each (owner type, property name) pair a
//! unique integer key, with reverse name resolution along the owner's
//! declaring-type chain. Message ids come from the same mechanism.
//!
//! The tables are append-only for the process lifetime; keys are never
//! reused or reassigned. Registration takes a write lock, resolution a
//! read lock - the hot set/get path never touches the registry.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::store::PropertyKey;

bitflags::bitflags! {
    /// Opaque per-key metadata carried by the registry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PropertyFlags: u32 {
        const NONE = 0;
        /// Changing this property invalidates arrangement
        const AFFECTS_ARRANGE = 1 << 0;
        /// Changing this property requires a repaint
        const AFFECTS_RENDER = 1 << 1;
    }
}

/// Registered owner type - models the declaring-type chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectType(u32);

impl ObjectType {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Registered message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MessageId(u32);

impl MessageId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
struct TypeEntry {
    name: String,
    parent: Option<ObjectType>,
    /// Keys declared directly on this type
    properties: HashMap<u32, String>,
}

#[derive(Debug, Default)]
struct Registry {
    types: Vec<TypeEntry>,
    next_key: u32,
    flags: HashMap<u32, PropertyFlags>,
    messages: Vec<String>,
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Registry::default()))
}

/// Register an owner type, optionally descending from a parent type
pub fn register_type(name: &str, parent: Option<ObjectType>) -> ObjectType {
    let mut reg = registry().write().unwrap();
    let id = reg.types.len() as u32;
    reg.types.push(TypeEntry {
        name: name.to_string(),
        parent,
        properties: HashMap::new(),
    });
    tracing::trace!(type_name = name, id, "registered object type");
    ObjectType(id)
}

/// Register a property on an owner type, returning its key
pub fn register(owner: ObjectType, name: &str) -> PropertyKey {
    register_with_flags(owner, name, PropertyFlags::NONE)
}

/// Register a property with metadata flags
pub fn register_with_flags(owner: ObjectType, name: &str, flags: PropertyFlags) -> PropertyKey {
    let mut reg = registry().write().unwrap();
    let raw = reg.next_key;
    reg.next_key += 1;
    reg.flags.insert(raw, flags);
    let entry = reg
        .types
        .get_mut(owner.0 as usize)
        .expect("owner type must be registered before its properties");
    entry.properties.insert(raw, name.to_string());
    tracing::trace!(property = name, key = raw, owner = owner.0, "registered property");
    PropertyKey::from_raw(raw)
}

/// Resolve a key back to its display name, walking the declaring-type
/// chain upward from `owner`. Returns an empty string if no type in the
/// chain declares the key.
///
/// Only called when a notification is actually observed; set/get never
/// resolve names.
pub fn name_of(owner: ObjectType, key: PropertyKey) -> String {
    let reg = registry().read().unwrap();
    let mut current = Some(owner);
    while let Some(ty) = current {
        let Some(entry) = reg.types.get(ty.0 as usize) else {
            break;
        };
        if let Some(name) = entry.properties.get(&key.raw()) {
            return name.clone();
        }
        current = entry.parent;
    }
    String::new()
}

/// Metadata flags recorded for a key at registration
pub fn flags_of(key: PropertyKey) -> PropertyFlags {
    let reg = registry().read().unwrap();
    reg.flags.get(&key.raw()).copied().unwrap_or_default()
}

/// Register a message kind, returning its id
pub fn register_message(name: &str) -> MessageId {
    let mut reg = registry().write().unwrap();
    let id = reg.messages.len() as u32;
    reg.messages.push(name.to_string());
    tracing::trace!(message = name, id, "registered message");
    MessageId(id)
}

/// Resolve a message id to its registered name (empty if unknown)
pub fn message_name_of(id: MessageId) -> String {
    let reg = registry().read().unwrap();
    reg.messages.get(id.0 as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve_name() {
        let ty = register_type("Gauge", None);
        let key = register(ty, "Value");
        assert_eq!(name_of(ty, key), "Value");
    }

    #[test]
    fn test_name_resolves_through_parent_chain() {
        let base = register_type("Control", None);
        let derived = register_type("Slider", Some(base));
        let key = register(base, "Width");
        assert_eq!(name_of(derived, key), "Width");
        assert_eq!(name_of(base, key), "Width");
    }

    #[test]
    fn test_unknown_key_resolves_empty() {
        let a = register_type("A", None);
        let b = register_type("B", None);
        let key = register(a, "OnlyOnA");
        assert_eq!(name_of(b, key), "");
    }

    #[test]
    fn test_keys_are_unique_and_monotonic() {
        // Other tests may register concurrently; keys still never repeat
        // and always grow.
        let ty = register_type("T", None);
        let k1 = register(ty, "P1");
        let k2 = register(ty, "P2");
        assert_ne!(k1, k2);
        assert!(k2.raw() > k1.raw());
        assert_eq!(name_of(ty, k1), "P1");
        assert_eq!(name_of(ty, k2), "P2");
    }

    #[test]
    fn test_flags_round_trip() {
        let ty = register_type("Flagged", None);
        let key = register_with_flags(ty, "Width", PropertyFlags::AFFECTS_ARRANGE);
        assert_eq!(flags_of(key), PropertyFlags::AFFECTS_ARRANGE);
        let plain = register(ty, "Tag");
        assert_eq!(flags_of(plain), PropertyFlags::NONE);
    }

    #[test]
    fn test_message_registration() {
        let id = register_message("PropertyChanged");
        assert_eq!(message_name_of(id), "PropertyChanged");
    }
}
