//! Sparse Property Store
//!
//! Per-object property storage. Instead of one field per property, each
//! object carries a sorted array of packed entries; every entry groups
//! the 4 consecutive keys sharing an entry key (the key with its low two
//! bits cleared) into one record with a 4-bit occupancy mask.
//!
//! Lookup on small arrays (<= 16 entries) uses an unrolled 4-step search
//! with a fixed number of comparisons; larger arrays fall back to a
//! classic binary search.

use crate::Value;

/// Property key - process-wide unique id assigned by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PropertyKey(pub(crate) u32);

impl PropertyKey {
    /// Create a key from its raw id
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        PropertyKey(raw)
    }

    /// Raw id
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Key with the low two bits cleared; groups 4 keys per entry
    #[inline]
    const fn entry_key(self) -> u32 {
        self.0 & !3
    }

    /// Position within the entry (0..=3)
    #[inline]
    const fn subslot(self) -> usize {
        (self.0 & 3) as usize
    }
}

/// One packed storage record: up to 4 values under a shared entry key
#[derive(Debug, Clone, Default)]
struct Entry {
    entry_key: u32,
    /// Bit i set iff subslot i holds a value
    mask: u8,
    slots: [Option<Value>; 4],
}

impl Entry {
    fn new(entry_key: u32) -> Self {
        Self { entry_key, ..Default::default() }
    }
}

/// Maximum entry count handled by the unrolled search
const UNROLLED_MAX: usize = 16;

/// Sparse property store
///
/// Entries are kept in strictly ascending entry-key order; an entry with
/// an empty mask is pruned immediately, so the array length always equals
/// the number of distinct entry keys holding at least one set property.
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    entries: Vec<Entry>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value for a key, or `None` if the key is not set
    pub fn get(&self, key: PropertyKey) -> Option<&Value> {
        let (index, found) = self.locate(key.entry_key());
        if !found {
            return None;
        }
        let entry = &self.entries[index];
        let sub = key.subslot();
        if entry.mask & (1 << sub) != 0 {
            entry.slots[sub].as_ref()
        } else {
            None
        }
    }

    /// Set the value for a key, creating its entry if absent
    pub fn set(&mut self, key: PropertyKey, value: Value) {
        let entry_key = key.entry_key();
        let (index, found) = self.locate(entry_key);
        if !found {
            // Splice a fresh entry at the insertion point, keeping order.
            self.entries.insert(index, Entry::new(entry_key));
        }
        let entry = &mut self.entries[index];
        let sub = key.subslot();
        entry.slots[sub] = Some(value);
        entry.mask |= 1 << sub;
    }

    /// Remove the value for a key; a no-op if the key is not set
    pub fn remove(&mut self, key: PropertyKey) {
        let (index, found) = self.locate(key.entry_key());
        if !found {
            return;
        }
        let entry = &mut self.entries[index];
        let sub = key.subslot();
        if entry.mask & (1 << sub) == 0 {
            return;
        }
        entry.mask &= !(1 << sub);
        if entry.mask == 0 {
            self.entries.remove(index);
        } else {
            // Drop the boxed value but keep the entry for its siblings.
            entry.slots[sub] = None;
        }
    }

    /// Check whether a key currently holds a value
    pub fn contains(&self, key: PropertyKey) -> bool {
        let (index, found) = self.locate(key.entry_key());
        found && self.entries[index].mask & (1 << key.subslot()) != 0
    }

    /// Number of set keys
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.mask.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of packed entries in the backing array
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Locate an entry key: `(index, true)` on a hit, `(insertion point,
    /// false)` on a miss.
    fn locate(&self, entry_key: u32) -> (usize, bool) {
        if self.entries.len() <= UNROLLED_MAX {
            self.locate_unrolled(entry_key)
        } else {
            self.locate_binary(entry_key)
        }
    }

    /// Unrolled 4-step search over at most 16 entries: a fixed number of
    /// comparisons, branch-predictable on hot small stores.
    fn locate_unrolled(&self, entry_key: u32) -> (usize, bool) {
        let len = self.entries.len();
        if len == 0 {
            return (0, false);
        }

        let mut index = 0usize;
        // Strides len/2, len/4, len/8, len/16 rounded up so every index
        // stays reachable for len <= 16.
        let step = index + len.div_ceil(2);
        if step < len && self.entries[step].entry_key <= entry_key {
            index = step;
        }
        let step = index + len.div_ceil(4);
        if step < len && self.entries[step].entry_key <= entry_key {
            index = step;
        }
        let step = index + len.div_ceil(8);
        if step < len && self.entries[step].entry_key <= entry_key {
            index = step;
        }
        let step = index + len.div_ceil(16);
        if step < len && self.entries[step].entry_key <= entry_key {
            index = step;
        }

        let key_here = self.entries[index].entry_key;
        if key_here == entry_key {
            (index, true)
        } else if key_here < entry_key {
            // One step past the last key below target: the insertion point.
            (index + 1, false)
        } else {
            (0, false)
        }
    }

    /// Classic binary search, returning the insertion point on a miss
    fn locate_binary(&self, entry_key: u32) -> (usize, bool) {
        match self.entries.binary_search_by_key(&entry_key, |e| e.entry_key) {
            Ok(index) => (index, true),
            Err(insertion) => (insertion, false),
        }
    }
}
