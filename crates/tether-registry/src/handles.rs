//! Slot table of boxed host values.

use std::fmt;

use tether_core::{HandleId, HostValue};

/// Host values currently referenced from script code.
///
/// Each boxed value occupies one slot. Releasing a handle empties its slot and
/// bumps the slot generation, so a stale or duplicate release finds nothing.
pub struct HandleRegistry {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

struct Slot {
    generation: u32,
    value: Option<HostValue>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Box a value and return its handle.
    pub fn insert(&mut self, value: HostValue) -> HandleId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            HandleId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            HandleId::new(index, 0)
        }
    }

    /// The value behind a live handle.
    pub fn get(&self, handle: HandleId) -> Option<&HostValue> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn contains(&self, handle: HandleId) -> bool {
        self.get(handle).is_some()
    }

    /// Drop the registry's reference. Returns the value the first time only.
    pub fn release(&mut self, handle: HandleId) -> Option<HostValue> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.live -= 1;
        Some(value)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("live", &self.live)
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}
