//! Growable slot store backing handles, heaps and nodes

use std::collections::BTreeMap;

/// Default number of slots added when a push outgrows the capacity
pub const DEFAULT_EXPAND_RATE: usize = 300;

/// A capacity-bounded, index-addressable container of optional slots
///
/// Indexed access (`get`/`set`) is bounded by `capacity`. Only `push` grows
/// the capacity, by `expand_rate` slots at a time. Storage is sparse: memory
/// follows the number of occupied slots, not the highest index touched.
#[derive(Debug)]
pub struct GrowableStore<T> {
    slots: BTreeMap<usize, T>,
    /// One past the highest slot ever written (stack top for push/pop)
    end: usize,
    capacity: usize,
    expand_rate: usize,
}

impl<T> GrowableStore<T> {
    /// Create a store addressing `capacity` slots
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            end: 0,
            capacity,
            expand_rate: DEFAULT_EXPAND_RATE,
        }
    }

    /// Override the growth step used by `push`
    pub fn with_expand_rate(mut self, expand_rate: usize) -> Self {
        self.expand_rate = expand_rate.max(1);
        self
    }

    /// Get the element at `index`, `None` if absent or past capacity
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(&index)
    }

    /// Mutable access to the element at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(&index)
    }

    /// Store `element` at `index`, returning the previous occupant
    ///
    /// Refuses indices at or past the capacity and hands the element back.
    pub fn set(&mut self, index: usize, element: T) -> Result<Option<T>, T> {
        if index >= self.capacity {
            return Err(element);
        }
        if index >= self.end {
            self.end = index + 1;
        }
        Ok(self.slots.insert(index, element))
    }

    /// Take the element out of `index`, leaving the slot empty
    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.slots.remove(&index)
    }

    /// Empty every slot in `start..=end` and return what was there
    ///
    /// Only occupied slots are visited, so wide ranges cost nothing extra.
    pub fn clear_range(&mut self, start: usize, end: usize) -> Vec<T> {
        if start > end {
            return Vec::new();
        }
        let indices: Vec<usize> = self.slots.range(start..=end).map(|(&index, _)| index).collect();
        indices
            .into_iter()
            .filter_map(|index| self.slots.remove(&index))
            .collect()
    }

    /// Append past the current end, growing the capacity if needed
    pub fn push(&mut self, element: T) {
        if self.end >= self.capacity {
            self.capacity += self.expand_rate;
        }
        self.slots.insert(self.end, element);
        self.end += 1;
    }

    /// Remove the element at the top of the store
    pub fn pop(&mut self) -> Option<T> {
        if self.end == 0 {
            return None;
        }
        self.end -= 1;
        self.slots.remove(&self.end)
    }

    /// High-water mark of used slots
    pub fn count(&self) -> usize {
        self.end
    }

    /// Number of addressable slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.len()
    }

    /// Iterate occupied slots with their indices
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots.iter().map(|(&index, element)| (index, element))
    }

    /// Drop every element and reset the high-water mark
    pub fn clear(&mut self) {
        self.slots.clear();
        self.end = 0;
    }
}
