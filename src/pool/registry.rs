//! Registry of live heaps, indexed by handle

use super::instance::HeapInstance;
use super::store::GrowableStore;
use crate::HeapHandle;

/// Fixed-capacity directory mapping a handle to its heap
#[derive(Debug)]
pub struct HeapRegistry {
    heaps: GrowableStore<HeapInstance>,
}

impl HeapRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            heaps: GrowableStore::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.heaps.capacity()
    }

    /// Look up a heap; negative or out-of-range handles are absent
    pub fn get(&self, handle: HeapHandle) -> Option<&HeapInstance> {
        let index = usize::try_from(handle).ok()?;
        self.heaps.get(index)
    }

    pub fn get_mut(&mut self, handle: HeapHandle) -> Option<&mut HeapInstance> {
        let index = usize::try_from(handle).ok()?;
        self.heaps.get_mut(index)
    }

    pub fn contains(&self, handle: HeapHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Install a heap at a free handle
    ///
    /// Refuses occupied or out-of-range handles and hands the heap back.
    pub fn insert(
        &mut self,
        handle: HeapHandle,
        heap: HeapInstance,
    ) -> std::result::Result<(), HeapInstance> {
        let Ok(index) = usize::try_from(handle) else {
            return Err(heap);
        };
        if self.heaps.get(index).is_some() {
            return Err(heap);
        }
        self.heaps.set(index, heap).map(|_| ())
    }

    pub fn remove(&mut self, handle: HeapHandle) -> Option<HeapInstance> {
        let index = usize::try_from(handle).ok()?;
        self.heaps.remove(index)
    }

    /// Number of live heaps
    pub fn len(&self) -> usize {
        self.heaps.occupied()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of every live heap, ascending
    pub fn handles(&self) -> Vec<HeapHandle> {
        self.heaps
            .iter()
            .map(|(index, _)| index as HeapHandle)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HeapHandle, &HeapInstance)> + '_ {
        self.heaps
            .iter()
            .map(|(index, heap)| (index as HeapHandle, heap))
    }
}
