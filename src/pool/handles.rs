//! Free-list of heap handles

use super::store::GrowableStore;
use crate::HeapHandle;

/// Pool of heap handles not assigned to a live heap
///
/// Handles are issued LIFO: the most recently released handle is reused
/// first. The pool starts filled highest-to-lowest, so a fresh pool issues
/// `0, 1, 2, ...`. A handle is never held twice.
#[derive(Debug)]
pub struct HandlePool {
    free: GrowableStore<HeapHandle>,
    /// Membership bitmap indexed by handle
    pooled: Vec<bool>,
}

impl HandlePool {
    /// Create a pool holding every handle in `0..max_handles`
    pub fn new(max_handles: usize) -> Self {
        let mut free = GrowableStore::with_capacity(max_handles);
        for handle in (0..max_handles).rev() {
            free.push(handle as HeapHandle);
        }
        Self {
            free,
            pooled: vec![true; max_handles],
        }
    }

    /// Take an available handle
    pub fn acquire(&mut self) -> Option<HeapHandle> {
        let handle = self.free.pop()?;
        self.pooled[handle as usize] = false;
        Some(handle)
    }

    /// Return a handle to the pool
    ///
    /// Returns false if the handle is outside the pool's universe or
    /// already available.
    pub fn release(&mut self, handle: HeapHandle) -> bool {
        let Ok(index) = usize::try_from(handle) else {
            return false;
        };
        match self.pooled.get_mut(index) {
            Some(pooled) if !*pooled => {
                *pooled = true;
                self.free.push(handle);
                true
            }
            _ => false,
        }
    }

    /// Check whether `handle` is currently available
    pub fn contains(&self, handle: HeapHandle) -> bool {
        usize::try_from(handle)
            .ok()
            .and_then(|index| self.pooled.get(index).copied())
            .unwrap_or(false)
    }

    /// Number of handles available
    pub fn available(&self) -> usize {
        self.free.count()
    }

    /// Size of the handle universe
    pub fn universe(&self) -> usize {
        self.pooled.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_pool_issues_lowest_first() {
        let mut pool = HandlePool::new(3);
        assert_eq!(pool.available(), 3);

        assert_eq!(pool.acquire(), Some(0));
        assert_eq!(pool.acquire(), Some(1));
        assert_eq!(pool.acquire(), Some(2));
        assert_eq!(pool.acquire(), None);
    }

    #[test]
    fn test_released_handle_is_reused_first() {
        let mut pool = HandlePool::new(4);
        let first = pool.acquire().unwrap();
        let _second = pool.acquire().unwrap();

        assert!(pool.release(first));
        assert_eq!(pool.acquire(), Some(first));
    }

    #[test]
    fn test_release_rejects_duplicates_and_strangers() {
        let mut pool = HandlePool::new(2);

        // Never issued, still pooled
        assert!(!pool.release(1));
        assert!(!pool.release(-1));
        assert!(!pool.release(2));
        assert_eq!(pool.available(), 2);

        let handle = pool.acquire().unwrap();
        assert!(!pool.contains(handle));
        assert!(pool.release(handle));
        assert!(!pool.release(handle));
        assert!(pool.contains(handle));
        assert_eq!(pool.available(), 2);
    }
}
