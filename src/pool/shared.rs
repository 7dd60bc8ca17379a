//! Thread-safe heap pool
//!
//! Wraps [`HeapPool`] in a single reader-writer lock. Every mutation
//! (handle issuance, node installation, destruction) holds the write lock,
//! so the check-then-install sequence of `set_data` cannot race. Readers
//! receive a refcounted `Bytes` clone and never observe a buffer
//! mid-transfer.

use super::manager::{HeapPool, PoolStats};
use super::node::{NodeState, NodeView};
use crate::config::PoolConfig;
use crate::error::{Result, WriteRejected};
use crate::{HeapHandle, NodeIndex};
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable handle to a heap pool shared between threads
#[derive(Clone, Default)]
pub struct SharedHeapPool {
    inner: Arc<RwLock<HeapPool>>,
}

impl SharedHeapPool {
    /// Create an uninitialized shared pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing pool
    pub fn from_pool(pool: HeapPool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(pool)),
        }
    }

    pub fn with_capacity(max_heaps: i32) -> Result<Self> {
        HeapPool::with_capacity(max_heaps).map(Self::from_pool)
    }

    pub fn from_config(config: &PoolConfig) -> Result<Self> {
        HeapPool::from_config(config).map(Self::from_pool)
    }

    pub fn initialize(&self, max_heaps: i32) -> Result<()> {
        self.inner.write().initialize(max_heaps)
    }

    pub fn teardown(&self) -> Result<()> {
        self.inner.write().teardown()
    }

    pub fn create_heap(&self, node_count: i32) -> Result<HeapHandle> {
        self.inner.write().create_heap(node_count)
    }

    pub fn destroy_heap(&self, handle: HeapHandle) -> Result<()> {
        self.inner.write().destroy_heap(handle)
    }

    pub fn destroy_nodes(&self, handle: HeapHandle, start: NodeIndex, end: NodeIndex) -> Result<usize> {
        self.inner.write().destroy_nodes(handle, start, end)
    }

    pub fn destroy_node(&self, handle: HeapHandle, node: NodeIndex) -> Result<bool> {
        self.inner.write().destroy_node(handle, node)
    }

    pub fn set_data(
        &self,
        handle: HeapHandle,
        node: NodeIndex,
        bytes: impl Into<Bytes>,
    ) -> std::result::Result<(), WriteRejected> {
        self.inner.write().set_data(handle, node, bytes)
    }

    pub fn take_data(&self, handle: HeapHandle, node: NodeIndex) -> Result<Bytes> {
        self.inner.write().take_data(handle, node)
    }

    /// Copy-free read: the returned `Bytes` shares the node's allocation
    pub fn get_data(&self, handle: HeapHandle, node: NodeIndex) -> Result<Bytes> {
        self.inner.read().get_shared(handle, node)
    }

    /// Run `f` against a borrowed view while holding the read lock
    pub fn with_data<R>(
        &self,
        handle: HeapHandle,
        node: NodeIndex,
        f: impl FnOnce(NodeView<'_>) -> R,
    ) -> Result<R> {
        let pool = self.inner.read();
        pool.get_data(handle, node).map(f)
    }

    pub fn node_state(&self, handle: HeapHandle, node: NodeIndex) -> Result<NodeState> {
        self.inner.read().node_state(handle, node)
    }

    pub fn contains_heap(&self, handle: HeapHandle) -> bool {
        self.inner.read().contains_heap(handle)
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.read().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::thread;

    #[test]
    fn test_shared_round_trip() -> Result<()> {
        let pool = SharedHeapPool::with_capacity(4)?;
        let handle = pool.create_heap(8)?;

        pool.set_data(handle, 2, b"shared".to_vec())?;
        assert_eq!(pool.get_data(handle, 2)?.as_ref(), b"shared");
        assert_eq!(pool.with_data(handle, 2, |view| view.length())?, 6);
        Ok(())
    }

    #[test]
    fn test_concurrent_writers_single_winner() {
        let pool = SharedHeapPool::with_capacity(1).unwrap();
        let handle = pool.create_heap(1).unwrap();

        let workers: Vec<_> = (0..8u8)
            .map(|id| {
                let pool = pool.clone();
                thread::spawn(move || pool.set_data(handle, 0, vec![id; 4]).is_ok())
            })
            .collect();

        let winners = workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(pool.node_state(handle, 0), Ok(NodeState::Populated));
    }

    #[test]
    fn test_concurrent_heap_creation_unique_handles() {
        let pool = SharedHeapPool::with_capacity(16).unwrap();

        let workers: Vec<_> = (0..16)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || pool.create_heap(4).unwrap())
            })
            .collect();

        let mut handles: Vec<HeapHandle> = workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .collect();
        handles.sort_unstable();
        handles.dedup();
        assert_eq!(handles.len(), 16);
        assert_eq!(pool.create_heap(4), Err(Error::HandlesExhausted));
    }
}
