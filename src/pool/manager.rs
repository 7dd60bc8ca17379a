//! Heap pool manager
//!
//! Orchestrates the handle pool, the heap registry and per-heap node stores.
//! Every precondition is checked at the operation boundary; a failed call
//! leaves the pool untouched and reports a specific [`Error`].

use super::handles::HandlePool;
use super::instance::{HeapInstance, Install};
use super::node::{NodeSlot, NodeState, NodeView};
use super::registry::HeapRegistry;
use crate::config::PoolConfig;
use crate::error::{Error, Result, WriteRejected};
use crate::metrics;
use crate::{HeapHandle, NodeIndex};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

/// State established by `initialize`
#[derive(Debug)]
struct PoolState {
    registry: HeapRegistry,
    handles: HandlePool,
}

/// A pool of heaps addressed by integer handles
///
/// Created uninitialized by [`HeapPool::new`]; operations report
/// [`Error::NotInitialized`] until [`HeapPool::initialize`] succeeds.
#[derive(Debug, Default)]
pub struct HeapPool {
    config: PoolConfig,
    state: Option<PoolState>,
}

impl HeapPool {
    /// Create an uninitialized pool with the default handle space
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and initialize a pool holding up to `max_heaps` heaps
    pub fn with_capacity(max_heaps: i32) -> Result<Self> {
        let mut pool = Self::new();
        pool.initialize(max_heaps)?;
        Ok(pool)
    }

    /// Create an uninitialized pool bounded by the configured handle space
    pub fn with_config(config: &PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            state: None,
        })
    }

    /// Create and initialize a pool from configuration
    pub fn from_config(config: &PoolConfig) -> Result<Self> {
        let mut pool = Self::with_config(config)?;
        pool.initialize(config.max_heaps)?;
        Ok(pool)
    }

    /// Build the heap registry and the handle pool
    ///
    /// Single-shot: a second call fails with `AlreadyInitialized` until
    /// `teardown` is called.
    pub fn initialize(&mut self, max_heaps: i32) -> Result<()> {
        let result = self.initialize_inner(max_heaps);
        metrics::record("initialize", &result);
        result
    }

    fn initialize_inner(&mut self, max_heaps: i32) -> Result<()> {
        if self.state.is_some() {
            return Err(rejected("initialize", Error::AlreadyInitialized));
        }
        if max_heaps > self.config.handle_space {
            return Err(rejected(
                "initialize",
                Error::CapacityExceeded {
                    requested: i64::from(max_heaps),
                    maximum: i64::from(self.config.handle_space),
                },
            ));
        }
        if max_heaps <= 0 {
            return Err(rejected(
                "initialize",
                Error::InvalidArgument(format!(
                    "number of heaps must be positive, got {}",
                    max_heaps
                )),
            ));
        }

        let capacity = max_heaps as usize;
        self.state = Some(PoolState {
            registry: HeapRegistry::new(capacity),
            handles: HandlePool::new(capacity),
        });
        self.config.max_heaps = max_heaps;

        info!(max_heaps, "Heap pool initialized");
        Ok(())
    }

    /// Destroy every heap and return to the uninitialized state
    pub fn teardown(&mut self) -> Result<()> {
        let result = self.teardown_inner();
        metrics::record("teardown", &result);
        result
    }

    fn teardown_inner(&mut self) -> Result<()> {
        let Some(state) = self.state.take() else {
            return Err(rejected("teardown", Error::NotInitialized));
        };

        let live_heaps = state.registry.len();
        let stored: usize = state.registry.iter().map(|(_, heap)| heap.stored_bytes()).sum();
        metrics::record_released(stored);
        drop(state);

        info!(live_heaps, stored_bytes = stored, "Heap pool torn down");
        Ok(())
    }

    /// Create a heap addressing `node_count` nodes and return its handle
    pub fn create_heap(&mut self, node_count: i32) -> Result<HeapHandle> {
        let result = self.create_heap_inner(node_count);
        metrics::record("create_heap", &result);
        result
    }

    fn create_heap_inner(&mut self, node_count: i32) -> Result<HeapHandle> {
        let Some(state) = self.state.as_mut() else {
            return Err(rejected("create_heap", Error::NotInitialized));
        };
        if node_count <= 0 {
            return Err(rejected(
                "create_heap",
                Error::InvalidArgument(format!(
                    "number of nodes must be positive, got {}",
                    node_count
                )),
            ));
        }

        let Some(handle) = state.handles.acquire() else {
            return Err(rejected("create_heap", Error::HandlesExhausted));
        };

        if state
            .registry
            .insert(handle, HeapInstance::new(node_count as usize))
            .is_err()
        {
            // The free-list never holds a handle that is in the registry
            warn!(heap = handle, "Issued handle is already registered");
            return Err(Error::HandlesExhausted);
        }

        debug!(heap = handle, nodes = node_count, "Created heap");
        Ok(handle)
    }

    /// Destroy a heap, its nodes, and recycle the handle
    pub fn destroy_heap(&mut self, handle: HeapHandle) -> Result<()> {
        let result = self.destroy_heap_inner(handle);
        metrics::record("destroy_heap", &result);
        result
    }

    fn destroy_heap_inner(&mut self, handle: HeapHandle) -> Result<()> {
        let op = "destroy_heap";
        let Some(state) = self.state.as_mut() else {
            return Err(rejected(op, Error::NotInitialized));
        };
        check_index(op, "heap handle", handle)?;

        let Some(mut heap) = state.registry.remove(handle) else {
            return Err(rejected(op, Error::HeapNotFound(handle)));
        };

        let released = heap.release_all();
        metrics::record_released(released.iter().map(NodeSlot::length).sum());

        if !state.handles.release(handle) {
            warn!(heap = handle, "Handle was already available");
        }

        debug!(heap = handle, nodes = released.len(), "Destroyed heap");
        Ok(())
    }

    /// Release every node in `start..=end`
    ///
    /// Indices that were never written are skipped. Returns the number of
    /// nodes released.
    pub fn destroy_nodes(
        &mut self,
        handle: HeapHandle,
        start: NodeIndex,
        end: NodeIndex,
    ) -> Result<usize> {
        let result = self.destroy_nodes_inner(handle, start, end);
        metrics::record("destroy_nodes", &result);
        result
    }

    /// Release a single node; returns whether it existed
    pub fn destroy_node(&mut self, handle: HeapHandle, node: NodeIndex) -> Result<bool> {
        let result = self.destroy_nodes_inner(handle, node, node).map(|n| n > 0);
        metrics::record("destroy_node", &result);
        result
    }

    fn destroy_nodes_inner(
        &mut self,
        handle: HeapHandle,
        start: NodeIndex,
        end: NodeIndex,
    ) -> Result<usize> {
        let op = "destroy_nodes";
        let Some(state) = self.state.as_mut() else {
            return Err(rejected(op, Error::NotInitialized));
        };
        check_index(op, "heap handle", handle)?;
        check_index(op, "starting node", start)?;
        check_index(op, "ending node", end)?;

        let Some(heap) = state.registry.get_mut(handle) else {
            return Err(rejected(op, Error::HeapNotFound(handle)));
        };

        if start > end {
            debug!(heap = handle, start, end, "Empty node range");
            return Ok(0);
        }

        let (start, end) = (start as usize, end as usize);
        if start >= heap.size() {
            debug!(heap = handle, start, size = heap.size(), "Node range past heap capacity");
            return Ok(0);
        }
        let last = end.min(heap.size() - 1);

        let released = heap.release_range(start, last);
        let skipped = last - start + 1 - released.len();
        if skipped > 0 {
            debug!(heap = handle, start, end = last, skipped, "Heap nodes weren't initialized");
        }
        metrics::record_released(released.iter().map(NodeSlot::length).sum());

        debug!(heap = handle, start, end = last, released = released.len(), "Destroyed heap nodes");
        Ok(released.len())
    }

    /// Move `bytes` into a node, materializing it if needed
    ///
    /// On success the node owns the buffer. On any failure nothing is
    /// mutated and the buffer comes back inside [`WriteRejected`]; a node
    /// that already holds a buffer is never overwritten.
    pub fn set_data(
        &mut self,
        handle: HeapHandle,
        node: NodeIndex,
        bytes: impl Into<Bytes>,
    ) -> std::result::Result<(), WriteRejected> {
        let result = self.set_data_inner(handle, node, bytes.into());
        metrics::record("set_data", &result);
        result
    }

    fn set_data_inner(
        &mut self,
        handle: HeapHandle,
        node: NodeIndex,
        bytes: Bytes,
    ) -> std::result::Result<(), WriteRejected> {
        if let Some(error) = self.write_violation(handle, node, &bytes) {
            return Err(WriteRejected::new(error, bytes));
        }

        let Some(heap) = self
            .state
            .as_mut()
            .and_then(|state| state.registry.get_mut(handle))
        else {
            return Err(WriteRejected::new(Error::HeapNotFound(handle), bytes));
        };

        let length = bytes.len();
        match heap.install(node as usize, bytes) {
            Install::Created | Install::Filled => {
                metrics::record_written(length);
                debug!(heap = handle, node, len = length, "Set data into heap node");
                Ok(())
            }
            Install::Occupied(bytes) => Err(WriteRejected::new(
                rejected(
                    "set_data",
                    Error::NodeAlreadyPopulated { heap: handle, node },
                ),
                bytes,
            )),
        }
    }

    /// Run every write precondition, log each violation, return the first
    fn write_violation(&self, handle: HeapHandle, node: NodeIndex, bytes: &Bytes) -> Option<Error> {
        let op = "set_data";
        let mut violations = Vec::new();

        if self.state.is_none() {
            violations.push(Error::NotInitialized);
        }
        if handle < 0 {
            violations.push(Error::InvalidArgument(format!(
                "heap handle must be >= 0, got {}",
                handle
            )));
        }
        if node < 0 {
            violations.push(Error::InvalidArgument(format!(
                "node index must be >= 0, got {}",
                node
            )));
        }
        if bytes.is_empty() {
            violations.push(Error::InvalidArgument(
                "cannot set an empty buffer into a node".to_string(),
            ));
        }
        if let Some(state) = self.state.as_ref() {
            if handle >= 0 {
                match state.registry.get(handle) {
                    None => violations.push(Error::HeapNotFound(handle)),
                    Some(heap) if node >= 0 && !heap.contains_index(node as usize) => {
                        violations.push(Error::InvalidArgument(format!(
                            "node index {} out of range for heap with {} nodes",
                            node,
                            heap.size()
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        for violation in &violations {
            warn!(op, heap = handle, node, error = %violation, "Cannot set data into heap");
        }
        violations.into_iter().next()
    }

    /// Move the buffer out of a node, leaving the node empty
    pub fn take_data(&mut self, handle: HeapHandle, node: NodeIndex) -> Result<Bytes> {
        let result = self.take_data_inner(handle, node);
        metrics::record("take_data", &result);
        result
    }

    fn take_data_inner(&mut self, handle: HeapHandle, node: NodeIndex) -> Result<Bytes> {
        let op = "take_data";
        let Some(state) = self.state.as_mut() else {
            return Err(rejected(op, Error::NotInitialized));
        };
        check_index(op, "heap handle", handle)?;
        check_index(op, "node index", node)?;

        let Some(heap) = state.registry.get_mut(handle) else {
            return Err(rejected(op, Error::HeapNotFound(handle)));
        };
        let Some(bytes) = heap.take(node as usize) else {
            return Err(rejected(op, Error::NodeNotFound { heap: handle, node }));
        };

        debug!(heap = handle, node, len = bytes.len(), "Took data from heap node");
        Ok(bytes)
    }

    /// Borrow a read-only view of a node's buffer
    pub fn get_data(&self, handle: HeapHandle, node: NodeIndex) -> Result<NodeView<'_>> {
        let result = self.get_data_inner(handle, node);
        metrics::record("get_data", &result);
        result
    }

    fn get_data_inner(&self, handle: HeapHandle, node: NodeIndex) -> Result<NodeView<'_>> {
        self.slot("get_data", handle, node).map(NodeView::new)
    }

    fn slot(&self, op: &'static str, handle: HeapHandle, node: NodeIndex) -> Result<&NodeSlot> {
        let heap = self.heap(op, handle)?;
        check_index(op, "node index", node)?;
        heap.slot(node as usize)
            .ok_or_else(|| rejected(op, Error::NodeNotFound { heap: handle, node }))
    }

    /// Refcounted clone of a node's buffer
    pub(crate) fn get_shared(&self, handle: HeapHandle, node: NodeIndex) -> Result<Bytes> {
        let result = self.slot("get_data", handle, node).map(|slot| match slot {
            NodeSlot::Empty => Bytes::new(),
            NodeSlot::Populated(data) => data.bytes().clone(),
        });
        metrics::record("get_data", &result);
        result
    }

    /// Observable state of a node
    pub fn node_state(&self, handle: HeapHandle, node: NodeIndex) -> Result<NodeState> {
        let op = "node_state";
        let heap = self.heap(op, handle)?;
        check_index(op, "node index", node)?;
        Ok(heap.state(node as usize))
    }

    /// Node capacity of a live heap
    pub fn heap_capacity(&self, handle: HeapHandle) -> Result<usize> {
        self.heap("heap_capacity", handle).map(HeapInstance::size)
    }

    pub fn contains_heap(&self, handle: HeapHandle) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.registry.contains(handle))
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Maximum number of live heaps, once initialized
    pub fn max_heaps(&self) -> Option<usize> {
        self.state.as_ref().map(|state| state.registry.capacity())
    }

    /// Handles of every live heap, ascending
    pub fn handles(&self) -> Vec<HeapHandle> {
        self.state
            .as_ref()
            .map(|state| state.registry.handles())
            .unwrap_or_default()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get statistics about the pool
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats::default();
        let Some(state) = self.state.as_ref() else {
            return stats;
        };

        stats.initialized = true;
        stats.max_heaps = state.registry.capacity();
        stats.live_heaps = state.registry.len();
        stats.free_handles = state.handles.available();
        for (_, heap) in state.registry.iter() {
            stats.materialized_nodes += heap.node_count();
            stats.populated_nodes += heap.populated_count();
            stats.stored_bytes += heap.stored_bytes();
        }
        stats
    }

    /// Look up a live heap after the common preconditions
    fn heap(&self, op: &'static str, handle: HeapHandle) -> Result<&HeapInstance> {
        let Some(state) = self.state.as_ref() else {
            return Err(rejected(op, Error::NotInitialized));
        };
        check_index(op, "heap handle", handle)?;
        state
            .registry
            .get(handle)
            .ok_or_else(|| rejected(op, Error::HeapNotFound(handle)))
    }
}

/// Statistics for the heap pool
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub initialized: bool,
    pub max_heaps: usize,
    pub live_heaps: usize,
    pub free_handles: usize,
    pub materialized_nodes: usize,
    pub populated_nodes: usize,
    pub stored_bytes: usize,
}

fn rejected(op: &'static str, error: Error) -> Error {
    warn!(op, error = %error, "Heap pool operation rejected");
    error
}

fn check_index(op: &'static str, what: &str, value: i32) -> Result<()> {
    if value < 0 {
        return Err(rejected(
            op,
            Error::InvalidArgument(format!("{} must be >= 0, got {}", what, value)),
        ));
    }
    Ok(())
}
