//! A single heap and its node slots

use super::node::{DataNode, NodeSlot, NodeState};
use super::store::GrowableStore;
use bytes::Bytes;

/// Outcome of installing a buffer into a node
#[derive(Debug)]
pub enum Install {
    /// The node did not exist and was materialized
    Created,
    /// An empty node was filled
    Filled,
    /// The node already holds a buffer; the offered one is handed back
    Occupied(Bytes),
}

/// A heap: a fixed number of lazily materialized node slots
#[derive(Debug)]
pub struct HeapInstance {
    nodes: GrowableStore<NodeSlot>,
    size: usize,
}

impl HeapInstance {
    /// Create a heap addressing `size` nodes, none materialized
    pub fn new(size: usize) -> Self {
        Self {
            nodes: GrowableStore::with_capacity(size),
            size,
        }
    }

    /// Node capacity declared at creation
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains_index(&self, node: usize) -> bool {
        node < self.size
    }

    pub fn slot(&self, node: usize) -> Option<&NodeSlot> {
        self.nodes.get(node)
    }

    pub fn state(&self, node: usize) -> NodeState {
        self.nodes
            .get(node)
            .map_or(NodeState::Unallocated, NodeSlot::state)
    }

    /// Store `bytes` at `node` unless it already holds a buffer
    ///
    /// The caller checks `contains_index` first; an out-of-range index is
    /// reported as `Occupied` so the buffer is never lost.
    pub fn install(&mut self, node: usize, bytes: Bytes) -> Install {
        match self.nodes.get_mut(node) {
            Some(slot) => match slot {
                NodeSlot::Populated(_) => Install::Occupied(bytes),
                NodeSlot::Empty => {
                    *slot = NodeSlot::Populated(DataNode::new(bytes));
                    Install::Filled
                }
            },
            None => match self
                .nodes
                .set(node, NodeSlot::Populated(DataNode::new(bytes)))
            {
                Ok(_) => Install::Created,
                Err(slot) => match slot {
                    NodeSlot::Populated(data) => Install::Occupied(data.into_bytes()),
                    NodeSlot::Empty => Install::Occupied(Bytes::new()),
                },
            },
        }
    }

    /// Move the buffer out of `node`, leaving it materialized but empty
    pub fn take(&mut self, node: usize) -> Option<Bytes> {
        let slot = self.nodes.get_mut(node)?;
        match std::mem::replace(slot, NodeSlot::Empty) {
            NodeSlot::Populated(data) => Some(data.into_bytes()),
            NodeSlot::Empty => None,
        }
    }

    /// Release every node in `start..=end`, returning the slots freed
    pub fn release_range(&mut self, start: usize, end: usize) -> Vec<NodeSlot> {
        self.nodes.clear_range(start, end)
    }

    /// Release every node
    pub fn release_all(&mut self) -> Vec<NodeSlot> {
        let end = self.nodes.count();
        if end == 0 {
            return Vec::new();
        }
        self.nodes.clear_range(0, end - 1)
    }

    /// Number of materialized nodes
    pub fn node_count(&self) -> usize {
        self.nodes.occupied()
    }

    /// Number of nodes holding a buffer
    pub fn populated_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|(_, slot)| matches!(slot, NodeSlot::Populated(_)))
            .count()
    }

    /// Total bytes held by this heap
    pub fn stored_bytes(&self) -> usize {
        self.nodes.iter().map(|(_, slot)| slot.length()).sum()
    }
}
