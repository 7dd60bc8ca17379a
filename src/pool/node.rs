//! Node slots and read views

use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// A populated node: an owned buffer and its length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataNode {
    length: usize,
    bytes: Bytes,
}

impl DataNode {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            length: bytes.len(),
            bytes,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Contents of a materialized node slot
///
/// An absent slot in the heap's store is the unallocated state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSlot {
    /// Materialized but holding no buffer
    Empty,
    Populated(DataNode),
}

impl NodeSlot {
    pub fn state(&self) -> NodeState {
        match self {
            NodeSlot::Empty => NodeState::Empty,
            NodeSlot::Populated(_) => NodeState::Populated,
        }
    }

    /// Length of the stored buffer, zero when empty
    pub fn length(&self) -> usize {
        match self {
            NodeSlot::Empty => 0,
            NodeSlot::Populated(node) => node.length(),
        }
    }
}

/// Observable state of a node index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Unallocated,
    Empty,
    Populated,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeState::Unallocated => "unallocated",
            NodeState::Empty => "empty",
            NodeState::Populated => "populated",
        };
        f.write_str(name)
    }
}

/// Read-only view of a node's buffer
///
/// Borrowed from the pool; the node keeps ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView<'a> {
    bytes: &'a [u8],
}

impl<'a> NodeView<'a> {
    pub(crate) fn new(slot: &'a NodeSlot) -> Self {
        let bytes: &'a [u8] = match slot {
            NodeSlot::Empty => &[],
            NodeSlot::Populated(node) => &node.bytes()[..],
        };
        Self { bytes }
    }

    pub fn length(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// True for a materialized node holding no buffer
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}
