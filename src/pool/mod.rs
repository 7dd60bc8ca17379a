//! Heap Pool
//!
//! Two-tier, handle-indexed storage for byte buffers. Callers receive
//! integer handles instead of pointers.
//!
//! # Architecture
//!
//! ```text
//! HeapPool
//!   ├─→ HandlePool   → Free: [3, 1]         (LIFO, capped at max_heaps)
//!   └─→ HeapRegistry → handle → HeapInstance
//!        ├─→ 0 → nodes: [_, _, Populated(4B), _, Empty]
//!        └─→ 2 → nodes: [Populated(12B)]
//! ```
//!
//! Nodes are materialized lazily by the first successful write and can be
//! destroyed one at a time or by inclusive range. A node holding a buffer is
//! never overwritten. Destroying a heap releases its nodes and recycles the
//! handle.

pub mod handles;
pub mod instance;
pub mod manager;
pub mod node;
pub mod registry;
pub mod shared;
pub mod store;

pub use handles::HandlePool;
pub use instance::HeapInstance;
pub use manager::{HeapPool, PoolStats};
pub use node::{DataNode, NodeSlot, NodeState, NodeView};
pub use registry::HeapRegistry;
pub use shared::SharedHeapPool;
pub use store::GrowableStore;
