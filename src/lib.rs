// nodeheap - Handle-indexed heaps of byte buffers
// Callers exchange integer handles instead of raw pointers.

#![warn(rust_2018_idioms)]

pub mod config;
pub mod metrics;
pub mod pool;
pub mod script;

// Re-exports for convenience
pub use config::PoolConfig;
pub use pool::{HeapPool, NodeState, NodeView, PoolStats, SharedHeapPool};

/// Integer handle identifying a live heap
pub type HeapHandle = i32;

/// Index of a node slot within a heap
pub type NodeIndex = i32;

/// nodeheap error types
pub mod error {
    use bytes::Bytes;
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("Heap pool not initialized")]
        NotInitialized,

        #[error("Heap pool already initialized")]
        AlreadyInitialized,

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        #[error("Capacity exceeded: requested {requested} heaps, maximum is {maximum}")]
        CapacityExceeded { requested: i64, maximum: i64 },

        #[error("No heap handles available")]
        HandlesExhausted,

        #[error("Heap not found: {0}")]
        HeapNotFound(i32),

        #[error("Node not found: heap {heap}, node {node}")]
        NodeNotFound { heap: i32, node: i32 },

        #[error("Node already populated: heap {heap}, node {node}")]
        NodeAlreadyPopulated { heap: i32, node: i32 },

        #[error("Configuration error: {0}")]
        Config(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;

    /// A write that was refused.
    ///
    /// The buffer is handed back untouched so the caller keeps ownership on
    /// every failure path.
    #[derive(Error, Debug)]
    #[error("{error}")]
    pub struct WriteRejected {
        pub error: Error,
        bytes: Bytes,
    }

    impl WriteRejected {
        pub(crate) fn new(error: Error, bytes: Bytes) -> Self {
            Self { error, bytes }
        }

        /// The buffer that was not stored
        pub fn bytes(&self) -> &Bytes {
            &self.bytes
        }

        /// Recover the buffer
        pub fn into_bytes(self) -> Bytes {
            self.bytes
        }
    }

    impl From<WriteRejected> for Error {
        fn from(rejected: WriteRejected) -> Self {
            rejected.error
        }
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::error::{Error, WriteRejected};
    use super::*;

    #[test]
    fn test_version_format() {
        let _version: &str = VERSION;
    }

    #[test]
    fn test_write_rejected_returns_buffer() {
        let rejected = WriteRejected::new(
            Error::HeapNotFound(3),
            bytes::Bytes::from_static(b"payload"),
        );
        assert_eq!(rejected.to_string(), "Heap not found: 3");
        assert_eq!(rejected.bytes().as_ref(), b"payload");

        let buffer = rejected.into_bytes();
        assert_eq!(buffer.as_ref(), b"payload");
    }

    #[test]
    fn test_write_rejected_into_error() {
        let rejected = WriteRejected::new(Error::HandlesExhausted, bytes::Bytes::new());
        let error: Error = rejected.into();
        assert_eq!(error, Error::HandlesExhausted);
    }
}
