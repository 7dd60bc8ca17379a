//! Scripted pool sessions
//!
//! A script is a JSON array of steps, each tagged by `op`:
//!
//! ```json
//! [
//!   {"op": "initialize", "max_heaps": 100},
//!   {"op": "create_heap", "nodes": 112},
//!   {"op": "set_data", "heap": 0, "node": 4, "data": [222, 173, 190, 239]},
//!   {"op": "get_data", "heap": 0, "node": 4}
//! ]
//! ```
//!
//! Steps run in order against one [`HeapPool`]. A failing step is recorded
//! and the script carries on.

use crate::error::{Error, Result};
use crate::pool::HeapPool;
use crate::{HeapHandle, NodeIndex};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

/// One pool operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Initialize {
        max_heaps: i32,
    },
    CreateHeap {
        nodes: i32,
    },
    DestroyHeap {
        heap: HeapHandle,
    },
    DestroyNodes {
        heap: HeapHandle,
        start: NodeIndex,
        end: NodeIndex,
    },
    DestroyNode {
        heap: HeapHandle,
        node: NodeIndex,
    },
    SetData {
        heap: HeapHandle,
        node: NodeIndex,
        #[serde(default)]
        data: Vec<u8>,
        /// UTF-8 text stored instead of `data` when present
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    GetData {
        heap: HeapHandle,
        node: NodeIndex,
    },
    TakeData {
        heap: HeapHandle,
        node: NodeIndex,
    },
    Teardown,
    Stats,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Initialize { .. } => "initialize",
            Step::CreateHeap { .. } => "create_heap",
            Step::DestroyHeap { .. } => "destroy_heap",
            Step::DestroyNodes { .. } => "destroy_nodes",
            Step::DestroyNode { .. } => "destroy_node",
            Step::SetData { .. } => "set_data",
            Step::GetData { .. } => "get_data",
            Step::TakeData { .. } => "take_data",
            Step::Teardown => "teardown",
            Step::Stats => "stats",
        }
    }

    fn apply(&self, pool: &mut HeapPool) -> Result<Option<Value>> {
        match self {
            Step::Initialize { max_heaps } => pool.initialize(*max_heaps).map(|()| None),
            Step::CreateHeap { nodes } => pool
                .create_heap(*nodes)
                .map(|heap| Some(json!({ "heap": heap }))),
            Step::DestroyHeap { heap } => pool.destroy_heap(*heap).map(|()| None),
            Step::DestroyNodes { heap, start, end } => pool
                .destroy_nodes(*heap, *start, *end)
                .map(|released| Some(json!({ "released": released }))),
            Step::DestroyNode { heap, node } => pool
                .destroy_node(*heap, *node)
                .map(|released| Some(json!({ "released": released }))),
            Step::SetData {
                heap,
                node,
                data,
                text,
            } => {
                let bytes = match text {
                    Some(text) => text.as_bytes().to_vec(),
                    None => data.clone(),
                };
                pool.set_data(*heap, *node, bytes)
                    .map(|()| None)
                    .map_err(Error::from)
            }
            Step::GetData { heap, node } => pool.get_data(*heap, *node).map(|view| {
                Some(json!({ "length": view.length(), "bytes": view.bytes() }))
            }),
            Step::TakeData { heap, node } => pool
                .take_data(*heap, *node)
                .map(|bytes| Some(json!({ "length": bytes.len(), "bytes": bytes.as_ref() }))),
            Step::Teardown => pool.teardown().map(|()| None),
            Step::Stats => serde_json::to_value(pool.stats())
                .map(Some)
                .map_err(|e| Error::InvalidArgument(format!("Failed to encode stats: {}", e))),
        }
    }
}

/// Result of running one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub op: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An ordered list of steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::InvalidArgument(format!("Invalid script: {}", e)))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidArgument(format!("Failed to read script {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Run every step, recording each outcome
    pub fn run(&self, pool: &mut HeapPool) -> Vec<StepOutcome> {
        self.steps
            .iter()
            .enumerate()
            .map(|(step, op)| match op.apply(pool) {
                Ok(value) => StepOutcome {
                    step,
                    op: op.name(),
                    ok: true,
                    value,
                    error: None,
                },
                Err(e) => StepOutcome {
                    step,
                    op: op.name(),
                    ok: false,
                    value: None,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r#"[
        {"op": "initialize", "max_heaps": 100},
        {"op": "create_heap", "nodes": 112},
        {"op": "destroy_heap", "heap": 0},
        {"op": "destroy_heap", "heap": 0},
        {"op": "create_heap", "nodes": 112},
        {"op": "set_data", "heap": 0, "node": 4, "data": [222, 173, 190, 239]},
        {"op": "get_data", "heap": 0, "node": 4},
        {"op": "destroy_node", "heap": 0, "node": 4},
        {"op": "get_data", "heap": 0, "node": 4}
    ]"#;

    #[test]
    fn test_parse_steps() -> Result<()> {
        let script = Script::from_json(SESSION)?;
        assert_eq!(script.steps.len(), 9);
        assert_eq!(script.steps[0], Step::Initialize { max_heaps: 100 });
        assert_eq!(script.steps[5].name(), "set_data");
        Ok(())
    }

    #[test]
    fn test_run_session() -> Result<()> {
        let script = Script::from_json(SESSION)?;
        let mut pool = HeapPool::new();
        let outcomes = script.run(&mut pool);

        let oks: Vec<bool> = outcomes.iter().map(|o| o.ok).collect();
        assert_eq!(
            oks,
            vec![true, true, true, false, true, true, true, true, false]
        );
        assert_eq!(outcomes[1].value, Some(json!({ "heap": 0 })));
        assert_eq!(
            outcomes[6].value,
            Some(json!({ "length": 4, "bytes": [222, 173, 190, 239] }))
        );
        assert_eq!(outcomes[3].error.as_deref(), Some("Heap not found: 0"));
        assert_eq!(
            outcomes[8].error.as_deref(),
            Some("Node not found: heap 0, node 4")
        );
        Ok(())
    }

    #[test]
    fn test_text_payload_and_stats() -> Result<()> {
        let script = Script::new(vec![
            Step::Initialize { max_heaps: 2 },
            Step::CreateHeap { nodes: 4 },
            Step::SetData {
                heap: 0,
                node: 1,
                data: Vec::new(),
                text: Some("hello".to_string()),
            },
            Step::Stats,
        ]);
        let mut pool = HeapPool::new();
        let outcomes = script.run(&mut pool);

        assert!(outcomes.iter().all(|o| o.ok));
        let stats = outcomes[3].value.as_ref().unwrap();
        assert_eq!(stats["stored_bytes"], json!(5));
        assert_eq!(pool.get_data(0, 1)?.bytes(), b"hello");
        Ok(())
    }

    #[test]
    fn test_invalid_script() {
        assert!(matches!(
            Script::from_json(r#"[{"op": "explode"}]"#),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_configured_handle_space_bounds_initialize() -> Result<()> {
        let config = crate::PoolConfig {
            max_heaps: 4,
            handle_space: 4,
            ..crate::PoolConfig::default()
        };
        let script = Script::new(vec![
            Step::Initialize { max_heaps: 10 },
            Step::Initialize { max_heaps: 4 },
        ]);
        let mut pool = HeapPool::with_config(&config)?;
        let outcomes = script.run(&mut pool);

        assert!(!outcomes[0].ok);
        assert!(outcomes[1].ok);
        assert_eq!(pool.max_heaps(), Some(4));
        Ok(())
    }
}
