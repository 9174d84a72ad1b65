//! Typed view of a `cognee_memory` invocation.
//!
//! Parsing happens before authentication so that malformed calls are
//! rejected without touching the network.

use serde_json::Value;

use crate::tool::{arg_bool, arg_str, ToolError};

pub const DEFAULT_SEARCH_TYPE: &str = "GRAPH_COMPLETION";
pub const DEFAULT_TOP_K: i64 = 5;

/// Where the operation's dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSelector {
    /// Explicit id, used as-is.
    Id(String),
    /// Explicit name, created (or fetched) remotely.
    Name(String),
    /// Session-derived default name.
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryOp {
    Add {
        text: String,
        do_cognify: bool,
        run_in_background: bool,
    },
    Search {
        query: String,
        search_type: String,
        top_k: i64,
    },
    Visualize {
        dataset_id: String,
    },
}

impl MemoryOp {
    pub fn mode(&self) -> &'static str {
        match self {
            MemoryOp::Add { .. } => "add",
            MemoryOp::Search { .. } => "search",
            MemoryOp::Visualize { .. } => "visualize",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRequest {
    pub op: MemoryOp,
    pub dataset: DatasetSelector,
}

impl MemoryRequest {
    pub fn parse(input: &Value) -> Result<Self, ToolError> {
        let mode = arg_str(input, "mode");
        let op = match mode.as_str() {
            "" => return Err(invalid("mode is required")),
            "add" => {
                let text = arg_str(input, "text");
                if text.is_empty() {
                    return Err(invalid("text is required for add"));
                }
                MemoryOp::Add {
                    text,
                    do_cognify: arg_bool(input, "do_cognify") == Some(true),
                    run_in_background: arg_bool(input, "run_in_background") != Some(false),
                }
            }
            "search" => {
                let query = arg_str(input, "query");
                if query.is_empty() {
                    return Err(invalid("query is required for search"));
                }
                let search_type = arg_str(input, "search_type");
                MemoryOp::Search {
                    query,
                    search_type: if search_type.is_empty() {
                        DEFAULT_SEARCH_TYPE.to_string()
                    } else {
                        search_type
                    },
                    top_k: input
                        .get("top_k")
                        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
                        .unwrap_or(DEFAULT_TOP_K),
                }
            }
            "visualize" => {
                let dataset_id = arg_str(input, "visualize_dataset_id");
                if dataset_id.is_empty() {
                    return Err(invalid("visualize requires visualize_dataset_id"));
                }
                MemoryOp::Visualize { dataset_id }
            }
            other => return Err(invalid(&format!("unsupported mode: {other}"))),
        };

        let dataset_id = arg_str(input, "dataset_id");
        let dataset_name = arg_str(input, "dataset_name");
        let dataset = if !dataset_id.is_empty() {
            DatasetSelector::Id(dataset_id)
        } else if !dataset_name.is_empty() {
            DatasetSelector::Name(dataset_name)
        } else {
            DatasetSelector::Default
        };

        Ok(Self { op, dataset })
    }
}

fn invalid(msg: &str) -> ToolError {
    ToolError::InvalidInput(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn err_msg(input: Value) -> String {
        match MemoryRequest::parse(&input) {
            Err(ToolError::InvalidInput(msg)) => msg,
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_required_fields_per_mode() {
        assert_eq!(err_msg(json!({})), "mode is required");
        assert_eq!(err_msg(json!({"mode": "add"})), "text is required for add");
        assert_eq!(err_msg(json!({"mode": "search", "query": ""})), "query is required for search");
        assert_eq!(
            err_msg(json!({"mode": "visualize", "dataset_id": "ds"})),
            "visualize requires visualize_dataset_id"
        );
        assert_eq!(err_msg(json!({"mode": "forget"})), "unsupported mode: forget");
    }

    #[test]
    fn test_add_defaults() {
        let req = MemoryRequest::parse(&json!({"mode": "add", "text": "likes tea"})).unwrap();
        assert_eq!(
            req.op,
            MemoryOp::Add {
                text: "likes tea".to_string(),
                do_cognify: false,
                run_in_background: true,
            }
        );
        assert_eq!(req.dataset, DatasetSelector::Default);
    }

    #[test]
    fn test_cognify_flags_need_real_booleans() {
        let req = MemoryRequest::parse(&json!({
            "mode": "add", "text": "t", "do_cognify": "true", "run_in_background": "false"
        }))
        .unwrap();
        assert!(matches!(
            req.op,
            MemoryOp::Add { do_cognify: false, run_in_background: true, .. }
        ));

        let req = MemoryRequest::parse(&json!({
            "mode": "add", "text": "t", "do_cognify": true, "run_in_background": false
        }))
        .unwrap();
        assert!(matches!(
            req.op,
            MemoryOp::Add { do_cognify: true, run_in_background: false, .. }
        ));
    }

    #[test]
    fn test_search_defaults_and_top_k() {
        let req = MemoryRequest::parse(&json!({"mode": "search", "query": "q", "search_type": ""})).unwrap();
        assert_eq!(
            req.op,
            MemoryOp::Search {
                query: "q".to_string(),
                search_type: DEFAULT_SEARCH_TYPE.to_string(),
                top_k: DEFAULT_TOP_K,
            }
        );

        let req = MemoryRequest::parse(&json!({"mode": "search", "query": "q", "top_k": 7.9})).unwrap();
        assert!(matches!(req.op, MemoryOp::Search { top_k: 7, .. }));

        let req = MemoryRequest::parse(&json!({"mode": "search", "query": "q", "top_k": "9"})).unwrap();
        assert!(matches!(req.op, MemoryOp::Search { top_k: 5, .. }));
    }

    #[test]
    fn test_dataset_selector_precedence() {
        let req = MemoryRequest::parse(&json!({
            "mode": "search", "query": "q", "dataset_id": "id-1", "dataset_name": "named"
        }))
        .unwrap();
        assert_eq!(req.dataset, DatasetSelector::Id("id-1".to_string()));

        let req = MemoryRequest::parse(&json!({"mode": "search", "query": "q", "dataset_name": "named"})).unwrap();
        assert_eq!(req.dataset, DatasetSelector::Name("named".to_string()));
    }
}
