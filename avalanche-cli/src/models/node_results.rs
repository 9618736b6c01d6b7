use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

/// Outcome of one host's part in a fan-out.
#[derive(Debug, Clone, Default)]
pub struct NodeResult {
    pub node_id: String,
    pub value: String,
    pub err: Option<String>,
}

/// Append-only collector shared by the tasks of a fan-out.
/// Clones share the same underlying list.
#[derive(Debug, Clone, Default)]
pub struct NodeResults {
    inner: Arc<Mutex<Vec<NodeResult>>>,
}

impl NodeResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, node_id: &str, value: &str, err: Option<String>) {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(NodeResult {
            node_id: node_id.to_string(),
            value: value.to_string(),
            err,
        });
    }

    pub fn get_results(&self) -> Vec<NodeResult> {
        match self.inner.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.get_results().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_errors(&self) -> bool {
        self.get_results().iter().any(|r| r.err.is_some())
    }

    /// Node ID to error message of every failed host.
    pub fn get_error_host_map(&self) -> BTreeMap<String, String> {
        self.get_results()
            .into_iter()
            .filter_map(|r| r.err.map(|e| (r.node_id, e)))
            .collect()
    }

    /// Node ID to value of every host.
    pub fn get_result_map(&self) -> BTreeMap<String, String> {
        self.get_results()
            .into_iter()
            .map(|r| (r.node_id, r.value))
            .collect()
    }

    pub fn get_nodes_with_errors(&self) -> Vec<String> {
        self.get_error_host_map().into_keys().collect()
    }

    pub fn get_node_list(&self) -> Vec<String> {
        self.get_results().into_iter().map(|r| r.node_id).collect()
    }
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- models::node_results::test_node_results --exact --show-output
#[tokio::test]
async fn test_node_results() {
    let results = NodeResults::new();
    assert!(results.is_empty());
    assert!(!results.has_errors());

    let mut handles = Vec::new();
    for i in 0..10 {
        let r = results.clone();
        handles.push(tokio::spawn(async move {
            let node_id = format!("node{}", i);
            if i % 3 == 0 {
                r.add(&node_id, "", Some(format!("failed {}", i)));
            } else {
                r.add(&node_id, "true", None);
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(results.len(), 10);
    assert!(results.has_errors());
    assert_eq!(
        results.get_nodes_with_errors(),
        vec!["node0", "node3", "node6", "node9"]
    );
    assert_eq!(results.get_error_host_map()["node3"], "failed 3");
    assert_eq!(results.get_result_map()["node1"], "true");
    assert_eq!(results.get_node_list().len(), 10);
}
