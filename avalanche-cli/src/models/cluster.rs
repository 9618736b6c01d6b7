use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    constants,
    models::{host::Host, network::Network},
};

/// How the node HTTP API is exposed.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum HttpAccess {
    #[default]
    Private,
    Public,
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct ExtraNetworkData {
    #[serde(default)]
    pub c_chain_teleporter_messenger_address: String,
    #[serde(default)]
    pub c_chain_teleporter_registry_address: String,
}

/// Per-cluster metadata.
/// For cloud clusters "nodes" and "api_nodes" hold cloud IDs
/// (inventory IDs with the cloud prefix stripped).
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct ClusterConfig {
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub api_nodes: Vec<String>,
    pub network: Network,
    /// Cloud ID of the separate monitoring instance, if any.
    #[serde(default)]
    pub monitoring_instance: String,
    /// Load test name to cloud ID of its instance.
    #[serde(default)]
    pub load_test_instance: BTreeMap<String, String>,
    #[serde(default)]
    pub extra_network_data: ExtraNetworkData,
    /// Names of the blockchains the cluster tracks.
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub http_access: HttpAccess,
}

impl ClusterConfig {
    pub fn get_api_hosts(&self, hosts: &[Host]) -> Vec<Host> {
        hosts
            .iter()
            .filter(|h| self.api_nodes.contains(&h.get_cloud_id()))
            .cloned()
            .collect()
    }

    pub fn get_validator_hosts(&self, hosts: &[Host]) -> Vec<Host> {
        hosts
            .iter()
            .filter(|h| !self.api_nodes.contains(&h.get_cloud_id()))
            .cloned()
            .collect()
    }

    pub fn is_api_host(&self, cloud_id: &str) -> bool {
        self.local || self.api_nodes.iter().any(|n| n == cloud_id)
    }

    pub fn is_avalanchego_host(&self, cloud_id: &str) -> bool {
        self.local || self.nodes.iter().any(|n| n == cloud_id)
    }

    /// Cloud IDs of every instance the cluster owns.
    /// Empty for local clusters.
    pub fn get_cloud_ids(&self) -> Vec<String> {
        if self.local {
            return Vec::new();
        }
        let mut ids = self.nodes.clone();
        if !self.monitoring_instance.is_empty() {
            ids.push(self.monitoring_instance.clone());
        }
        ids
    }

    pub fn get_host_roles(&self, cloud_id: &str) -> Vec<String> {
        let mut roles = Vec::new();
        if self.is_avalanchego_host(cloud_id) {
            if self.is_api_host(cloud_id) {
                roles.push(constants::API_ROLE.to_string());
            } else {
                roles.push(constants::VALIDATOR_ROLE.to_string());
            }
        }
        if !self.monitoring_instance.is_empty() && self.monitoring_instance == cloud_id {
            roles.push(constants::MONITOR_ROLE.to_string());
        }
        if self.load_test_instance.values().any(|v| v == cloud_id) {
            roles.push(constants::LOAD_TEST_ROLE.to_string());
        }
        roles
    }

    /// Adds the blockchain to the tracked list, keeping it unique.
    pub fn add_subnet(&mut self, blockchain_name: &str) {
        if !self.subnets.iter().any(|s| s == blockchain_name) {
            self.subnets.push(blockchain_name.to_string());
        }
    }
}

/// All clusters known to this installation.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct ClustersConfig {
    #[serde(default)]
    pub version: String,
    /// Key pair name to certificate path.
    #[serde(default)]
    pub key_pair: BTreeMap<String, String>,
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterConfig>,
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- models::cluster::test_cluster_roles --exact --show-output
#[test]
fn test_cluster_roles() {
    let cc = ClusterConfig {
        nodes: vec![String::from("i-1"), String::from("i-2"), String::from("i-3")],
        api_nodes: vec![String::from("i-3")],
        network: Network::fuji(),
        monitoring_instance: String::from("i-mon"),
        load_test_instance: BTreeMap::from([(String::from("lt"), String::from("i-lt"))]),
        ..Default::default()
    };

    assert!(cc.is_api_host("i-3"));
    assert!(!cc.is_api_host("i-1"));
    assert!(cc.is_avalanchego_host("i-1"));
    assert!(!cc.is_avalanchego_host("i-mon"));

    assert_eq!(cc.get_host_roles("i-1"), vec!["Validator"]);
    assert_eq!(cc.get_host_roles("i-3"), vec!["API"]);
    assert_eq!(cc.get_host_roles("i-mon"), vec!["Monitor"]);
    assert_eq!(cc.get_host_roles("i-lt"), vec!["Load Test"]);

    assert_eq!(cc.get_cloud_ids(), vec!["i-1", "i-2", "i-3", "i-mon"]);

    let hosts: Vec<Host> = ["i-1", "i-2", "i-3"]
        .iter()
        .map(|id| Host {
            node_id: format!("aws_node_{}", id),
            ..Default::default()
        })
        .collect();
    let api = cc.get_api_hosts(&hosts);
    assert_eq!(api.len(), 1);
    assert_eq!(api[0].node_id, "aws_node_i-3");
    assert_eq!(cc.get_validator_hosts(&hosts).len(), 2);

    let local = ClusterConfig {
        local: true,
        network: Network::local(),
        ..Default::default()
    };
    assert!(local.get_cloud_ids().is_empty());
    assert!(local.is_api_host("anything"));
    assert_eq!(local.get_host_roles("node1"), vec!["API"]);
}
