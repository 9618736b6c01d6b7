//! Client side of avalanche-network-runner, the service that runs local
//! AvalancheGo clusters. The server is an external process
//! ("server" module), driven through its HTTP/JSON gateway ("gateway" module).
#[cfg(test)]
pub mod fake;
pub mod gateway;
pub mod server;

use std::{
    collections::BTreeMap,
    io::{self, Error, ErrorKind},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

/// Error message of the server when no network runs.
pub const ERR_NOT_BOOTSTRAPPED: &str = "not bootstrapped";

/// Returns true if the server reported that no network is running.
pub fn is_not_bootstrapped(e: &Error) -> bool {
    e.to_string().contains(ERR_NOT_BOOTSTRAPPED)
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    pub name: String,
    pub exec_path: String,
    pub uri: String,
    /// Node ID.
    pub id: String,
    pub log_dir: String,
    pub db_dir: String,
    pub plugin_dir: String,
    pub whitelisted_subnets: String,
    pub paused: bool,
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomChainInfo {
    pub chain_name: String,
    pub vm_id: String,
    pub subnet_id: String,
    pub chain_id: String,
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SubnetInfo {
    pub is_elastic: bool,
    pub elastic_subnet_id: String,
}

/// Snapshot of a running cluster as reported by the server.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterInfo {
    pub node_names: Vec<String>,
    pub node_infos: BTreeMap<String, NodeInfo>,
    pub pid: i32,
    pub root_data_dir: String,
    pub healthy: bool,
    pub custom_chains_healthy: bool,
    /// Blockchain ID to chain info.
    pub custom_chains: BTreeMap<String, CustomChainInfo>,
    /// Subnet ID to subnet info.
    pub subnets: BTreeMap<String, SubnetInfo>,
}

impl ClusterInfo {
    /// Node URIs in node name order.
    pub fn uris(&self) -> Vec<String> {
        self.nodes().iter().map(|n| n.uri.clone()).collect()
    }

    /// Nodes in the runner's "node_names" order. Nodes missing from it
    /// follow, sorted by the number in their name ("node2" before "node10").
    pub fn nodes(&self) -> Vec<&NodeInfo> {
        let mut out: Vec<&NodeInfo> = self
            .node_names
            .iter()
            .filter_map(|name| self.node_infos.get(name))
            .collect();
        let mut rest: Vec<&NodeInfo> = self
            .node_infos
            .iter()
            .filter(|(name, _)| !self.node_names.contains(name))
            .map(|(_, n)| n)
            .collect();
        rest.sort_by_key(|n| (node_index(&n.name), n.name.clone()));
        out.extend(rest);
        out
    }

    /// Subnet IDs, sorted.
    pub fn subnet_ids(&self) -> Vec<String> {
        self.subnets.keys().cloned().collect()
    }

    /// Blockchain ID of the first custom chain running the VM.
    pub fn find_blockchain_by_vm_id(&self, vm_id: &str) -> Option<(String, CustomChainInfo)> {
        self.custom_chains
            .iter()
            .find(|(_, c)| c.vm_id == vm_id)
            .map(|(id, c)| (id.clone(), c.clone()))
    }

    /// Next free "nodeN" name.
    pub fn next_node_name(&self) -> String {
        let mut max = 0;
        for name in self.node_names.iter().chain(self.node_infos.keys()) {
            if let Some(n) = name
                .strip_prefix("node")
                .and_then(|s| s.parse::<u32>().ok())
            {
                max = max.max(n);
            }
        }
        format!("node{}", max + 1)
    }
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainSpec {
    pub vm_name: String,
    /// Genesis file path.
    pub genesis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub chain_config: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub subnet_config: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub blockchain_alias: String,
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub exec_path: String,
    pub num_nodes: u32,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub whitelisted_subnets: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub global_node_config: String,
    pub root_data_dir: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub plugin_dir: String,
    pub reassign_ports_if_used: bool,
    pub dynamic_ports: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<u32>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub genesis_path: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub upgrade_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bootstrap_node_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bootstrap_node_ips: Vec<String>,
    pub fresh_staking_ids: bool,
    pub zero_ip_if_public_http_host: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub custom_node_configs: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddNodeRequest {
    pub name: String,
    pub exec_path: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub node_config: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub plugin_dir: String,
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RestartNodeRequest {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub exec_path: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub whitelisted_subnets: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub plugin_dir: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub root_data_dir: String,
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoadSnapshotRequest {
    pub snapshot_name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub exec_path: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub plugin_dir: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub root_data_dir: String,
    /// Directory the snapshot is read from.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub snapshot_path: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub global_node_config: String,
    pub reassign_ports_if_used: bool,
    /// Runs the nodes over the snapshot dir instead of a copy.
    pub in_place: bool,
}

/// Calls of the network-runner control service.
#[allow(async_fn_in_trait)]
pub trait NetworkRunner {
    async fn ping(&self) -> io::Result<()>;
    async fn start(&self, req: StartRequest) -> io::Result<ClusterInfo>;
    async fn health(&self) -> io::Result<ClusterInfo>;
    async fn status(&self) -> io::Result<ClusterInfo>;
    async fn stop(&self) -> io::Result<()>;
    async fn add_node(&self, req: AddNodeRequest) -> io::Result<ClusterInfo>;
    async fn restart_node(&self, req: RestartNodeRequest) -> io::Result<ClusterInfo>;
    async fn load_snapshot(&self, req: LoadSnapshotRequest) -> io::Result<ClusterInfo>;
    async fn save_snapshot(&self, snapshot_name: &str) -> io::Result<()>;
    async fn remove_snapshot(&self, snapshot_name: &str) -> io::Result<()>;
    async fn create_blockchains(&self, specs: Vec<BlockchainSpec>) -> io::Result<ClusterInfo>;
}

/// Status that treats "no network running" as "None".
pub async fn status_if_running<R: NetworkRunner>(runner: &R) -> io::Result<Option<ClusterInfo>> {
    match runner.status().await {
        Ok(info) => Ok(Some(info)),
        Err(e) if is_not_bootstrapped(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Polls until the network and every custom chain are healthy.
/// A "not bootstrapped" error is returned as is, so callers can boot the network.
pub async fn wait_for_healthy<R: NetworkRunner>(
    runner: &R,
    interval: Duration,
    timeout: Duration,
) -> io::Result<ClusterInfo> {
    let deadline = Instant::now() + timeout;
    loop {
        sleep(interval).await;
        log::debug!("polling for health...");

        let info = runner.health().await?;
        if !info.healthy {
            log::debug!("network is not healthy, polling again...");
        } else if !info.custom_chains_healthy {
            log::debug!("network is up but custom VMs are not healthy, polling again...");
        } else {
            log::debug!("network is up and custom VMs are up");
            return Ok(info);
        }

        if Instant::now() > deadline {
            return Err(Error::new(
                ErrorKind::TimedOut,
                format!("network not healthy after {:?}", timeout),
            ));
        }
    }
}

pub(crate) fn missing_cluster_info() -> Error {
    Error::new(
        ErrorKind::InvalidData,
        "network-runner response has no cluster info",
    )
}

/// Number suffix of a "node<N>" name, u32::MAX for any other name.
fn node_index(name: &str) -> u32 {
    name.strip_prefix("node")
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(u32::MAX)
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- netrunner::test_cluster_info --exact --show-output
#[test]
fn test_cluster_info() {
    let d = r#"
{
    "nodeNames": ["node1", "node2"],
    "nodeInfos": {
        "node1": {"name": "node1", "uri": "http://127.0.0.1:9650", "id": "NodeID-7Xhw2mDxuDS44j42TCB6U5579esbSt3Lg"},
        "node2": {"name": "node2", "uri": "http://127.0.0.1:9652", "id": "NodeID-MFrZFVCXPv5iCn6M9K6XduxGTYp891xXZ"}
    },
    "pid": 1234,
    "rootDataDir": "/tmp/network",
    "healthy": true,
    "customChainsHealthy": true,
    "customChains": {
        "bc1": {"chainName": "alpha", "vmId": "vm1", "subnetId": "s1", "chainId": "bc1"}
    },
    "subnets": {"s2": {}, "s1": {"isElastic": false}},
    "attachedPeerInfos": {}
}
"#;
    let info: ClusterInfo = serde_json::from_str(d).unwrap();
    assert!(info.healthy);
    assert_eq!(
        info.uris(),
        vec!["http://127.0.0.1:9650", "http://127.0.0.1:9652"]
    );
    assert_eq!(info.subnet_ids(), vec!["s1", "s2"]);
    assert_eq!(info.find_blockchain_by_vm_id("vm1").unwrap().0, "bc1");
    assert!(info.find_blockchain_by_vm_id("vm2").is_none());
    assert_eq!(info.next_node_name(), "node3");

    let mut info = ClusterInfo::default();
    for i in [1, 10, 2, 11, 3] {
        let name = format!("node{}", i);
        info.node_infos.insert(
            name.clone(),
            NodeInfo {
                name,
                uri: format!("http://127.0.0.1:{}", 9648 + 2 * i),
                ..Default::default()
            },
        );
    }
    let names: Vec<&str> = info.nodes().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["node1", "node2", "node3", "node10", "node11"]);
    assert_eq!(info.uris()[1], "http://127.0.0.1:9652");

    // runner order wins over the numeric one
    info.node_names = vec![String::from("node3"), String::from("node1")];
    let names: Vec<&str> = info.nodes().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["node3", "node1", "node2", "node10", "node11"]);

    assert!(is_not_bootstrapped(&Error::new(
        ErrorKind::Other,
        "network not bootstrapped"
    )));
}
