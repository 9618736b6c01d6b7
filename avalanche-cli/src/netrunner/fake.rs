//! In-memory network runner for unit tests.
use std::{
    io::{self, Error, ErrorKind},
    sync::Mutex,
};

use avalanche_types::{ids, subnet};

use crate::netrunner::{
    AddNodeRequest, BlockchainSpec, ClusterInfo, CustomChainInfo, LoadSnapshotRequest,
    NetworkRunner, NodeInfo, RestartNodeRequest, StartRequest, SubnetInfo, ERR_NOT_BOOTSTRAPPED,
};

#[derive(Debug, Default)]
pub struct FakeState {
    pub info: Option<ClusterInfo>,
    /// Subnets present once a network is started or loaded.
    pub preloaded_subnets: usize,
    pub fail_start: bool,
    pub fail_load: bool,
    pub calls: Vec<String>,
    pub started: Option<StartRequest>,
    pub loaded: Option<LoadSnapshotRequest>,
    pub restarted: Vec<RestartNodeRequest>,
    pub created: Vec<BlockchainSpec>,
}

#[derive(Debug, Default)]
pub struct FakeRunner {
    pub state: Mutex<FakeState>,
}

pub fn test_id(seed: u8) -> ids::Id {
    ids::Id::from_slice(&[seed; 32])
}

fn not_bootstrapped() -> Error {
    Error::new(
        ErrorKind::Other,
        format!("network-runner /v1/control/health failed: network {}", ERR_NOT_BOOTSTRAPPED),
    )
}

fn node_info(idx: usize, root: &str) -> NodeInfo {
    let name = format!("node{}", idx);
    NodeInfo {
        name: name.clone(),
        uri: format!("http://127.0.0.1:{}", 9650 + 2 * (idx - 1)),
        id: format!("NodeID-{}", idx),
        db_dir: format!("{}/{}/db", root, name),
        log_dir: format!("{}/{}/logs", root, name),
        ..Default::default()
    }
}

impl FakeRunner {
    pub fn new(preloaded_subnets: usize) -> Self {
        Self {
            state: Mutex::new(FakeState {
                preloaded_subnets,
                ..Default::default()
            }),
        }
    }

    /// Starts with a running network of "num_nodes" nodes.
    pub fn running(num_nodes: usize, preloaded_subnets: usize, root: &str) -> Self {
        let runner = Self::new(preloaded_subnets);
        if let Ok(mut st) = runner.state.lock() {
            st.info = Some(Self::boot(num_nodes, preloaded_subnets, root));
        }
        runner
    }

    fn boot(num_nodes: usize, preloaded_subnets: usize, root: &str) -> ClusterInfo {
        let mut info = ClusterInfo {
            pid: 1,
            root_data_dir: root.to_string(),
            healthy: true,
            custom_chains_healthy: true,
            ..Default::default()
        };
        for i in 1..=num_nodes {
            let n = node_info(i, root);
            info.node_names.push(n.name.clone());
            info.node_infos.insert(n.name.clone(), n);
        }
        for i in 0..preloaded_subnets {
            info.subnets
                .insert(test_id(100 + i as u8).to_string(), SubnetInfo::default());
        }
        info
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: &str) {
        self.state.lock().unwrap().calls.push(call.to_string());
    }

    fn current(&self) -> io::Result<ClusterInfo> {
        self.state
            .lock()
            .unwrap()
            .info
            .clone()
            .ok_or_else(not_bootstrapped)
    }
}

impl NetworkRunner for FakeRunner {
    async fn ping(&self) -> io::Result<()> {
        Ok(())
    }

    async fn start(&self, req: StartRequest) -> io::Result<ClusterInfo> {
        self.record("start");
        let mut st = self.state.lock().unwrap();
        if st.fail_start {
            return Err(Error::new(ErrorKind::Other, "bogus start failure"));
        }
        let info = Self::boot(req.num_nodes as usize, st.preloaded_subnets, &req.root_data_dir);
        st.started = Some(req);
        st.info = Some(info.clone());
        Ok(info)
    }

    async fn health(&self) -> io::Result<ClusterInfo> {
        self.record("health");
        self.current()
    }

    async fn status(&self) -> io::Result<ClusterInfo> {
        self.record("status");
        self.current()
    }

    async fn stop(&self) -> io::Result<()> {
        self.record("stop");
        let mut st = self.state.lock().unwrap();
        if st.info.take().is_none() {
            return Err(not_bootstrapped());
        }
        Ok(())
    }

    async fn add_node(&self, req: AddNodeRequest) -> io::Result<ClusterInfo> {
        self.record("add_node");
        let mut st = self.state.lock().unwrap();
        let info = st.info.as_mut().ok_or_else(not_bootstrapped)?;
        let idx = info.node_infos.len() + 1;
        let mut n = node_info(idx, &info.root_data_dir.clone());
        n.name = req.name.clone();
        info.node_names.push(req.name.clone());
        info.node_infos.insert(req.name, n);
        Ok(info.clone())
    }

    async fn restart_node(&self, req: RestartNodeRequest) -> io::Result<ClusterInfo> {
        self.record("restart_node");
        let mut st = self.state.lock().unwrap();
        let mut info = st.info.clone().ok_or_else(not_bootstrapped)?;
        match info.node_infos.get_mut(&req.name) {
            Some(n) => n.whitelisted_subnets = req.whitelisted_subnets.clone(),
            None => {
                return Err(Error::new(
                    ErrorKind::NotFound,
                    format!("node {} not found", req.name),
                ))
            }
        }
        st.info = Some(info.clone());
        st.restarted.push(req);
        Ok(info)
    }

    async fn load_snapshot(&self, req: LoadSnapshotRequest) -> io::Result<ClusterInfo> {
        self.record("load_snapshot");
        let mut st = self.state.lock().unwrap();
        if st.fail_load {
            return Err(Error::new(ErrorKind::Other, "bogus load failure"));
        }
        let info = Self::boot(5, st.preloaded_subnets, &req.root_data_dir);
        st.loaded = Some(req);
        st.info = Some(info.clone());
        Ok(info)
    }

    async fn save_snapshot(&self, snapshot_name: &str) -> io::Result<()> {
        self.record(&format!("save_snapshot {}", snapshot_name));
        Ok(())
    }

    async fn remove_snapshot(&self, snapshot_name: &str) -> io::Result<()> {
        self.record(&format!("remove_snapshot {}", snapshot_name));
        Ok(())
    }

    async fn create_blockchains(&self, specs: Vec<BlockchainSpec>) -> io::Result<ClusterInfo> {
        self.record("create_blockchains");
        let mut st = self.state.lock().unwrap();
        let mut info = st.info.clone().ok_or_else(not_bootstrapped)?;
        for spec in specs.iter() {
            let vm_id = subnet::vm_name_to_id(&spec.vm_name)?;
            let chain_id = test_id(200 + info.custom_chains.len() as u8).to_string();
            info.custom_chains.insert(
                chain_id.clone(),
                CustomChainInfo {
                    chain_name: spec.vm_name.clone(),
                    vm_id: vm_id.to_string(),
                    subnet_id: spec.subnet_id.clone().unwrap_or_default(),
                    chain_id,
                },
            );
        }
        st.created.extend(specs);
        st.info = Some(info.clone());
        Ok(info)
    }
}
