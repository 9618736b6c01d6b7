//! Local clusters: AvalancheGo networks run by the network-runner under
//! "<base>/local/<cluster>", either standalone or joined to a public network.
use std::{
    collections::BTreeMap,
    fs,
    io::{self, Error, ErrorKind, Write},
    path::Path,
    time::Duration,
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

use crate::{
    app::{self, Avalanche},
    config::Config,
    constants,
    jsonrpc::{self, NodeClient},
    models::{ClusterConfig, Network, NetworkData, NetworkKind},
    netrunner::{
        self, server::Server, AddNodeRequest, ClusterInfo, LoadSnapshotRequest, NetworkRunner,
        NodeInfo, RestartNodeRequest, StartRequest,
    },
    subnet,
};

/// Parameters of "node local start".
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub num_nodes: u32,
    pub network: Network,
    /// Overrides the configured AvalancheGo binary.
    pub avalanchego_path: String,
    /// Release installed under "<base>/bin/avalanchego/avalanchego-<version>".
    pub avalanchego_version: String,
    /// Extra node flags, merged under the local defaults.
    pub node_config: serde_json::Map<String, serde_json::Value>,
    pub genesis_path: String,
    pub upgrade_path: String,
    pub bootstrap_ids: Vec<String>,
    pub bootstrap_ips: Vec<String>,
    pub staking_tls_key_path: String,
    pub staking_tls_cert_path: String,
    pub staking_signer_key_path: String,
    /// Root data dir of the running local network, cloned when joining it.
    pub local_network_dir: String,
}

/// Written into the cluster root once the network is up.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct LocalState {
    pub cluster_name: String,
    pub network: Network,
    #[serde(default)]
    pub node_names: Vec<String>,
}

impl LocalState {
    pub fn load(file_path: &str) -> io::Result<Self> {
        let d = fs::read(file_path)?;
        serde_json::from_slice(&d).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("invalid local state {} ({})", file_path, e),
            )
        })
    }

    pub fn sync(&self, file_path: &str) -> io::Result<()> {
        let d = app::encode_json_indented(self)?;
        app::write_file_atomic(file_path, &d)
    }
}

/// "network.json" exported by a running local network.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocalNetworkMeta {
    #[serde(default)]
    pub genesis: String,
    #[serde(default)]
    pub upgrade: String,
    /// Node ID to "ip:port" of the bootstrappers.
    #[serde(default)]
    pub beacon_config: BTreeMap<String, String>,
}

impl LocalNetworkMeta {
    pub fn load(network_dir: &str) -> io::Result<Self> {
        let p = Path::new(network_dir).join(constants::LOCAL_NETWORK_FILE_NAME);
        if !p.exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("local network file {} does not exist", p.display()),
            ));
        }
        let d = fs::read(&p)?;
        serde_json::from_slice(&d).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("invalid local network file {} ({})", p.display(), e),
            )
        })
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct NodeStatus {
    pub name: String,
    pub uri: String,
    pub node_id: String,
    pub primary_bootstrapped: bool,
    /// Set when the status was asked for a blockchain deployed on the cluster.
    pub blockchain_status: Option<String>,
}

#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct ClusterStatus {
    pub name: String,
    pub root_dir: String,
    pub network_name: String,
    pub running: bool,
    pub healthy: bool,
    pub nodes: Vec<NodeStatus>,
}

#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct LocalClusterEntry {
    pub name: String,
    pub root_dir: String,
    pub running: bool,
}

pub fn pre_local_checks(opts: &StartOptions) -> io::Result<()> {
    if opts.bootstrap_ids.len() != opts.bootstrap_ips.len() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "number of bootstrap IDs and bootstrap IP:port pairs must be equal",
        ));
    }
    if !opts.genesis_path.is_empty() && !Path::new(&opts.genesis_path).exists() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("genesis file {} does not exist", opts.genesis_path),
        ));
    }
    if !opts.upgrade_path.is_empty() && !Path::new(&opts.upgrade_path).exists() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("upgrade file {} does not exist", opts.upgrade_path),
        ));
    }
    if !opts.avalanchego_path.is_empty() && !opts.avalanchego_version.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "an AvalancheGo binary path and an AvalancheGo version are mutually exclusive",
        ));
    }
    let staking = [
        &opts.staking_tls_key_path,
        &opts.staking_tls_cert_path,
        &opts.staking_signer_key_path,
    ];
    let given = staking.iter().filter(|p| !p.is_empty()).count();
    if given != 0 && given != staking.len() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "staking TLS key, TLS cert and signer key must be given together",
        ));
    }
    Ok(())
}

/// Node flags every local cluster node runs with.
pub fn local_node_config(
    user: &serde_json::Map<String, serde_json::Value>,
) -> io::Result<String> {
    let mut m = user.clone();
    m.insert(
        String::from("network-allow-private-ips"),
        serde_json::Value::Bool(true),
    );
    m.insert(String::from("index-enabled"), serde_json::Value::Bool(false));
    m.insert(
        String::from("index-allow-incomplete"),
        serde_json::Value::Bool(true),
    );
    serde_json::to_string(&serde_json::Value::Object(m)).map_err(|e| {
        Error::new(
            ErrorKind::Other,
            format!("failed to serialize node config {}", e),
        )
    })
}

/// Adds the subnet to a comma-separated list, keeping it unique.
fn append_subnet(list: &str, subnet_id: &str) -> String {
    let mut subnets: Vec<&str> = list.split(',').filter(|s| !s.is_empty()).collect();
    if !subnets.contains(&subnet_id) {
        subnets.push(subnet_id);
    }
    subnets.join(",")
}

fn create_private_dir(p: &Path) -> io::Result<()> {
    fs::create_dir_all(p)?;

    #[cfg(unix)]
    fs::set_permissions(p, fs::Permissions::from_mode(0o700))?;

    Ok(())
}

fn write_temp_file(contents: &str) -> io::Result<tempfile::NamedTempFile> {
    let mut f = tempfile::Builder::new().suffix(".json").tempfile()?;
    f.write_all(contents.as_bytes())?;
    f.flush()?;
    Ok(f)
}

fn state_file_path(app: &Avalanche, cluster_name: &str) -> String {
    Path::new(&app.get_local_cluster_dir(cluster_name))
        .join(constants::LOCAL_STATE_FILE_NAME)
        .display()
        .to_string()
}

/// Returns the config of a stopped local cluster that "start" resumes
/// from its root dir, None if "start" would create the cluster.
pub fn resumable_cluster(
    app: &Avalanche,
    cluster_name: &str,
) -> io::Result<Option<ClusterConfig>> {
    if !app.cluster_exists(cluster_name)? {
        return Ok(None);
    }
    let cc = app.get_cluster_config(cluster_name)?;
    if cc.local && Path::new(&state_file_path(app, cluster_name)).exists() {
        Ok(Some(cc))
    } else {
        Ok(None)
    }
}

/// Drives local clusters through the network-runner server dedicated to them.
pub struct LocalCluster<'a, R: NetworkRunner, N: NodeClient> {
    app: &'a Avalanche,
    runner: &'a R,
    node_client: &'a N,
    /// Started before a network starts, killed once it stops.
    server: Option<&'a Server>,
    avalanchego_path: String,
    subnet_evm_path: String,
    health_check_interval: Duration,
    health_check_timeout: Duration,
    poll_interval: Duration,
    settle_wait: Duration,
}

impl<'a, R: NetworkRunner, N: NodeClient> LocalCluster<'a, R, N> {
    pub fn new(app: &'a Avalanche, runner: &'a R, node_client: &'a N, cfg: &Config) -> Self {
        Self {
            app,
            runner,
            node_client,
            server: None,
            avalanchego_path: cfg.avalanchego_path.clone(),
            subnet_evm_path: cfg.subnet_evm_path.clone(),
            health_check_interval: cfg.health_check_interval(),
            health_check_timeout: cfg.health_check_timeout(),
            poll_interval: constants::BOOTSTRAP_POLL_INTERVAL,
            settle_wait: constants::UPSIZE_SETTLE_WAIT,
        }
    }

    pub fn with_server(mut self, server: &'a Server) -> Self {
        self.server = Some(server);
        self
    }

    /// Overrides the bootstrap/RPC poll interval and the wait after adding a node.
    pub fn with_intervals(mut self, poll_interval: Duration, settle_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.settle_wait = settle_wait;
        self
    }

    fn state_path(&self, cluster_name: &str) -> String {
        state_file_path(self.app, cluster_name)
    }

    fn plugin_dir(&self, cluster_name: &str) -> String {
        Path::new(&self.app.get_local_cluster_dir(cluster_name))
            .join("node1")
            .join("plugins")
            .display()
            .to_string()
    }

    fn local_cluster_config(&self, cluster_name: &str) -> io::Result<Option<ClusterConfig>> {
        match self.app.load_clusters_config()?.clusters.get(cluster_name) {
            Some(cc) if cc.local => Ok(Some(cc.clone())),
            _ => Ok(None),
        }
    }

    fn resolve_avalanchego_path(&self, opts: &StartOptions) -> io::Result<String> {
        let p = if !opts.avalanchego_path.is_empty() {
            opts.avalanchego_path.clone()
        } else if !opts.avalanchego_version.is_empty() {
            Path::new(&self.app.get_bin_dir())
                .join("avalanchego")
                .join(format!("avalanchego-{}", opts.avalanchego_version))
                .join("avalanchego")
                .display()
                .to_string()
        } else {
            self.avalanchego_path.clone()
        };
        if p.is_empty() || !Path::new(&p).exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("evaluated avalanchego path to be '{}' but it does not exist", p),
            ));
        }
        Ok(p)
    }

    /// Starts the cluster, resuming it from its root dir if it ran before.
    /// Returns None if the server already runs a network.
    pub async fn start(
        &self,
        cluster_name: &str,
        opts: &StartOptions,
    ) -> io::Result<Option<ClusterInfo>> {
        pre_local_checks(opts)?;

        let root_dir = self.app.get_local_cluster_dir(cluster_name);
        let mut existing = None;
        if self.app.cluster_exists(cluster_name)? {
            let cc = self.app.get_cluster_config(cluster_name)?;
            if !cc.local {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("cluster {} is not a local one", cluster_name),
                ));
            }
            existing = Some(cc);
        }
        let data_exists = Path::new(&self.state_path(cluster_name)).exists();
        if existing.is_some() != data_exists {
            log::warn!(
                "local cluster {} is inconsistent (config {}, data {}), removing it",
                cluster_name,
                existing.is_some(),
                data_exists
            );
            if let Err(e) = self.destroy(cluster_name).await {
                log::warn!("failed to remove local cluster {} ({})", cluster_name, e);
            }
            existing = None;
        }

        let avalanchego_path = self.resolve_avalanchego_path(opts)?;
        let plugin_dir = self.plugin_dir(cluster_name);
        create_private_dir(Path::new(&root_dir))?;
        create_private_dir(Path::new(&plugin_dir))?;

        if let Some(server) = self.server {
            server.start().await?;
        }
        if netrunner::status_if_running(self.runner).await?.is_some() {
            log::warn!("a local cluster is already executing, stop it with 'node local stop'");
            return Ok(None);
        }

        let node_config = local_node_config(&opts.node_config)?;
        let (mut cc, resumed) = match existing {
            Some(cc) => (cc, true),
            None => (
                ClusterConfig {
                    local: true,
                    network: opts.network.clone().with_cluster(cluster_name),
                    ..Default::default()
                },
                false,
            ),
        };

        let started = if resumed {
            log::info!("resuming local cluster {} from {}", cluster_name, root_dir);
            self.runner
                .load_snapshot(LoadSnapshotRequest {
                    snapshot_name: cluster_name.to_string(),
                    exec_path: avalanchego_path.clone(),
                    plugin_dir: plugin_dir.clone(),
                    root_data_dir: root_dir.clone(),
                    snapshot_path: root_dir.clone(),
                    global_node_config: node_config,
                    reassign_ports_if_used: true,
                    in_place: true,
                })
                .await
        } else {
            self.start_fresh(cluster_name, opts, &avalanchego_path, &plugin_dir, node_config)
                .await
        };
        let info = match started {
            Ok(info) => info,
            // the cluster data stays for the next attempt
            Err(e) if resumed => {
                return Err(Error::new(
                    e.kind(),
                    format!("failed to load snapshot: {}", e),
                ))
            }
            Err(e) => {
                if let Err(de) = self.destroy(cluster_name).await {
                    log::debug!("cleanup after failed start: {}", de);
                }
                return Err(Error::new(
                    e.kind(),
                    format!("failed to start local avalanchego: {}", e),
                ));
            }
        };

        cc.local = true;
        self.app.set_cluster_config(cluster_name, cc.clone())?;
        LocalState {
            cluster_name: cluster_name.to_string(),
            network: cc.network.clone(),
            node_names: info.node_names.clone(),
        }
        .sync(&self.state_path(cluster_name))?;

        log::info!("waiting for the P-chain to bootstrap on every node of {}", cluster_name);
        self.wait_bootstrapped("P", cc.network.bootstrap_timeout())
            .await?;
        let info = self.runner.status().await?;
        for node in info.nodes() {
            log::info!("{} URI {} NodeID {}", node.name, node.uri, node.id);
        }
        Ok(Some(info))
    }

    async fn start_fresh(
        &self,
        cluster_name: &str,
        opts: &StartOptions,
        avalanchego_path: &str,
        plugin_dir: &str,
        node_config: String,
    ) -> io::Result<ClusterInfo> {
        let root_dir = self.app.get_local_cluster_dir(cluster_name);
        let mut bootstrap_ids = opts.bootstrap_ids.clone();
        let mut bootstrap_ips = opts.bootstrap_ips.clone();
        let mut genesis_path = opts.genesis_path.clone();
        let mut upgrade_path = opts.upgrade_path.clone();

        // removed on drop, must outlive the start call
        let mut tmp_files = Vec::new();
        match opts.network.kind {
            NetworkKind::Fuji => log::warn!("Fuji bootstrapping can take several minutes"),
            NetworkKind::Mainnet => log::warn!("Mainnet bootstrapping can take 6-24 hours"),
            NetworkKind::Local => {
                if opts.local_network_dir.is_empty() {
                    return Err(Error::new(
                        ErrorKind::NotFound,
                        "local network is not running, start it with 'network start'",
                    ));
                }
                let meta = LocalNetworkMeta::load(&opts.local_network_dir)?;
                for (node_id, ip) in meta.beacon_config.iter() {
                    bootstrap_ids.push(node_id.clone());
                    bootstrap_ips.push(ip.clone());
                }
                if genesis_path.is_empty() && !meta.genesis.is_empty() {
                    let f = write_temp_file(&meta.genesis)?;
                    genesis_path = f.path().display().to_string();
                    tmp_files.push(f);
                }
                if upgrade_path.is_empty() && !meta.upgrade.is_empty() {
                    let f = write_temp_file(&meta.upgrade)?;
                    upgrade_path = f.path().display().to_string();
                    tmp_files.push(f);
                }
            }
            _ => {}
        }

        if !opts.staking_tls_key_path.is_empty() {
            let staking_dir = Path::new(&root_dir).join("node1").join("staking");
            create_private_dir(&staking_dir)?;
            for (src, name) in [
                (&opts.staking_tls_key_path, constants::STAKER_KEY_FILE_NAME),
                (&opts.staking_tls_cert_path, constants::STAKER_CERT_FILE_NAME),
                (&opts.staking_signer_key_path, constants::BLS_KEY_FILE_NAME),
            ] {
                log::info!("copying staking file {} to {}", src, name);
                fs::copy(src, staking_dir.join(name))?;
            }
        }

        log::info!(
            "starting {} node(s) of local cluster {} on {}",
            opts.num_nodes,
            cluster_name,
            opts.network.name()
        );
        let info = self
            .runner
            .start(StartRequest {
                exec_path: avalanchego_path.to_string(),
                num_nodes: opts.num_nodes,
                global_node_config: node_config,
                root_data_dir: root_dir,
                plugin_dir: plugin_dir.to_string(),
                reassign_ports_if_used: true,
                network_id: if opts.network.id == 0 {
                    None
                } else {
                    Some(opts.network.id)
                },
                genesis_path,
                upgrade_path,
                bootstrap_node_ids: bootstrap_ids,
                bootstrap_node_ips: bootstrap_ips,
                fresh_staking_ids: true,
                zero_ip_if_public_http_host: false,
                ..Default::default()
            })
            .await?;
        drop(tmp_files);
        Ok(info)
    }

    /// Stops the running network, if any, and the server.
    pub async fn stop(&self) -> io::Result<()> {
        match netrunner::status_if_running(self.runner).await {
            Ok(Some(info)) => {
                self.sync_state(&info)?;
                log::info!("stopping network at {}", info.root_data_dir);
                self.runner.stop().await?;
            }
            Ok(None) => log::info!("no local cluster is running"),
            Err(e) => log::warn!("network-runner not reachable ({}), nothing to stop", e),
        }
        if let Some(server) = self.server {
            server.stop()?;
        }
        Ok(())
    }

    /// Refreshes the node list of the cluster owning the running network.
    fn sync_state(&self, info: &ClusterInfo) -> io::Result<()> {
        for (name, root_dir) in self.list_local_clusters(None)? {
            if root_dir != info.root_data_dir {
                continue;
            }
            let p = self.state_path(&name);
            if !Path::new(&p).exists() {
                continue;
            }
            let mut st = LocalState::load(&p)?;
            st.node_names = info.node_names.clone();
            st.sync(&p)?;
        }
        Ok(())
    }

    pub async fn destroy(&self, cluster_name: &str) -> io::Result<()> {
        if let Err(e) = self.stop().await {
            log::warn!("failed to stop local cluster {} ({})", cluster_name, e);
        }
        let root_dir = self.app.get_local_cluster_dir(cluster_name);
        if Path::new(&root_dir).exists() {
            log::info!("removing local cluster dir {}", root_dir);
            fs::remove_dir_all(&root_dir)?;
        }
        if self.local_cluster_config(cluster_name)?.is_none() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("local cluster {} not found", cluster_name),
            ));
        }
        self.app.remove_cluster_config(cluster_name)
    }

    /// Makes every node of the cluster track the blockchain.
    /// Returns the RPC endpoints recorded in the sidecar.
    pub async fn track(
        &self,
        cluster_name: &str,
        blockchain_name: &str,
    ) -> io::Result<Vec<String>> {
        let mut cc = self.local_cluster_config(cluster_name)?.ok_or_else(|| {
            Error::new(
                ErrorKind::NotFound,
                format!("local node {} is not found", cluster_name),
            )
        })?;
        let mut sc = self.app.load_sidecar(blockchain_name)?;

        // deployed on the network the cluster runs, not on the cluster itself
        let base_network = Network {
            cluster_name: String::new(),
            ..cc.network.clone()
        };
        let data = match sc.networks.get(&base_network.name()) {
            Some(d) if sc.is_deployed_to(&base_network.name()) => d.clone(),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!(
                        "blockchain {} has not been deployed to {}",
                        blockchain_name,
                        base_network.name()
                    ),
                ))
            }
        };

        let vm_bin = subnet::vm_binary_path(&sc, &self.subnet_evm_path)?;
        subnet::install_plugin(&sc.vm_id()?, &vm_bin, &self.plugin_dir(cluster_name))?;

        let subnet_id = data.subnet_id.to_string();
        let blockchain_id = data.blockchain_id.to_string();
        let info = self.runner.status().await?;
        let mut rpc_endpoints = Vec::new();
        let mut node_uris = Vec::new();
        for node in info.nodes() {
            self.track_node(cluster_name, blockchain_name, node, &subnet_id, &blockchain_id)
                .await?;
            rpc_endpoints.push(subnet::rpc_endpoint(&node.uri, &blockchain_id));
            node_uris.push(node.uri.clone());
        }

        self.wait_bootstrapped(&blockchain_id, cc.network.bootstrap_timeout())
            .await?;
        for ep in rpc_endpoints.iter() {
            self.wait_for_rpc(ep).await?;
        }

        let entry = sc.networks.entry(cc.network.name()).or_default();
        if entry.blockchain_id != data.blockchain_id {
            *entry = NetworkData {
                subnet_id: data.subnet_id.clone(),
                blockchain_id: data.blockchain_id.clone(),
                ..Default::default()
            };
        }
        for uri in node_uris.iter() {
            subnet::add_node_endpoints(entry, uri);
        }
        self.app.update_sidecar(&mut sc)?;

        cc.add_subnet(blockchain_name);
        self.app.set_cluster_config(cluster_name, cc)?;
        Ok(rpc_endpoints)
    }

    /// Copies the chain config into the node dir and restarts the node
    /// with the subnet whitelisted.
    async fn track_node(
        &self,
        cluster_name: &str,
        blockchain_name: &str,
        node: &NodeInfo,
        subnet_id: &str,
        blockchain_id: &str,
    ) -> io::Result<()> {
        let root_dir = self.app.get_local_cluster_dir(cluster_name);
        if self.app.chain_config_exists(blockchain_name) {
            let chain_dir = Path::new(&root_dir)
                .join(&node.name)
                .join("configs")
                .join("chains")
                .join(blockchain_id);
            create_private_dir(&chain_dir)?;
            fs::copy(
                self.app.get_chain_config_path(blockchain_name),
                chain_dir.join("config.json"),
            )?;
        }

        let exec_path = if node.exec_path.is_empty() {
            self.avalanchego_path.clone()
        } else {
            node.exec_path.clone()
        };
        log::info!("restarting {} to track subnet {}", node.name, subnet_id);
        self.runner
            .restart_node(RestartNodeRequest {
                name: node.name.clone(),
                exec_path,
                whitelisted_subnets: append_subnet(&node.whitelisted_subnets, subnet_id),
                root_data_dir: root_dir,
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    async fn wait_for_rpc(&self, rpc_url: &str) -> io::Result<()> {
        let deadline = Instant::now() + constants::RPC_TIMEOUT;
        loop {
            match self.node_client.eth_chain_id(rpc_url).await {
                Ok(chain_id) => {
                    log::debug!("{} answers chain ID {}", rpc_url, chain_id);
                    return Ok(());
                }
                Err(e) => log::debug!("{} not ready ({})", rpc_url, e),
            }
            if Instant::now() > deadline {
                return Err(Error::new(
                    ErrorKind::TimedOut,
                    format!(
                        "RPC endpoint {} not ready after {:?}",
                        rpc_url,
                        constants::RPC_TIMEOUT
                    ),
                ));
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Adds nodes to a running cluster and makes them track
    /// every blockchain the cluster tracks.
    pub async fn upsize(&self, cluster_name: &str, num_nodes: u32) -> io::Result<Vec<NodeInfo>> {
        let cc = self.local_cluster_config(cluster_name)?.ok_or_else(|| {
            Error::new(
                ErrorKind::NotFound,
                format!("local cluster {} not found", cluster_name),
            )
        })?;
        let root_dir = self.app.get_local_cluster_dir(cluster_name);
        let mut info = match netrunner::status_if_running(self.runner).await? {
            Some(info) if info.root_data_dir == root_dir => info,
            _ => {
                return Err(Error::new(
                    ErrorKind::Other,
                    format!("local cluster {} is not running", cluster_name),
                ))
            }
        };

        let node_config = local_node_config(&serde_json::Map::new())?;
        let exec_path = info
            .node_infos
            .values()
            .map(|n| n.exec_path.clone())
            .find(|p| !p.is_empty())
            .unwrap_or_else(|| self.avalanchego_path.clone());
        let timeout = cc.network.bootstrap_timeout();

        let mut added = Vec::new();
        for _ in 0..num_nodes {
            let name = info.next_node_name();
            log::info!("adding {} to local cluster {}", name, cluster_name);
            info = self
                .runner
                .add_node(AddNodeRequest {
                    name: name.clone(),
                    exec_path: exec_path.clone(),
                    node_config: node_config.clone(),
                    plugin_dir: self.plugin_dir(cluster_name),
                })
                .await?;
            self.wait_bootstrapped("P", timeout).await?;
            netrunner::wait_for_healthy(
                self.runner,
                self.health_check_interval,
                self.health_check_timeout,
            )
            .await?;
            sleep(self.settle_wait).await;

            let node = info.node_infos.get(&name).cloned().ok_or_else(|| {
                Error::new(
                    ErrorKind::Other,
                    format!("node {} missing after being added", name),
                )
            })?;
            for blockchain_name in cc.subnets.iter() {
                let mut sc = self.app.load_sidecar(blockchain_name)?;
                let data = match sc.networks.get_mut(&cc.network.name()) {
                    Some(d) => d,
                    None => {
                        log::warn!(
                            "blockchain {} has no entry for {}, skipping",
                            blockchain_name,
                            cc.network.name()
                        );
                        continue;
                    }
                };
                let subnet_id = data.subnet_id.to_string();
                let blockchain_id = data.blockchain_id.to_string();
                self.track_node(cluster_name, blockchain_name, &node, &subnet_id, &blockchain_id)
                    .await?;
                subnet::add_node_endpoints(data, &node.uri);
                self.app.update_sidecar(&mut sc)?;

                self.wait_bootstrapped(&blockchain_id, timeout).await?;
            }
            info = netrunner::wait_for_healthy(
                self.runner,
                self.health_check_interval,
                self.health_check_timeout,
            )
            .await?;
            log::info!("{} URI {} NodeID {}", node.name, node.uri, node.id);
            added.push(node);
        }
        self.sync_state(&info)?;
        Ok(added)
    }

    /// Local cluster names to root dirs, optionally limited to one cluster.
    fn list_local_clusters(&self, filter: Option<&str>) -> io::Result<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        for (name, cc) in self.app.load_clusters_config()?.clusters {
            if !cc.local {
                continue;
            }
            if let Some(f) = filter {
                if f != name {
                    continue;
                }
            }
            let root_dir = self.app.get_local_cluster_dir(&name);
            out.insert(name, root_dir);
        }
        Ok(out)
    }

    async fn running_network(&self) -> Option<ClusterInfo> {
        match netrunner::status_if_running(self.runner).await {
            Ok(info) => info,
            Err(e) => {
                log::debug!("network-runner not reachable ({})", e);
                None
            }
        }
    }

    pub async fn list(&self) -> io::Result<Vec<LocalClusterEntry>> {
        let running = self.running_network().await;
        Ok(self
            .list_local_clusters(None)?
            .into_iter()
            .map(|(name, root_dir)| LocalClusterEntry {
                running: running
                    .as_ref()
                    .map(|info| info.root_data_dir == root_dir)
                    .unwrap_or(false),
                name,
                root_dir,
            })
            .collect())
    }

    /// Name of the running local cluster, if it runs on the local network.
    pub async fn connected_to_local_network(&self) -> io::Result<Option<String>> {
        let info = match self.running_network().await {
            Some(info) => info,
            None => return Ok(None),
        };
        for (name, root_dir) in self.list_local_clusters(None)? {
            if root_dir != info.root_data_dir {
                continue;
            }
            let cc = self.app.get_cluster_config(&name)?;
            if cc.network.kind == NetworkKind::Local {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    pub async fn status(
        &self,
        cluster_name: Option<&str>,
        blockchain_name: Option<&str>,
    ) -> io::Result<Vec<ClusterStatus>> {
        let clusters = self.list_local_clusters(cluster_name)?;
        if let Some(name) = cluster_name {
            if clusters.is_empty() {
                return Err(Error::new(
                    ErrorKind::NotFound,
                    format!("local cluster {} not found", name),
                ));
            }
        }
        let sc = match blockchain_name {
            Some(name) => Some(self.app.load_sidecar(name)?),
            None => None,
        };
        let running = self.running_network().await;

        let mut out = Vec::new();
        for (name, root_dir) in clusters {
            let cc = self.app.get_cluster_config(&name)?;
            let mut st = ClusterStatus {
                name,
                root_dir,
                network_name: cc.network.name(),
                ..Default::default()
            };
            let info = match &running {
                Some(info) if info.root_data_dir == st.root_dir => info,
                _ => {
                    out.push(st);
                    continue;
                }
            };
            st.running = true;
            st.healthy = info.healthy;

            let blockchain_id = sc
                .as_ref()
                .and_then(|sc| sc.network_data(&st.network_name))
                .map(|d| d.blockchain_id.to_string());
            for node in info.nodes() {
                let primary_bootstrapped =
                    match self.node_client.is_bootstrapped(&node.uri, "P").await {
                        Ok(b) => b,
                        Err(e) => {
                            log::warn!("failed to query {} bootstrap status ({})", node.name, e);
                            false
                        }
                    };
                let blockchain_status = match &blockchain_id {
                    Some(bid) => Some(self.get_blockchain_status(&node.uri, bid).await),
                    None => None,
                };
                st.nodes.push(NodeStatus {
                    name: node.name.clone(),
                    uri: node.uri.clone(),
                    node_id: node.id.clone(),
                    primary_bootstrapped,
                    blockchain_status,
                });
            }
            out.push(st);
        }
        Ok(out)
    }

    async fn get_blockchain_status(&self, uri: &str, blockchain_id: &str) -> String {
        match self.node_client.get_blockchain_status(uri, blockchain_id).await {
            Ok(s) if s.is_empty() => String::from("Not Syncing"),
            Ok(s) => s,
            Err(e) => {
                log::warn!("failed to query blockchain status on {} ({})", uri, e);
                String::from("Unknown")
            }
        }
    }

    /// Polls every node until the chain is bootstrapped.
    pub async fn wait_bootstrapped(&self, chain: &str, timeout: Duration) -> io::Result<()> {
        let info = self.runner.status().await?;
        let deadline = Instant::now() + timeout;
        for node in info.nodes() {
            loop {
                match self.node_client.is_bootstrapped(&node.uri, chain).await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) if e.to_string().contains(jsonrpc::NO_CHAIN_ERROR) => {}
                    Err(e) => return Err(e),
                }
                if Instant::now() > deadline {
                    return Err(Error::new(
                        ErrorKind::TimedOut,
                        format!(
                            "{} not bootstrapped on chain {} after {:?}",
                            node.name, chain, timeout
                        ),
                    ));
                }
                sleep(self.poll_interval).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        str::FromStr,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use avalanche_types::ids;

    use super::*;
    use crate::{
        models::{Sidecar, VmType},
        netrunner::fake::{test_id, FakeRunner},
    };

    #[derive(Debug, Default)]
    struct FakeNodeClient {
        /// Number of blockchain polls answered with "no chain".
        no_chain_polls: AtomicUsize,
        blockchain_status: String,
        rpc_calls: Mutex<Vec<String>>,
    }

    impl NodeClient for FakeNodeClient {
        async fn is_bootstrapped(&self, _uri: &str, chain: &str) -> io::Result<bool> {
            if chain != "P" && self.no_chain_polls.load(Ordering::SeqCst) > 0 {
                self.no_chain_polls.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::new(
                    ErrorKind::Other,
                    format!("{} of '{}'", jsonrpc::NO_CHAIN_ERROR, chain),
                ));
            }
            Ok(true)
        }
        async fn get_blockchain_status(&self, _uri: &str, _blockchain_id: &str) -> io::Result<String> {
            Ok(self.blockchain_status.clone())
        }
        async fn eth_chain_id(&self, rpc_url: &str) -> io::Result<String> {
            self.rpc_calls.lock().unwrap().push(rpc_url.to_string());
            Ok(String::from("0xa868"))
        }
    }

    struct Env {
        _tmp: tempfile::TempDir,
        app: Avalanche,
        cfg: Config,
        dir: String,
    }

    fn setup() -> Env {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Info)
            .is_test(true)
            .try_init();

        let tmp_dir = tempfile::tempdir().unwrap();
        let dir = tmp_dir.path().display().to_string();
        let app = Avalanche::new(&format!("{}/base", dir));
        app.setup().unwrap();

        let avalanchego = format!("{}/avalanchego", dir);
        fs::write(&avalanchego, b"bin").unwrap();
        let subnet_evm = format!("{}/subnet-evm", dir);
        fs::write(&subnet_evm, b"vm").unwrap();

        let cfg = Config {
            avalanchego_path: avalanchego,
            subnet_evm_path: subnet_evm,
            health_check_interval_ms: 1,
            health_check_timeout_seconds: 5,
            ..Default::default()
        };
        Env {
            _tmp: tmp_dir,
            app,
            cfg,
            dir,
        }
    }

    fn fuji_opts(num_nodes: u32) -> StartOptions {
        StartOptions {
            num_nodes,
            network: Network::fuji(),
            ..Default::default()
        }
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_start_stop_resume --exact --show-output
    #[tokio::test]
    async fn test_start_stop_resume() {
        let env = setup();
        let runner = FakeRunner::new(0);
        let client = FakeNodeClient::default();
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg)
            .with_intervals(Duration::from_millis(1), Duration::ZERO);

        let info = lc.start("c1", &fuji_opts(3)).await.unwrap().unwrap();
        assert_eq!(info.node_infos.len(), 3);

        let root_dir = env.app.get_local_cluster_dir("c1");
        {
            let st = runner.state.lock().unwrap();
            let req = st.started.as_ref().unwrap();
            assert_eq!(req.num_nodes, 3);
            assert_eq!(req.root_data_dir, root_dir);
            assert_eq!(req.network_id, Some(constants::FUJI_NETWORK_ID));
            assert!(req.fresh_staking_ids);
            let node_config: serde_json::Value =
                serde_json::from_str(&req.global_node_config).unwrap();
            assert_eq!(node_config["network-allow-private-ips"], true);
            assert_eq!(node_config["index-enabled"], false);
        }
        assert!(Path::new(&root_dir).join("node1").join("plugins").exists());

        let cc = env.app.get_cluster_config("c1").unwrap();
        assert!(cc.local);
        assert_eq!(cc.network.kind, NetworkKind::Fuji);
        assert_eq!(cc.network.name(), "Cluster c1");
        let st = LocalState::load(&lc.state_path("c1")).unwrap();
        assert_eq!(st.node_names, vec!["node1", "node2", "node3"]);

        // a second start leaves the running network alone
        assert!(lc.start("c1", &fuji_opts(3)).await.unwrap().is_none());

        lc.stop().await.unwrap();
        assert!(runner.state.lock().unwrap().info.is_none());
        assert!(Path::new(&lc.state_path("c1")).exists());

        lc.start("c1", &fuji_opts(3)).await.unwrap().unwrap();
        let st = runner.state.lock().unwrap();
        let loaded = st.loaded.as_ref().unwrap();
        assert_eq!(loaded.snapshot_name, "c1");
        assert_eq!(loaded.snapshot_path, root_dir);
        assert!(loaded.in_place);
        assert!(loaded.reassign_ports_if_used);
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_start_consistency --exact --show-output
    #[tokio::test]
    async fn test_start_consistency() {
        let env = setup();
        let runner = FakeRunner::new(0);
        let client = FakeNodeClient::default();
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg)
            .with_intervals(Duration::from_millis(1), Duration::ZERO);

        env.app
            .set_cluster_config(
                "remote",
                ClusterConfig {
                    network: Network::fuji(),
                    ..Default::default()
                },
            )
            .unwrap();
        let err = lc.start("remote", &fuji_opts(1)).await.unwrap_err();
        assert_eq!(err.to_string(), "cluster remote is not a local one");

        // config without data is dropped and the cluster starts fresh
        env.app
            .set_cluster_config(
                "stale",
                ClusterConfig {
                    local: true,
                    network: Network::fuji().with_cluster("stale"),
                    ..Default::default()
                },
            )
            .unwrap();
        lc.start("stale", &fuji_opts(1)).await.unwrap().unwrap();
        let st = runner.state.lock().unwrap();
        assert!(st.started.is_some());
        assert!(st.loaded.is_none());
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_start_failure_destroys --exact --show-output
    #[tokio::test]
    async fn test_start_failure_destroys() {
        let env = setup();
        let runner = FakeRunner::new(0);
        runner.state.lock().unwrap().fail_start = true;
        let client = FakeNodeClient::default();
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg);

        let err = lc.start("c1", &fuji_opts(1)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to start local avalanchego: bogus start failure"
        );
        assert!(!Path::new(&env.app.get_local_cluster_dir("c1")).exists());
        assert!(!env.app.cluster_exists("c1").unwrap());

        let mut opts = fuji_opts(1);
        opts.avalanchego_version = String::from("v1.11.0");
        let err = lc.start("c1", &opts).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_resume_failure_keeps_cluster --exact --show-output
    #[tokio::test]
    async fn test_resume_failure_keeps_cluster() {
        let env = setup();
        let runner = FakeRunner::new(0);
        let client = FakeNodeClient::default();
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg)
            .with_intervals(Duration::from_millis(1), Duration::ZERO);

        lc.start("c1", &fuji_opts(2)).await.unwrap().unwrap();
        lc.stop().await.unwrap();

        runner.state.lock().unwrap().fail_load = true;
        let err = lc.start("c1", &fuji_opts(2)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to load snapshot: bogus load failure"
        );
        assert!(env.app.cluster_exists("c1").unwrap());
        assert!(Path::new(&lc.state_path("c1")).exists());
        assert!(Path::new(&lc.plugin_dir("c1")).exists());

        runner.state.lock().unwrap().fail_load = false;
        lc.start("c1", &fuji_opts(2)).await.unwrap().unwrap();
        assert_eq!(runner.state.lock().unwrap().loaded.as_ref().unwrap().snapshot_name, "c1");
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_start_clones_local_network --exact --show-output
    #[tokio::test]
    async fn test_start_clones_local_network() {
        let env = setup();
        let network_dir = format!("{}/network", env.dir);
        fs::create_dir_all(&network_dir).unwrap();
        fs::write(
            Path::new(&network_dir).join(constants::LOCAL_NETWORK_FILE_NAME),
            r#"{"genesis":"{\"networkID\":1337}","upgrade":"","beaconConfig":{"NodeID-A":"127.0.0.1:9651"}}"#,
        )
        .unwrap();
        for name in ["key", "crt", "signer"] {
            fs::write(format!("{}/{}", env.dir, name), name.as_bytes()).unwrap();
        }

        let runner = FakeRunner::new(0);
        let client = FakeNodeClient::default();
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg)
            .with_intervals(Duration::from_millis(1), Duration::ZERO);

        let opts = StartOptions {
            num_nodes: 1,
            network: Network::local(),
            local_network_dir: network_dir,
            staking_tls_key_path: format!("{}/key", env.dir),
            staking_tls_cert_path: format!("{}/crt", env.dir),
            staking_signer_key_path: format!("{}/signer", env.dir),
            ..Default::default()
        };
        lc.start("c1", &opts).await.unwrap().unwrap();

        let st = runner.state.lock().unwrap();
        let req = st.started.as_ref().unwrap();
        assert_eq!(req.bootstrap_node_ids, vec!["NodeID-A"]);
        assert_eq!(req.bootstrap_node_ips, vec!["127.0.0.1:9651"]);
        assert!(!req.genesis_path.is_empty());
        assert!(req.upgrade_path.is_empty());

        let staking_dir = Path::new(&env.app.get_local_cluster_dir("c1"))
            .join("node1")
            .join("staking");
        assert_eq!(
            fs::read(staking_dir.join(constants::STAKER_CERT_FILE_NAME)).unwrap(),
            b"crt"
        );
        assert!(staking_dir.join(constants::BLS_KEY_FILE_NAME).exists());
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_pre_local_checks --exact --show-output
    #[test]
    fn test_pre_local_checks() {
        assert!(pre_local_checks(&StartOptions::default()).is_ok());

        let opts = StartOptions {
            bootstrap_ids: vec![String::from("NodeID-A")],
            ..Default::default()
        };
        assert_eq!(
            pre_local_checks(&opts).unwrap_err().to_string(),
            "number of bootstrap IDs and bootstrap IP:port pairs must be equal"
        );

        let opts = StartOptions {
            genesis_path: String::from("/no/such/genesis.json"),
            ..Default::default()
        };
        assert_eq!(
            pre_local_checks(&opts).unwrap_err().to_string(),
            "genesis file /no/such/genesis.json does not exist"
        );

        let opts = StartOptions {
            upgrade_path: String::from("/no/such/upgrade.json"),
            ..Default::default()
        };
        assert_eq!(
            pre_local_checks(&opts).unwrap_err().kind(),
            ErrorKind::NotFound
        );

        let opts = StartOptions {
            avalanchego_path: String::from("/opt/avalanchego"),
            avalanchego_version: String::from("v1.11.0"),
            ..Default::default()
        };
        assert_eq!(
            pre_local_checks(&opts).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );

        let opts = StartOptions {
            staking_tls_key_path: String::from("/tmp/staker.key"),
            ..Default::default()
        };
        assert!(pre_local_checks(&opts).is_err());

        assert_eq!(append_subnet("", "s1"), "s1");
        assert_eq!(append_subnet("s1", "s2"), "s1,s2");
        assert_eq!(append_subnet("s1,s2", "s1"), "s1,s2");
    }

    fn deployed_sidecar(app: &Avalanche) -> Sidecar {
        let mut sc = Sidecar::new("alpha", VmType::SubnetEvm);
        sc.networks.insert(
            Network::fuji().name(),
            NetworkData {
                subnet_id: test_id(1),
                blockchain_id: test_id(2),
                ..Default::default()
            },
        );
        app.create_sidecar(&mut sc).unwrap();
        sc
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_track_and_upsize --exact --show-output
    #[tokio::test]
    async fn test_track_and_upsize() {
        let env = setup();
        let runner = FakeRunner::new(0);
        let client = FakeNodeClient {
            no_chain_polls: AtomicUsize::new(2),
            ..Default::default()
        };
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg)
            .with_intervals(Duration::from_millis(1), Duration::ZERO);
        lc.start("c1", &fuji_opts(3)).await.unwrap().unwrap();

        let sc = deployed_sidecar(&env.app);
        fs::write(env.app.get_chain_config_path("alpha"), b"{\"log-level\":\"info\"}").unwrap();
        let blockchain_id = test_id(2).to_string();

        let endpoints = lc.track("c1", "alpha").await.unwrap();
        assert_eq!(endpoints.len(), 3);
        assert_eq!(
            endpoints[0],
            format!("http://127.0.0.1:9650/ext/bc/{}/rpc", blockchain_id)
        );
        assert_eq!(client.rpc_calls.lock().unwrap().len(), 3);

        let root_dir = env.app.get_local_cluster_dir("c1");
        let plugin = Path::new(&root_dir)
            .join("node1")
            .join("plugins")
            .join(sc.vm_id().unwrap().to_string());
        assert_eq!(fs::read(plugin).unwrap(), b"vm");
        assert!(Path::new(&root_dir)
            .join("node2")
            .join("configs")
            .join("chains")
            .join(&blockchain_id)
            .join("config.json")
            .exists());
        {
            let st = runner.state.lock().unwrap();
            assert_eq!(st.restarted.len(), 3);
            assert!(st
                .restarted
                .iter()
                .all(|r| r.whitelisted_subnets == test_id(1).to_string()));
        }

        let sc = env.app.load_sidecar("alpha").unwrap();
        let data = sc.network_data("Cluster c1").unwrap();
        assert_eq!(data.rpc_endpoints, endpoints);
        assert_eq!(data.blockchain_id, ids::Id::from_str(&blockchain_id).unwrap());
        assert_eq!(env.app.get_cluster_config("c1").unwrap().subnets, vec!["alpha"]);

        // tracking again keeps endpoints recorded elsewhere and adds no duplicates
        let mut sc = env.app.load_sidecar("alpha").unwrap();
        let other = format!("http://10.0.0.9:9650/ext/bc/{}/rpc", blockchain_id);
        sc.networks
            .get_mut("Cluster c1")
            .unwrap()
            .rpc_endpoints
            .push(other.clone());
        env.app.update_sidecar(&mut sc).unwrap();
        lc.track("c1", "alpha").await.unwrap();
        let sc = env.app.load_sidecar("alpha").unwrap();
        let data = sc.network_data("Cluster c1").unwrap();
        assert_eq!(data.rpc_endpoints.len(), 4);
        assert!(data.rpc_endpoints.contains(&other));
        assert_eq!(data.ws_endpoints.len(), 3);
        assert_eq!(env.app.get_cluster_config("c1").unwrap().subnets, vec!["alpha"]);
        assert_eq!(runner.state.lock().unwrap().restarted.len(), 6);

        // node4 was recorded by an earlier upsize that did not finish
        let mut sc = env.app.load_sidecar("alpha").unwrap();
        let node4_rpc = format!("http://127.0.0.1:9656/ext/bc/{}/rpc", blockchain_id);
        sc.networks
            .get_mut("Cluster c1")
            .unwrap()
            .rpc_endpoints
            .push(node4_rpc.clone());
        env.app.update_sidecar(&mut sc).unwrap();

        let added = lc.upsize("c1", 1).await.unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].name, "node4");
        assert_eq!(added[0].uri, "http://127.0.0.1:9656");
        assert_eq!(runner.state.lock().unwrap().restarted.len(), 7);
        let sc = env.app.load_sidecar("alpha").unwrap();
        let data = sc.network_data("Cluster c1").unwrap();
        assert_eq!(data.rpc_endpoints.len(), 5);
        assert_eq!(
            data.rpc_endpoints.iter().filter(|ep| **ep == node4_rpc).count(),
            1
        );
        assert_eq!(data.ws_endpoints.len(), 4);
        let st = LocalState::load(&lc.state_path("c1")).unwrap();
        assert_eq!(st.node_names.len(), 4);
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_track_errors --exact --show-output
    #[tokio::test]
    async fn test_track_errors() {
        let env = setup();
        let runner = FakeRunner::new(0);
        let client = FakeNodeClient::default();
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg)
            .with_intervals(Duration::from_millis(1), Duration::ZERO);

        let err = lc.track("nope", "alpha").await.unwrap_err();
        assert_eq!(err.to_string(), "local node nope is not found");

        lc.start("c1", &fuji_opts(1)).await.unwrap().unwrap();
        let mut sc = Sidecar::new("beta", VmType::SubnetEvm);
        env.app.create_sidecar(&mut sc).unwrap();
        let err = lc.track("c1", "beta").await.unwrap_err();
        assert_eq!(err.to_string(), "blockchain beta has not been deployed to Fuji");

        let err = lc.upsize("nope", 1).await.unwrap_err();
        assert_eq!(err.to_string(), "local cluster nope not found");
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_status_list_connected --exact --show-output
    #[tokio::test]
    async fn test_status_list_connected() {
        let env = setup();
        for (name, network) in [("c1", Network::local()), ("c2", Network::fuji())] {
            env.app
                .set_cluster_config(
                    name,
                    ClusterConfig {
                        local: true,
                        network: network.with_cluster(name),
                        ..Default::default()
                    },
                )
                .unwrap();
        }
        let mut sc = Sidecar::new("alpha", VmType::SubnetEvm);
        sc.networks.insert(
            String::from("Cluster c1"),
            NetworkData {
                subnet_id: test_id(1),
                blockchain_id: test_id(2),
                ..Default::default()
            },
        );
        env.app.create_sidecar(&mut sc).unwrap();

        let runner = FakeRunner::running(2, 0, &env.app.get_local_cluster_dir("c1"));
        let client = FakeNodeClient::default();
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg);

        let status = lc.status(None, Some("alpha")).await.unwrap();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].name, "c1");
        assert!(status[0].running);
        assert!(status[0].healthy);
        assert_eq!(status[0].nodes.len(), 2);
        assert!(status[0].nodes[0].primary_bootstrapped);
        assert_eq!(
            status[0].nodes[0].blockchain_status.as_deref(),
            Some("Not Syncing")
        );
        assert_eq!(status[1].name, "c2");
        assert!(!status[1].running);
        assert!(status[1].nodes.is_empty());

        assert!(lc.status(Some("c3"), None).await.is_err());

        let list = lc.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].running);
        assert!(!list[1].running);

        assert_eq!(
            lc.connected_to_local_network().await.unwrap().as_deref(),
            Some("c1")
        );
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_destroy --exact --show-output
    #[tokio::test]
    async fn test_destroy() {
        let env = setup();
        let runner = FakeRunner::new(0);
        let client = FakeNodeClient::default();
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg)
            .with_intervals(Duration::from_millis(1), Duration::ZERO);
        lc.start("c1", &fuji_opts(2)).await.unwrap().unwrap();

        lc.destroy("c1").await.unwrap();
        assert!(!Path::new(&env.app.get_local_cluster_dir("c1")).exists());
        assert!(!env.app.cluster_exists("c1").unwrap());
        assert!(runner.state.lock().unwrap().info.is_none());

        let err = lc.destroy("c1").await.unwrap_err();
        assert_eq!(err.to_string(), "local cluster c1 not found");
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::local::tests::test_wait_bootstrapped_errors --exact --show-output
    #[tokio::test]
    async fn test_wait_bootstrapped_errors() {
        struct Broken;
        impl NodeClient for Broken {
            async fn is_bootstrapped(&self, _uri: &str, _chain: &str) -> io::Result<bool> {
                Err(Error::new(ErrorKind::Other, "connection refused"))
            }
            async fn get_blockchain_status(&self, _uri: &str, _id: &str) -> io::Result<String> {
                Ok(String::new())
            }
            async fn eth_chain_id(&self, _rpc_url: &str) -> io::Result<String> {
                Ok(String::new())
            }
        }

        let env = setup();
        let runner = FakeRunner::running(2, 0, &env.app.get_local_cluster_dir("c1"));
        let lc = LocalCluster::new(&env.app, &runner, &Broken, &env.cfg);
        let err = lc
            .wait_bootstrapped("P", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection refused");

        let client = FakeNodeClient {
            no_chain_polls: AtomicUsize::new(usize::MAX),
            ..Default::default()
        };
        let lc = LocalCluster::new(&env.app, &runner, &client, &env.cfg)
            .with_intervals(Duration::from_millis(5), Duration::ZERO);
        let err = lc
            .wait_bootstrapped("C", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }
}
