//! Makes every node of a cloud cluster track a blockchain.
use std::{
    future::Future,
    io::{self, Error, ErrorKind},
    pin::Pin,
    sync::Arc,
    time::Duration,
};

use avalanche_types::ids;
use serde_json::json;

use crate::{
    app::Avalanche,
    config::Config,
    constants, inventory,
    jsonrpc::{self, GetNodeVersionResult, HealthResult, IsBootstrappedResult},
    models::{ClusterConfig, Host, Network, NetworkData, NodeResults, Sidecar},
    node::remote,
    subnet,
};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Skips the bootstrap, health and RPC compatibility checks.
    pub avoid_checks: bool,
    pub subnet_aliases: Vec<String>,
}

/// Runs "f" on every host in its own task and collects the outcomes.
/// A failing host does not stop the others.
pub async fn fan_out<F, Fut>(hosts: &[Host], f: F) -> NodeResults
where
    F: Fn(Host) -> Fut,
    Fut: Future<Output = io::Result<String>> + Send + 'static,
{
    let results = NodeResults::new();
    let mut handles = Vec::new();
    for host in hosts.iter() {
        let node_id = host.node_id.clone();
        let fut = f(host.clone());
        let r = results.clone();
        handles.push(tokio::spawn(async move {
            match fut.await {
                Ok(v) => r.add(&node_id, &v, None),
                Err(e) => r.add(&node_id, "", Some(e.to_string())),
            }
        }));
    }
    for h in handles {
        if let Err(e) = h.await {
            log::warn!("host task failed to complete ({})", e);
        }
    }
    results
}

pub fn parse_bootstrapped_output(b: &[u8]) -> io::Result<bool> {
    match jsonrpc::parse_response::<IsBootstrappedResult>(b) {
        Ok(r) => Ok(r.is_bootstrapped),
        Err(_) => Err(Error::new(
            ErrorKind::InvalidData,
            "unable to parse node bootstrap status",
        )),
    }
}

pub fn parse_healthy_output(b: &[u8]) -> io::Result<bool> {
    match jsonrpc::parse_response::<HealthResult>(b) {
        Ok(r) => Ok(r.healthy),
        Err(_) => Err(Error::new(
            ErrorKind::InvalidData,
            "unable to parse node healthy status",
        )),
    }
}

/// Returns the RPC protocol version reported by "info.getNodeVersion".
pub fn parse_rpc_version_output(b: &[u8]) -> io::Result<u32> {
    let r: GetNodeVersionResult = jsonrpc::parse_response(b).map_err(|_| {
        Error::new(
            ErrorKind::InvalidData,
            "unable to parse node version",
        )
    })?;
    r.rpc_version().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("node {} reports no RPC protocol version", r.version),
        )
    })
}

pub async fn check_bootstrapped(host: &Host, timeout: Duration) -> io::Result<bool> {
    let body = jsonrpc::request_body("info.isBootstrapped", Some(json!({ "chain": "X" })));
    let b = host.post("", &body, timeout).await?;
    parse_bootstrapped_output(&b)
}

pub async fn check_healthy(host: &Host, timeout: Duration) -> io::Result<bool> {
    let body = jsonrpc::request_body("health.health", Some(json!({ "tags": ["P"] })));
    let b = host.post("/ext/health", &body, timeout).await?;
    parse_healthy_output(&b)
}

pub async fn get_rpc_version(host: &Host, timeout: Duration) -> io::Result<u32> {
    let body = jsonrpc::request_body("info.getNodeVersion", None);
    let b = host.post("", &body, timeout).await?;
    parse_rpc_version_output(&b)
}

fn fail_on_errors(results: &NodeResults, what: &str) -> io::Result<()> {
    if results.has_errors() {
        for (node, err) in results.get_error_host_map() {
            log::error!("{} failed on {}: {}", what, node, err);
        }
        return Err(Error::new(
            ErrorKind::Other,
            format!(
                "failed to get {} for node(s) {:?}",
                what,
                results.get_nodes_with_errors()
            ),
        ));
    }
    Ok(())
}

pub fn get_not_bootstrapped_nodes(results: &NodeResults) -> io::Result<Vec<String>> {
    fail_on_errors(results, "avalanchego bootstrap status")?;
    Ok(results
        .get_result_map()
        .into_iter()
        .filter(|(_, v)| v != "true")
        .map(|(node, _)| node)
        .collect())
}

pub fn get_unhealthy_nodes(results: &NodeResults) -> io::Result<Vec<String>> {
    fail_on_errors(results, "avalanchego health status")?;
    Ok(results
        .get_result_map()
        .into_iter()
        .filter(|(_, v)| v != "true")
        .map(|(node, _)| node)
        .collect())
}

/// Nodes whose RPC protocol version differs from the VM's.
pub fn get_rpc_incompatible_nodes(
    results: &NodeResults,
    rpc_version: u32,
) -> io::Result<Vec<String>> {
    fail_on_errors(results, "avalanchego version")?;
    let want = rpc_version.to_string();
    Ok(results
        .get_result_map()
        .into_iter()
        .filter(|(_, v)| *v != want)
        .map(|(node, _)| node)
        .collect())
}

async fn check_hosts(hosts: &[Host], sc: &Sidecar, timeout: Duration) -> io::Result<()> {
    let results = fan_out(hosts, |h| async move {
        check_bootstrapped(&h, timeout).await.map(|b| b.to_string())
    })
    .await;
    let nodes = get_not_bootstrapped_nodes(&results)?;
    if !nodes.is_empty() {
        return Err(Error::new(
            ErrorKind::Other,
            format!("node(s) {:?} are not bootstrapped yet, please try again later", nodes),
        ));
    }

    let results = fan_out(hosts, |h| async move {
        check_healthy(&h, timeout).await.map(|b| b.to_string())
    })
    .await;
    let nodes = get_unhealthy_nodes(&results)?;
    if !nodes.is_empty() {
        return Err(Error::new(
            ErrorKind::Other,
            format!("node(s) {:?} are not healthy, please fix the issue and try again", nodes),
        ));
    }

    if sc.rpc_version == 0 {
        log::info!("RPC version of {} unknown, skipping compatibility check", sc.name);
        return Ok(());
    }
    let results = fan_out(hosts, |h| async move {
        get_rpc_version(&h, timeout).await.map(|v| v.to_string())
    })
    .await;
    let nodes = get_rpc_incompatible_nodes(&results, sc.rpc_version)?;
    if !nodes.is_empty() {
        return Err(Error::new(
            ErrorKind::Other,
            format!(
                "the AvalancheGo version of node(s) {:?} is incompatible with VM RPC version {} of {}",
                nodes, sc.rpc_version, sc.name
            ),
        ));
    }
    Ok(())
}

/// Deployment of the blockchain the cluster syncs, looked up under the
/// cluster network first and under the underlying network otherwise.
pub fn cluster_network_data(sc: &Sidecar, network: &Network) -> Option<NetworkData> {
    let base = Network {
        cluster_name: String::new(),
        ..network.clone()
    };
    for name in [network.name(), base.name()] {
        if sc.is_deployed_to(&name) {
            return sc.network_data(&name).cloned();
        }
    }
    None
}

/// Subnet IDs of every blockchain the cluster tracks plus the new one.
pub fn tracked_subnet_ids(
    app: &Avalanche,
    cc: &ClusterConfig,
    subnet_id: &ids::Id,
) -> io::Result<Vec<String>> {
    let mut out = vec![subnet_id.to_string()];
    for name in cc.subnets.iter() {
        let sc = app.load_sidecar(name)?;
        match cluster_network_data(&sc, &cc.network) {
            Some(d) => out.push(d.subnet_id.to_string()),
            None => log::warn!(
                "tracked blockchain {} has no deployment on {}",
                name,
                cc.network.name()
            ),
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

struct TrackContext {
    app: Avalanche,
    network: Network,
    blockchain_name: String,
    subnet_id: ids::Id,
    blockchain_id: ids::Id,
    track_subnets: Vec<String>,
    aliases: Vec<String>,
    timeout: Duration,
}

/// Names the blockchain is reachable under on a node:
/// its own name first, then the extra aliases.
pub fn node_aliases(blockchain_name: &str, aliases: &[String]) -> Vec<String> {
    let mut out = vec![blockchain_name.to_string()];
    for alias in aliases {
        if !alias.is_empty() && !out.contains(alias) {
            out.push(alias.clone());
        }
    }
    out
}

type Step<'a> = (&'static str, Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>);

fn step<'a, F>(name: &'static str, f: F) -> Step<'a>
where
    F: Future<Output = io::Result<()>> + Send + 'a,
{
    (name, Box::pin(f))
}

/// Runs every step in order, also the ones after a failed step,
/// and joins the errors.
async fn run_all_steps(node_id: &str, steps: Vec<Step<'_>>) -> io::Result<String> {
    let mut errs = Vec::new();
    for (name, f) in steps {
        if let Err(e) = f.await {
            log::warn!("failed to {} on {} ({})", name, node_id, e);
            errs.push(format!("failed to {} ({})", name, e));
        }
    }
    if errs.is_empty() {
        return Ok(String::new());
    }
    Err(Error::new(ErrorKind::Other, errs.join(", ")))
}

/// The node is started again whatever the steps before it return.
async fn track_subnet(host: Host, api_host: bool, ctx: Arc<TrackContext>) -> io::Result<String> {
    let blockchain_id = ctx.blockchain_id.to_string();
    let steps = vec![
        step("stop node", remote::stop_node(&host, ctx.timeout)),
        step(
            "render alias config",
            remote::render_alias_config(&host, &blockchain_id, &ctx.aliases, ctx.timeout),
        ),
        step(
            "render node config",
            remote::render_node_config(
                &host,
                &ctx.network,
                &ctx.track_subnets,
                api_host,
                ctx.timeout,
            ),
        ),
        step(
            "sync subnet data",
            remote::sync_subnet_data(
                &ctx.app,
                &host,
                &ctx.blockchain_name,
                &ctx.subnet_id,
                &ctx.blockchain_id,
                ctx.timeout,
            ),
        ),
        step("start node", remote::start_node(&host, ctx.timeout)),
    ];
    run_all_steps(&host.node_id, steps).await
}

/// Makes every AvalancheGo host of the cluster track the blockchain,
/// then records the cluster's public endpoints in the sidecar.
pub async fn sync_subnet(
    app: &Avalanche,
    cfg: &Config,
    cluster_name: &str,
    blockchain_name: &str,
    opts: &SyncOptions,
) -> io::Result<()> {
    let mut cc = match app.load_clusters_config()?.clusters.get(cluster_name) {
        Some(cc) => cc.clone(),
        None => {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("cluster {} not found", cluster_name),
            ))
        }
    };
    if cc.local {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("cluster {} is local, use 'node local track' instead", cluster_name),
        ));
    }
    if cc.nodes.is_empty() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("no nodes found in cluster {}", cluster_name),
        ));
    }

    let mut sc = app.load_sidecar(blockchain_name)?;
    let data = cluster_network_data(&sc, &cc.network).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidInput,
            format!(
                "blockchain {} has not been deployed to {}",
                blockchain_name,
                cc.network.name()
            ),
        )
    })?;

    let hosts: Vec<Host> = inventory::get_inventory_from_file(&app.get_inventory_dir(cluster_name))?
        .into_iter()
        .filter(|h| cc.is_avalanchego_host(&h.get_cloud_id()))
        .collect();
    if hosts.is_empty() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("no nodes found in cluster {}", cluster_name),
        ));
    }

    let timeout = cfg.ssh_timeout();
    if !opts.avoid_checks {
        check_hosts(&hosts, &sc, timeout).await?;
    }

    let long_timeout = cfg.ssh_long_running_timeout();
    let plugin_sc = Arc::new(sc.clone());
    let results = fan_out(&hosts, |h| {
        let sc = plugin_sc.clone();
        async move {
            remote::prepare_subnet_plugin(&h, &sc, long_timeout)
                .await
                .map(|_| String::new())
        }
    })
    .await;
    if results.has_errors() {
        for (node, err) in results.get_error_host_map() {
            log::error!("failed to install plugin on {}: {}", node, err);
        }
        return Err(Error::new(
            ErrorKind::Other,
            format!(
                "failed to upload plugin to node(s) {:?}",
                results.get_nodes_with_errors()
            ),
        ));
    }

    let ctx = Arc::new(TrackContext {
        app: app.clone(),
        network: cc.network.clone(),
        blockchain_name: blockchain_name.to_string(),
        subnet_id: data.subnet_id.clone(),
        blockchain_id: data.blockchain_id.clone(),
        track_subnets: tracked_subnet_ids(app, &cc, &data.subnet_id)?,
        aliases: node_aliases(blockchain_name, &opts.subnet_aliases),
        timeout,
    });
    let results = fan_out(&hosts, |h| {
        let api_host = cc.is_api_host(&h.get_cloud_id());
        track_subnet(h, api_host, ctx.clone())
    })
    .await;
    if results.has_errors() {
        for (node, err) in results.get_error_host_map() {
            log::error!("failed to track subnet on {}: {}", node, err);
        }
        return Err(Error::new(
            ErrorKind::Other,
            format!(
                "failed to track subnet for node(s) {:?}",
                results.get_nodes_with_errors()
            ),
        ));
    }

    cc.add_subnet(blockchain_name);
    app.set_cluster_config(cluster_name, cc.clone())?;
    record_public_endpoints(&mut sc, &cc, &cc.get_api_hosts(&hosts), &data);
    app.update_sidecar(&mut sc)
}

/// Unions the RPC/WS endpoints of the API hosts into the cluster network entry.
pub fn record_public_endpoints(
    sc: &mut Sidecar,
    cc: &ClusterConfig,
    api_hosts: &[Host],
    data: &NetworkData,
) {
    let entry = sc
        .networks
        .entry(cc.network.name())
        .or_insert_with(|| NetworkData {
            subnet_id: data.subnet_id.clone(),
            blockchain_id: data.blockchain_id.clone(),
            ..Default::default()
        });
    if entry.blockchain_id == ids::Id::empty() {
        entry.subnet_id = data.subnet_id.clone();
        entry.blockchain_id = data.blockchain_id.clone();
    }
    for h in api_hosts {
        let uri = format!("http://{}:{}", h.ip, constants::AVALANCHEGO_API_PORT);
        subnet::add_node_endpoints(entry, &uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{host, VmType},
        netrunner::fake::test_id,
    };

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::sync::tests::test_parse_outputs --exact --show-output
    #[test]
    fn test_parse_outputs() {
        assert!(parse_bootstrapped_output(
            br#"{"jsonrpc":"2.0","result":{"isBootstrapped":true},"id":1}"#
        )
        .unwrap());
        assert!(!parse_bootstrapped_output(
            br#"{"jsonrpc":"2.0","result":{"isBootstrapped":false},"id":1}"#
        )
        .unwrap());
        for bad in [
            &b""[..],
            &b"curl: (7) Failed to connect to 127.0.0.1 port 9650"[..],
            &br#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"boom"},"id":1}"#[..],
        ] {
            assert_eq!(
                parse_bootstrapped_output(bad).unwrap_err().to_string(),
                "unable to parse node bootstrap status"
            );
        }

        assert!(parse_healthy_output(br#"{"jsonrpc":"2.0","result":{"healthy":true},"id":1}"#).unwrap());
        assert!(parse_healthy_output(b"garbage").is_err());

        assert_eq!(
            parse_rpc_version_output(
                br#"{"jsonrpc":"2.0","result":{"version":"avalanchego/1.11.0","rpcProtocolVersion":33},"id":1}"#
            )
            .unwrap(),
            33
        );
        assert!(parse_rpc_version_output(
            br#"{"jsonrpc":"2.0","result":{"version":"avalanchego/1.11.0"},"id":1}"#
        )
        .is_err());
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::sync::tests::test_result_filters --exact --show-output
    #[test]
    fn test_result_filters() {
        let results = NodeResults::new();
        results.add("aws_node_i-1", "true", None);
        results.add("aws_node_i-2", "false", None);
        results.add("aws_node_i-3", "true", None);
        assert_eq!(get_not_bootstrapped_nodes(&results).unwrap(), vec!["aws_node_i-2"]);
        assert_eq!(get_unhealthy_nodes(&results).unwrap(), vec!["aws_node_i-2"]);

        let versions = NodeResults::new();
        versions.add("aws_node_i-1", "33", None);
        versions.add("aws_node_i-2", "32", None);
        assert_eq!(
            get_rpc_incompatible_nodes(&versions, 33).unwrap(),
            vec!["aws_node_i-2"]
        );

        results.add("aws_node_i-4", "", Some(String::from("ssh failed")));
        let err = get_not_bootstrapped_nodes(&results).unwrap_err();
        assert!(err.to_string().contains("aws_node_i-4"));
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::sync::tests::test_fan_out --exact --show-output
    #[tokio::test]
    async fn test_fan_out() {
        let hosts: Vec<Host> = (1..=4)
            .map(|i| Host {
                node_id: format!("aws_node_i-{}", i),
                ip: format!("10.0.0.{}", i),
                ..Default::default()
            })
            .collect();
        let results = fan_out(&hosts, |h| async move {
            if h.ip.ends_with(".3") {
                return Err(Error::new(ErrorKind::Other, "unreachable"));
            }
            Ok(h.ip.clone())
        })
        .await;
        assert_eq!(results.len(), 4);
        assert_eq!(results.get_nodes_with_errors(), vec!["aws_node_i-3"]);
        assert_eq!(results.get_result_map()["aws_node_i-4"], "10.0.0.4");
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::sync::tests::test_run_all_steps --exact --show-output
    #[tokio::test]
    async fn test_run_all_steps() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let started = AtomicBool::new(false);
        let steps = vec![
            step("stop node", async { Ok::<(), Error>(()) }),
            step("render node config", async {
                Err::<(), Error>(Error::new(ErrorKind::Other, "disk full"))
            }),
            step("sync subnet data", async {
                Err::<(), Error>(Error::new(ErrorKind::NotFound, "no genesis"))
            }),
            step("start node", async {
                started.store(true, Ordering::SeqCst);
                Ok::<(), Error>(())
            }),
        ];
        let err = run_all_steps("aws_node_i-1", steps).await.unwrap_err();
        assert!(started.load(Ordering::SeqCst));
        assert_eq!(
            err.to_string(),
            "failed to render node config (disk full), failed to sync subnet data (no genesis)"
        );

        let steps = vec![step("stop node", async { Ok::<(), Error>(()) })];
        assert_eq!(run_all_steps("aws_node_i-1", steps).await.unwrap(), "");
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::sync::tests::test_node_aliases --exact --show-output
    #[test]
    fn test_node_aliases() {
        assert_eq!(node_aliases("alpha", &[]), vec!["alpha"]);
        let aliases = node_aliases(
            "alpha",
            &[
                String::from("a1"),
                String::from("alpha"),
                String::new(),
                String::from("a2"),
            ],
        );
        assert_eq!(aliases, vec!["alpha", "a1", "a2"]);

        // the blockchain name takes over an alias another chain had
        let on_node = std::collections::BTreeMap::from([(
            String::from("bc1"),
            vec![String::from("alpha"), String::from("x")],
        )]);
        let merged = remote::merge_aliases(&on_node, "bc2", &aliases);
        assert_eq!(merged["bc1"], vec!["x"]);
        assert_eq!(merged["bc2"], vec!["a1", "a2", "alpha"]);
    }

    fn setup() -> (tempfile::TempDir, Avalanche) {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Info)
            .is_test(true)
            .try_init();
        let tmp_dir = tempfile::tempdir().unwrap();
        let app = Avalanche::new(tmp_dir.path().to_str().unwrap());
        app.setup().unwrap();
        (tmp_dir, app)
    }

    fn deployed(app: &Avalanche, name: &str, network_name: &str, seed: u8) {
        let mut sc = Sidecar::new(name, VmType::SubnetEvm);
        sc.networks.insert(
            network_name.to_string(),
            NetworkData {
                subnet_id: test_id(seed),
                blockchain_id: test_id(seed + 1),
                ..Default::default()
            },
        );
        app.create_sidecar(&mut sc).unwrap();
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::sync::tests::test_sync_subnet_errors --exact --show-output
    #[tokio::test]
    async fn test_sync_subnet_errors() {
        let (_tmp, app) = setup();
        let cfg = Config::default();
        let opts = SyncOptions::default();

        let err = sync_subnet(&app, &cfg, "c1", "alpha", &opts).await.unwrap_err();
        assert_eq!(err.to_string(), "cluster c1 not found");

        let network = Network::devnet("http://1.2.3.4:9650", 1338).with_cluster("c1");
        app.set_cluster_config(
            "c1",
            ClusterConfig {
                network: network.clone(),
                ..Default::default()
            },
        )
        .unwrap();
        let err = sync_subnet(&app, &cfg, "c1", "alpha", &opts).await.unwrap_err();
        assert_eq!(err.to_string(), "no nodes found in cluster c1");

        app.set_cluster_config(
            "c1",
            ClusterConfig {
                nodes: vec![String::from("i-1")],
                network,
                ..Default::default()
            },
        )
        .unwrap();
        let mut sc = Sidecar::new("alpha", VmType::SubnetEvm);
        app.create_sidecar(&mut sc).unwrap();
        let err = sync_subnet(&app, &cfg, "c1", "alpha", &opts).await.unwrap_err();
        assert_eq!(err.to_string(), "blockchain alpha has not been deployed to Cluster c1");

        app.set_cluster_config(
            "local",
            ClusterConfig {
                local: true,
                network: Network::local().with_cluster("local"),
                ..Default::default()
            },
        )
        .unwrap();
        let err = sync_subnet(&app, &cfg, "local", "alpha", &opts).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::sync::tests::test_tracked_subnets_and_endpoints --exact --show-output
    #[test]
    fn test_tracked_subnets_and_endpoints() {
        let (_tmp, app) = setup();
        let network = Network::devnet("http://1.2.3.4:9650", 1338).with_cluster("c1");
        deployed(&app, "alpha", &network.name(), 10);
        // deployed on the underlying devnet only
        deployed(&app, "beta", "Devnet", 20);

        let cc = ClusterConfig {
            nodes: vec![String::from("i-1"), String::from("i-2")],
            api_nodes: vec![String::from("i-2")],
            network,
            subnets: vec![String::from("alpha"), String::from("beta")],
            ..Default::default()
        };
        let ids = tracked_subnet_ids(&app, &cc, &test_id(30)).unwrap();
        let mut want = vec![
            test_id(10).to_string(),
            test_id(20).to_string(),
            test_id(30).to_string(),
        ];
        want.sort();
        assert_eq!(ids, want);

        let hosts: Vec<Host> = ["i-1", "i-2"]
            .iter()
            .enumerate()
            .map(|(i, id)| Host {
                node_id: host::host_cloud_id_to_ansible_id(host::AWS_CLOUD_SERVICE, id).unwrap(),
                ip: format!("10.0.0.{}", i + 1),
                ..Default::default()
            })
            .collect();
        let api_hosts = cc.get_api_hosts(&hosts);
        assert_eq!(api_hosts.len(), 1);

        let mut sc = app.load_sidecar("beta").unwrap();
        let data = cluster_network_data(&sc, &cc.network).unwrap();
        record_public_endpoints(&mut sc, &cc, &api_hosts, &data);
        record_public_endpoints(&mut sc, &cc, &api_hosts, &data);
        let entry = sc.network_data("Cluster c1").unwrap();
        assert_eq!(
            entry.rpc_endpoints,
            vec![format!("http://10.0.0.2:9650/ext/bc/{}/rpc", test_id(21))]
        );
        assert_eq!(
            entry.ws_endpoints,
            vec![format!("ws://10.0.0.2:9650/ext/bc/{}/ws", test_id(21))]
        );
        assert_eq!(entry.subnet_id, test_id(20));
    }
}
