use std::{
    fs,
    io::{self, Error, ErrorKind},
};

use avalanche_cli::{
    app::Avalanche,
    config::Config,
    constants,
    jsonrpc::HttpNodeClient,
    models::{Network, NetworkKind},
    netrunner::{self, server::Server},
    node::local::{self as local_cluster, LocalCluster, StartOptions},
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::prompt;

pub const NAME: &str = "local";

fn cluster_name_arg() -> Arg {
    Arg::new("CLUSTER_NAME")
        .help("Name of the local cluster")
        .required(true)
        .num_args(1)
}

fn file_arg(id: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(long)
        .help(help)
        .required(false)
        .num_args(1)
}

pub fn command() -> Command {
    Command::new(NAME)
        .about("Runs AvalancheGo clusters on this machine")
        .subcommand_required(true)
        .subcommands(vec![
            Command::new("start")
                .about("Creates and starts a local cluster, or resumes a stopped one")
                .arg(cluster_name_arg())
                .arg(
                    Arg::new("NUM_NODES")
                        .long("num-nodes")
                        .short('n')
                        .help("Number of nodes of a new cluster")
                        .required(false)
                        .num_args(1)
                        .value_parser(value_parser!(u32))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("FUJI")
                        .long("fuji")
                        .help("Joins Fuji")
                        .required(false)
                        .num_args(0)
                        .conflicts_with_all(["MAINNET", "LOCAL"]),
                )
                .arg(
                    Arg::new("MAINNET")
                        .long("mainnet")
                        .help("Joins Mainnet")
                        .required(false)
                        .num_args(0)
                        .conflicts_with("LOCAL"),
                )
                .arg(
                    Arg::new("LOCAL")
                        .long("local")
                        .help("Joins the local network (default)")
                        .required(false)
                        .num_args(0),
                )
                .arg(file_arg(
                    "AVALANCHEGO_PATH",
                    "avalanchego-path",
                    "AvalancheGo binary the nodes run",
                ))
                .arg(file_arg(
                    "AVALANCHEGO_VERSION",
                    "avalanchego-version",
                    "AvalancheGo release installed under the bin dir (e.g., v1.10.13)",
                ))
                .arg(file_arg(
                    "NODE_CONFIG",
                    "node-config",
                    "JSON file of extra AvalancheGo flags",
                ))
                .arg(file_arg(
                    "CUSTOM_GENESIS",
                    "custom-genesis",
                    "Genesis file of the network",
                ))
                .arg(file_arg(
                    "CUSTOM_UPGRADE",
                    "custom-upgrade",
                    "Upgrade file of the network",
                ))
                .arg(
                    Arg::new("BOOTSTRAP_ID")
                        .long("bootstrap-id")
                        .help("Node ID of a bootstrapper (repeatable)")
                        .required(false)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("BOOTSTRAP_IP")
                        .long("bootstrap-ip")
                        .help("IP:port of a bootstrapper (repeatable)")
                        .required(false)
                        .action(ArgAction::Append),
                )
                .arg(file_arg(
                    "STAKING_TLS_KEY",
                    "staking-tls-key",
                    "TLS key of the first node",
                ))
                .arg(file_arg(
                    "STAKING_TLS_CERT",
                    "staking-tls-cert",
                    "TLS certificate of the first node",
                ))
                .arg(file_arg(
                    "STAKING_SIGNER_KEY",
                    "staking-signer-key",
                    "BLS signer key of the first node",
                )),
            Command::new("stop").about("Stops the running local cluster"),
            Command::new("destroy")
                .about("Stops a local cluster and deletes its data")
                .arg(cluster_name_arg())
                .arg(
                    Arg::new("SKIP_PROMPT")
                        .long("skip-prompt")
                        .short('s')
                        .help("Skips prompt mode")
                        .required(false)
                        .num_args(0),
                ),
            Command::new("status")
                .about("Prints the status of local clusters")
                .arg(
                    Arg::new("CLUSTER_NAME")
                        .help("Name of the local cluster (all if empty)")
                        .required(false)
                        .num_args(1),
                )
                .arg(
                    Arg::new("BLOCKCHAIN_NAME")
                        .long("blockchain")
                        .help("Also prints the sync status of the blockchain")
                        .required(false)
                        .num_args(1),
                ),
            Command::new("track")
                .about("Makes every node of a local cluster track a blockchain")
                .arg(cluster_name_arg())
                .arg(
                    Arg::new("BLOCKCHAIN_NAME")
                        .help("Name of the blockchain")
                        .required(true)
                        .num_args(1),
                ),
            Command::new("upsize")
                .about("Adds nodes to a running local cluster")
                .arg(cluster_name_arg())
                .arg(
                    Arg::new("NUM_NODES")
                        .long("num-nodes")
                        .short('n')
                        .help("Number of nodes to add")
                        .required(true)
                        .num_args(1)
                        .value_parser(value_parser!(u32)),
                ),
        ])
}

fn get_string(matches: &ArgMatches, id: &str) -> String {
    matches
        .get_one::<String>(id)
        .unwrap_or(&String::new())
        .clone()
}

fn get_strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default()
}

/// Reads the start flags. The node config file is parsed here.
fn start_options(matches: &ArgMatches) -> io::Result<StartOptions> {
    let network = if matches.get_flag("FUJI") {
        Network::fuji()
    } else if matches.get_flag("MAINNET") {
        Network::mainnet()
    } else {
        Network::local()
    };

    let node_config_path = get_string(matches, "NODE_CONFIG");
    let node_config = if node_config_path.is_empty() {
        serde_json::Map::new()
    } else {
        let d = fs::read(&node_config_path)?;
        match serde_json::from_slice::<serde_json::Value>(&d) {
            Ok(serde_json::Value::Object(m)) => m,
            Ok(_) => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("node config {} is not a JSON object", node_config_path),
                ))
            }
            Err(e) => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("invalid node config {} ({})", node_config_path, e),
                ))
            }
        }
    };

    Ok(StartOptions {
        num_nodes: *matches
            .get_one::<u32>("NUM_NODES")
            .unwrap_or(&constants::DEFAULT_NUM_LOCAL_NODES),
        network,
        avalanchego_path: get_string(matches, "AVALANCHEGO_PATH"),
        avalanchego_version: get_string(matches, "AVALANCHEGO_VERSION"),
        node_config,
        genesis_path: get_string(matches, "CUSTOM_GENESIS"),
        upgrade_path: get_string(matches, "CUSTOM_UPGRADE"),
        bootstrap_ids: get_strings(matches, "BOOTSTRAP_ID"),
        bootstrap_ips: get_strings(matches, "BOOTSTRAP_IP"),
        staking_tls_key_path: get_string(matches, "STAKING_TLS_KEY"),
        staking_tls_cert_path: get_string(matches, "STAKING_TLS_CERT"),
        staking_signer_key_path: get_string(matches, "STAKING_SIGNER_KEY"),
        local_network_dir: String::new(),
    })
}

pub async fn execute(app: &Avalanche, cfg: &Config, matches: &ArgMatches) -> io::Result<()> {
    let server = Server::for_local_cluster(app, cfg);
    let gw = server.gateway()?;
    let node_client = HttpNodeClient;
    let lc = LocalCluster::new(app, &gw, &node_client, cfg).with_server(&server);

    match matches.subcommand() {
        Some(("start", sub_matches)) => {
            let cluster_name = get_string(sub_matches, "CLUSTER_NAME");
            let opts = resolve_start_options(app, cfg, &cluster_name, sub_matches).await?;

            prompt::print_title(&format!(
                "Starting local cluster {} on {}",
                cluster_name,
                opts.network.name()
            ))?;
            match lc.start(&cluster_name, &opts).await? {
                Some(info) => {
                    prompt::print_success(&format!("Local cluster {} is up", cluster_name))?;
                    for node in info.nodes() {
                        println!("{} ({}): {}", node.name, node.id, node.uri);
                    }
                    Ok(())
                }
                None => prompt::print_warning(
                    "A local cluster is already running, stop it with 'node local stop'",
                ),
            }
        }

        Some(("stop", _)) => {
            lc.stop().await?;
            prompt::print_success("Local cluster stopped")
        }

        Some(("destroy", sub_matches)) => {
            let cluster_name = get_string(sub_matches, "CLUSTER_NAME");
            if !prompt::confirm(
                sub_matches.get_flag("SKIP_PROMPT"),
                &format!("destroy local cluster {}", cluster_name),
            )? {
                return Ok(());
            }
            lc.destroy(&cluster_name).await?;
            prompt::print_success(&format!("Local cluster {} destroyed", cluster_name))
        }

        Some(("status", sub_matches)) => {
            let cluster_name = sub_matches.get_one::<String>("CLUSTER_NAME");
            let blockchain_name = sub_matches.get_one::<String>("BLOCKCHAIN_NAME");
            let statuses = lc
                .status(
                    cluster_name.map(|s| s.as_str()),
                    blockchain_name.map(|s| s.as_str()),
                )
                .await?;
            if statuses.is_empty() {
                return prompt::print_warning("No local clusters found");
            }
            for st in statuses.iter() {
                prompt::print_title(&format!(
                    "Local cluster {} ({}): {}",
                    st.name,
                    st.network_name,
                    if !st.running {
                        "stopped"
                    } else if st.healthy {
                        "running, healthy"
                    } else {
                        "running, not healthy"
                    }
                ))?;
                println!("Root dir: {}", st.root_dir);
                for node in st.nodes.iter() {
                    let mut line = format!(
                        "  {} {} {} primary bootstrapped: {}",
                        node.name, node.node_id, node.uri, node.primary_bootstrapped
                    );
                    if let Some(s) = &node.blockchain_status {
                        line.push_str(&format!(", blockchain: {}", s));
                    }
                    println!("{}", line);
                }
            }
            Ok(())
        }

        Some(("track", sub_matches)) => {
            let cluster_name = get_string(sub_matches, "CLUSTER_NAME");
            let blockchain_name = get_string(sub_matches, "BLOCKCHAIN_NAME");
            let endpoints = lc.track(&cluster_name, &blockchain_name).await?;
            prompt::print_success(&format!(
                "Local cluster {} is tracking {}",
                cluster_name, blockchain_name
            ))?;
            for ep in endpoints.iter() {
                println!("RPC URL: {}", ep);
            }
            Ok(())
        }

        Some(("upsize", sub_matches)) => {
            let cluster_name = get_string(sub_matches, "CLUSTER_NAME");
            let num_nodes = *sub_matches.get_one::<u32>("NUM_NODES").unwrap_or(&1);
            let added = lc.upsize(&cluster_name, num_nodes).await?;
            prompt::print_success(&format!(
                "Added {} node(s) to local cluster {}",
                added.len(),
                cluster_name
            ))?;
            for node in added.iter() {
                println!("{} ({}): {}", node.name, node.id, node.uri);
            }
            Ok(())
        }

        _ => unreachable!("unknown subcommand"),
    }
}

/// Start options of the cluster. A stopped cluster resumes on the network
/// it was created on, so the network flags only apply to a new one.
async fn resolve_start_options(
    app: &Avalanche,
    cfg: &Config,
    cluster_name: &str,
    matches: &ArgMatches,
) -> io::Result<StartOptions> {
    let mut opts = start_options(matches)?;
    if let Some(cc) = local_cluster::resumable_cluster(app, cluster_name)? {
        log::info!("local cluster {} exists, resuming it", cluster_name);
        opts.network = Network {
            cluster_name: String::new(),
            ..cc.network
        };
        return Ok(opts);
    }
    if opts.network.kind == NetworkKind::Local {
        opts.local_network_dir = local_network_dir(app, cfg).await?;
    }
    Ok(opts)
}

/// Root data dir of the network run by the default server.
async fn local_network_dir(app: &Avalanche, cfg: &Config) -> io::Result<String> {
    let server = Server::new(app, cfg);
    let not_running = || {
        Error::new(
            ErrorKind::NotFound,
            "local network is not running, start it with 'network start'",
        )
    };
    if !server.is_running().await {
        return Err(not_running());
    }
    match netrunner::status_if_running(&server.gateway()?).await? {
        Some(info) => Ok(info.root_data_dir),
        None => Err(not_running()),
    }
}

/// RUST_LOG=debug cargo test --package avalanche --bin avalanche -- node::local::test_start_options --exact --show-output
#[test]
fn test_start_options() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let node_config = tmp_dir.path().join("node.json");
    fs::write(&node_config, br#"{"log-level":"debug"}"#).unwrap();

    let m = command()
        .try_get_matches_from([
            "local",
            "start",
            "mycluster",
            "--mainnet",
            "--node-config",
            node_config.to_str().unwrap(),
            "--bootstrap-id",
            "NodeID-A",
            "--bootstrap-id",
            "NodeID-B",
            "--bootstrap-ip",
            "1.2.3.4:9651",
            "--bootstrap-ip",
            "5.6.7.8:9651",
        ])
        .unwrap();
    let (_, start_m) = m.subcommand().unwrap();
    let opts = start_options(start_m).unwrap();
    assert_eq!(opts.num_nodes, 1);
    assert_eq!(opts.network.kind, NetworkKind::Mainnet);
    assert_eq!(opts.node_config["log-level"], "debug");
    assert_eq!(opts.bootstrap_ids, vec!["NodeID-A", "NodeID-B"]);
    assert_eq!(opts.bootstrap_ips, vec!["1.2.3.4:9651", "5.6.7.8:9651"]);
    assert!(opts.avalanchego_path.is_empty());

    let m = command()
        .try_get_matches_from(["local", "start", "mycluster"])
        .unwrap();
    let (_, start_m) = m.subcommand().unwrap();
    assert_eq!(start_options(start_m).unwrap().network.kind, NetworkKind::Local);

    fs::write(&node_config, b"[1, 2]").unwrap();
    let m = command()
        .try_get_matches_from([
            "local",
            "start",
            "mycluster",
            "--node-config",
            node_config.to_str().unwrap(),
        ])
        .unwrap();
    let (_, start_m) = m.subcommand().unwrap();
    assert_eq!(
        start_options(start_m).unwrap_err().kind(),
        ErrorKind::InvalidInput
    );

    assert!(command()
        .try_get_matches_from(["local", "start", "mycluster", "--fuji", "--mainnet"])
        .is_err());
}

/// RUST_LOG=debug cargo test --package avalanche --bin avalanche -- node::local::test_resolve_start_options --exact --show-output
#[tokio::test]
async fn test_resolve_start_options() {
    use avalanche_cli::models::ClusterConfig;

    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    let tmp_dir = tempfile::tempdir().unwrap();
    let app = Avalanche::new(tmp_dir.path().to_str().unwrap());
    app.setup().unwrap();
    // nothing listens there, the default local network counts as stopped
    let cfg = Config {
        gateway_endpoint: String::from("http://127.0.0.1:1"),
        ..Default::default()
    };

    // stopped Fuji cluster, resumed without network flags
    app.set_cluster_config(
        "c1",
        ClusterConfig {
            local: true,
            network: Network::fuji().with_cluster("c1"),
            ..Default::default()
        },
    )
    .unwrap();
    let root_dir = app.get_local_cluster_dir("c1");
    fs::create_dir_all(&root_dir).unwrap();
    fs::write(
        std::path::Path::new(&root_dir).join(constants::LOCAL_STATE_FILE_NAME),
        b"{}",
    )
    .unwrap();

    let m = command()
        .try_get_matches_from(["local", "start", "c1"])
        .unwrap();
    let (_, start_m) = m.subcommand().unwrap();
    let opts = resolve_start_options(&app, &cfg, "c1", start_m).await.unwrap();
    assert_eq!(opts.network.kind, NetworkKind::Fuji);
    assert_eq!(opts.network.name(), "Fuji");
    assert!(opts.local_network_dir.is_empty());

    // a new cluster on the local network needs it running
    let err = resolve_start_options(&app, &cfg, "c2", start_m)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let m = command()
        .try_get_matches_from(["local", "start", "c2", "--fuji"])
        .unwrap();
    let (_, start_m) = m.subcommand().unwrap();
    let opts = resolve_start_options(&app, &cfg, "c2", start_m).await.unwrap();
    assert_eq!(opts.network.kind, NetworkKind::Fuji);
}
