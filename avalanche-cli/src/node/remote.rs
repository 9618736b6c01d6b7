//! Operations on a single cloud node over SSH.
use std::{
    collections::BTreeMap,
    io::{self, Error, ErrorKind},
    path::Path,
    time::Duration,
};

use avalanche_types::ids;

use crate::{
    app::Avalanche,
    artifacts, constants,
    models::{Host, Network, NetworkKind, Sidecar, VmType},
};

fn remote_config_path(parts: &[&str]) -> String {
    let mut p = Path::new(constants::CLOUD_NODE_CONFIG_PATH).to_path_buf();
    for part in parts {
        p = p.join(part);
    }
    p.display().to_string()
}

pub async fn stop_node(host: &Host, timeout: Duration) -> io::Result<()> {
    log::info!("stopping avalanchego on {}", host.node_id);
    let script =
        artifacts::stop_node_sh(constants::REMOTE_COMPOSE_FILE, constants::AVALANCHEGO_SERVICE)?;
    host.command(&script, timeout).await.map(|_| ())
}

pub async fn start_node(host: &Host, timeout: Duration) -> io::Result<()> {
    log::info!("starting avalanchego on {}", host.node_id);
    let script =
        artifacts::start_node_sh(constants::REMOTE_COMPOSE_FILE, constants::AVALANCHEGO_SERVICE)?;
    host.command(&script, timeout).await.map(|_| ())
}

/// Downloads a remote JSON file, None if it does not exist.
async fn download_json(
    host: &Host,
    remote_file: &str,
    timeout: Duration,
) -> io::Result<Option<serde_json::Value>> {
    if !host.file_exists(remote_file, timeout).await {
        return Ok(None);
    }
    let tmp_dir = tempfile::tempdir()?;
    let local = tmp_dir.path().join("remote.json").display().to_string();
    host.download(remote_file, &local, timeout).await?;
    let d = std::fs::read(&local)?;
    let v = serde_json::from_slice(&d).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("invalid JSON in {} on {} ({})", remote_file, host.node_id, e),
        )
    })?;
    Ok(Some(v))
}

fn encode_json(v: &serde_json::Value) -> io::Result<Vec<u8>> {
    serde_json::to_vec_pretty(v).map_err(|e| {
        Error::new(
            ErrorKind::Other,
            format!("failed to serialize to JSON {}", e),
        )
    })
}

/// Merges new aliases of the blockchain into the node's alias config
/// (blockchain ID to aliases). An alias maps to one blockchain only.
pub fn merge_aliases(
    remote: &BTreeMap<String, Vec<String>>,
    blockchain_id: &str,
    aliases: &[String],
) -> BTreeMap<String, Vec<String>> {
    let mut alias_to_id = BTreeMap::new();
    for (id, id_aliases) in remote.iter() {
        for alias in id_aliases {
            alias_to_id.insert(alias.clone(), id.clone());
        }
    }
    for alias in aliases {
        alias_to_id.insert(alias.clone(), blockchain_id.to_string());
    }

    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (alias, id) in alias_to_id {
        out.entry(id).or_default().push(alias);
    }
    out
}

pub async fn render_alias_config(
    host: &Host,
    blockchain_id: &str,
    aliases: &[String],
    timeout: Duration,
) -> io::Result<()> {
    let remote_file = remote_config_path(&["chains", constants::ALIASES_FILE_NAME]);
    let remote: BTreeMap<String, Vec<String>> =
        match download_json(host, &remote_file, timeout).await? {
            Some(v) => serde_json::from_value(v).map_err(|e| {
                Error::new(
                    ErrorKind::InvalidData,
                    format!("invalid alias config on {} ({})", host.node_id, e),
                )
            })?,
            None => BTreeMap::new(),
        };
    let merged = merge_aliases(&remote, blockchain_id, aliases);
    let d = serde_json::to_value(&merged).map_err(|e| {
        Error::new(ErrorKind::Other, format!("failed to encode aliases {}", e))
    })?;
    host.upload_bytes(&encode_json(&d)?, &remote_file, timeout).await
}

/// Node config of a cloud node tracking the given subnets.
/// Bootstrappers, custom genesis/upgrade and partial sync settings
/// of the existing remote config are kept.
pub fn build_node_config(
    remote: Option<&serde_json::Map<String, serde_json::Value>>,
    network: &Network,
    track_subnets: &[String],
    api_host: bool,
) -> serde_json::Map<String, serde_json::Value> {
    let mut m = serde_json::Map::new();
    if let Some(remote) = remote {
        for key in [
            "genesis-file",
            "upgrade-file",
            "bootstrap-ids",
            "bootstrap-ips",
            "partial-sync-primary-network",
            "public-ip",
            "public-ip-resolution-service",
        ] {
            if let Some(v) = remote.get(key) {
                m.insert(key.to_string(), v.clone());
            }
        }
    }

    let mut subnets: Vec<String> = track_subnets
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect();
    subnets.sort();
    subnets.dedup();

    let public = matches!(network.kind, NetworkKind::Local | NetworkKind::Devnet);
    let http_host = if api_host || public {
        "0.0.0.0"
    } else {
        "127.0.0.1"
    };
    m.insert(
        String::from("network-id"),
        serde_json::Value::String(network.network_id_flag_value()),
    );
    m.insert(
        String::from("http-host"),
        serde_json::Value::String(http_host.to_string()),
    );
    m.insert(
        String::from("track-subnets"),
        serde_json::Value::String(subnets.join(",")),
    );
    m
}

pub async fn render_node_config(
    host: &Host,
    network: &Network,
    track_subnets: &[String],
    api_host: bool,
    timeout: Duration,
) -> io::Result<()> {
    let remote_file = remote_config_path(&[constants::REMOTE_NODE_CONFIG_FILE_NAME]);
    let remote = download_json(host, &remote_file, timeout).await?;
    let remote_map = remote.as_ref().and_then(|v| v.as_object());

    // custom genesis/upgrade references are dropped once the file is gone
    let mut m = build_node_config(remote_map, network, track_subnets, api_host);
    for key in ["genesis-file", "upgrade-file"] {
        let path = match m.get(key).and_then(|v| v.as_str()) {
            Some(p) => p.to_string(),
            None => continue,
        };
        if !host.file_exists(&path, timeout).await {
            log::warn!("{} {} missing on {}, dropping it", key, path, host.node_id);
            m.remove(key);
        }
    }

    log::info!(
        "rendering node config on {} (track-subnets {})",
        host.node_id,
        track_subnets.join(",")
    );
    host.upload_bytes(&encode_json(&serde_json::Value::Object(m))?, &remote_file, timeout)
        .await
}

/// Local files of the blockchain a cloud node needs, each paired with
/// its remote path: node genesis, subnet config, chain config and
/// network upgrades. Missing local files are skipped.
pub fn subnet_data_files(
    app: &Avalanche,
    cloud_id: &str,
    blockchain_name: &str,
    subnet_id: &ids::Id,
    blockchain_id: &ids::Id,
) -> Vec<(String, String)> {
    let mut files = Vec::new();

    let node_genesis = Path::new(&app.get_node_instance_dir(cloud_id))
        .join(constants::GENESIS_FILE_NAME)
        .display()
        .to_string();
    if Path::new(&node_genesis).exists() {
        files.push((
            node_genesis,
            remote_config_path(&[constants::GENESIS_FILE_NAME]),
        ));
    }

    let subnet_config_path = app.get_subnet_config_path(blockchain_name);
    if Path::new(&subnet_config_path).exists() {
        files.push((
            subnet_config_path,
            remote_config_path(&["subnets", &format!("{}.json", subnet_id)]),
        ));
    }

    if *blockchain_id == ids::Id::empty() {
        return files;
    }
    let chain_dir = blockchain_id.to_string();
    if app.chain_config_exists(blockchain_name) {
        files.push((
            app.get_chain_config_path(blockchain_name),
            remote_config_path(&["chains", &chain_dir, "config.json"]),
        ));
    }
    if app.network_upgrade_exists(blockchain_name) {
        files.push((
            app.get_upgrade_path(blockchain_name),
            remote_config_path(&["chains", &chain_dir, constants::UPGRADE_FILE_NAME]),
        ));
    }
    files
}

/// Merges the extra node flags of the blockchain into the remote node config.
async fn merge_subnet_node_config(
    host: &Host,
    node_config_path: &str,
    timeout: Duration,
) -> io::Result<()> {
    let d = std::fs::read(node_config_path)?;
    let extra: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&d).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("invalid node config {} ({})", node_config_path, e),
            )
        })?;
    let remote_file = remote_config_path(&[constants::REMOTE_NODE_CONFIG_FILE_NAME]);
    let mut m = match download_json(host, &remote_file, timeout).await? {
        Some(serde_json::Value::Object(m)) => m,
        _ => serde_json::Map::new(),
    };
    for (k, v) in extra {
        m.insert(k, v);
    }
    host.upload_bytes(&encode_json(&serde_json::Value::Object(m))?, &remote_file, timeout)
        .await
}

/// Uploads the blockchain files the node needs and merges the
/// subnet node flags into its node config.
pub async fn sync_subnet_data(
    app: &Avalanche,
    host: &Host,
    blockchain_name: &str,
    subnet_id: &ids::Id,
    blockchain_id: &ids::Id,
    timeout: Duration,
) -> io::Result<()> {
    if *subnet_id == ids::Id::empty() {
        return Err(Error::new(ErrorKind::InvalidInput, "subnet id is empty"));
    }

    let node_config_path = app.get_avago_node_config_path(blockchain_name);
    if Path::new(&node_config_path).exists() {
        merge_subnet_node_config(host, &node_config_path, timeout).await?;
    }

    let files = subnet_data_files(
        app,
        &host.get_cloud_id(),
        blockchain_name,
        subnet_id,
        blockchain_id,
    );
    for (local, remote) in files.iter() {
        if let Some(dir) = Path::new(remote).parent() {
            host.mkdir_all(&dir.display().to_string(), timeout).await?;
        }
        log::info!("uploading {} to {}:{}", local, host.node_id, remote);
        host.upload(local, remote, timeout).await.map_err(|e| {
            Error::new(
                e.kind(),
                format!("error uploading {} to {} ({})", local, remote, e),
            )
        })?;
    }
    Ok(())
}

/// Release tarball of a Subnet-EVM version (e.g., "v0.6.0").
pub fn subnet_evm_release_url(version: &str) -> io::Result<String> {
    if version.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "Subnet-EVM version is empty",
        ));
    }
    let v = version.trim_start_matches('v');
    Ok(format!(
        "{}/v{}/subnet-evm_{}_linux_amd64.tar.gz",
        constants::SUBNET_EVM_RELEASE_URL,
        v,
        v
    ))
}

/// Installs the blockchain VM binary into the node plugin dir.
pub async fn prepare_subnet_plugin(host: &Host, sc: &Sidecar, timeout: Duration) -> io::Result<()> {
    let vm_binary_path = Path::new(constants::CLOUD_NODE_PLUGINS_PATH)
        .join(sc.vm_id()?.to_string())
        .display()
        .to_string();
    log::info!("installing {} plugin on {}", sc.vm, host.node_id);
    match &sc.vm {
        VmType::SubnetEvm => {
            let url = subnet_evm_release_url(&sc.vm_version)?;
            let script = artifacts::install_subnet_evm_sh(&url, &vm_binary_path)?;
            host.command(&script, timeout).await.map(|_| ())
        }
        VmType::CustomVm => {
            if sc.custom_vm_path.is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("blockchain {} has no custom VM binary", sc.name),
                ));
            }
            host.mkdir_all(constants::CLOUD_NODE_PLUGINS_PATH, timeout).await?;
            host.upload(&sc.custom_vm_path, &vm_binary_path, timeout).await?;
            host.command(&format!("chmod 755 '{}'", vm_binary_path), timeout)
                .await
                .map(|_| ())
        }
        VmType::Other(vm) => Err(Error::new(
            ErrorKind::InvalidInput,
            format!("unknown vm: {}", vm),
        )),
    }
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::remote::test_merge_aliases --exact --show-output
#[test]
fn test_merge_aliases() {
    let remote = BTreeMap::from([
        (String::from("bc1"), vec![String::from("a"), String::from("b")]),
        (String::from("bc2"), vec![String::from("c")]),
    ]);

    // "b" moves from bc1 to the new blockchain
    let merged = merge_aliases(&remote, "bc3", &[String::from("b"), String::from("d")]);
    assert_eq!(merged.get("bc1").unwrap(), &vec![String::from("a")]);
    assert_eq!(merged.get("bc2").unwrap(), &vec![String::from("c")]);
    assert_eq!(
        merged.get("bc3").unwrap(),
        &vec![String::from("b"), String::from("d")]
    );

    // bc2 loses its only alias and disappears
    let merged = merge_aliases(&remote, "bc3", &[String::from("c")]);
    assert!(merged.get("bc2").is_none());

    assert!(merge_aliases(&BTreeMap::new(), "bc1", &[]).is_empty());
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::remote::test_build_node_config --exact --show-output
#[test]
fn test_build_node_config() {
    let remote: serde_json::Value = serde_json::json!({
        "bootstrap-ids": "NodeID-A",
        "bootstrap-ips": "1.2.3.4:9651",
        "genesis-file": "/home/ubuntu/.avalanchego/configs/genesis.json",
        "log-level": "debug",
        "track-subnets": "old"
    });
    let devnet = Network::devnet("http://1.2.3.4:9650", 1338);
    let m = build_node_config(
        remote.as_object(),
        &devnet,
        &[String::from("s2"), String::from("s1"), String::from("s2")],
        false,
    );
    assert_eq!(m["bootstrap-ids"], "NodeID-A");
    assert_eq!(m["genesis-file"], "/home/ubuntu/.avalanchego/configs/genesis.json");
    assert!(m.get("log-level").is_none());
    assert_eq!(m["track-subnets"], "s1,s2");
    assert_eq!(m["network-id"], "network-1338");
    assert_eq!(m["http-host"], "0.0.0.0");

    let m = build_node_config(None, &Network::fuji(), &[String::from("s1")], false);
    assert_eq!(m["http-host"], "127.0.0.1");
    assert_eq!(m["network-id"], "fuji");
    let m = build_node_config(None, &Network::fuji(), &[], true);
    assert_eq!(m["http-host"], "0.0.0.0");
    assert_eq!(m["track-subnets"], "");
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::remote::test_subnet_evm_release_url --exact --show-output
#[test]
fn test_subnet_evm_release_url() {
    assert_eq!(
        subnet_evm_release_url("v0.6.0").unwrap(),
        "https://github.com/ava-labs/subnet-evm/releases/download/v0.6.0/subnet-evm_0.6.0_linux_amd64.tar.gz"
    );
    assert_eq!(
        subnet_evm_release_url("0.5.11").unwrap(),
        "https://github.com/ava-labs/subnet-evm/releases/download/v0.5.11/subnet-evm_0.5.11_linux_amd64.tar.gz"
    );
    assert!(subnet_evm_release_url("").is_err());
    assert_eq!(remote_config_path(&["chains", "aliases.json"]), "/home/ubuntu/.avalanchego/configs/chains/aliases.json");
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- node::remote::test_subnet_data_files --exact --show-output
#[test]
fn test_subnet_data_files() {
    use crate::netrunner::fake::test_id;

    let tmp_dir = tempfile::tempdir().unwrap();
    let app = Avalanche::new(tmp_dir.path().to_str().unwrap());
    app.setup().unwrap();
    std::fs::create_dir_all(app.get_blockchain_dir("alpha")).unwrap();

    let subnet_id = test_id(1);
    let blockchain_id = test_id(2);
    assert!(subnet_data_files(&app, "i-1", "alpha", &subnet_id, &blockchain_id).is_empty());

    std::fs::write(app.get_chain_config_path("alpha"), b"{}").unwrap();
    std::fs::write(app.get_subnet_config_path("alpha"), b"{}").unwrap();
    std::fs::write(app.get_upgrade_path("alpha"), br#"{"precompileUpgrades":[]}"#).unwrap();
    std::fs::create_dir_all(app.get_node_instance_dir("i-1")).unwrap();
    std::fs::write(
        Path::new(&app.get_node_instance_dir("i-1")).join(constants::GENESIS_FILE_NAME),
        b"{}",
    )
    .unwrap();

    let files = subnet_data_files(&app, "i-1", "alpha", &subnet_id, &blockchain_id);
    let remotes: Vec<String> = files.iter().map(|(_, r)| r.clone()).collect();
    assert_eq!(
        remotes,
        vec![
            "/home/ubuntu/.avalanchego/configs/genesis.json".to_string(),
            format!("/home/ubuntu/.avalanchego/configs/subnets/{}.json", subnet_id),
            format!("/home/ubuntu/.avalanchego/configs/chains/{}/config.json", blockchain_id),
            format!("/home/ubuntu/.avalanchego/configs/chains/{}/upgrade.json", blockchain_id),
        ]
    );
    assert_eq!(files[3].0, app.get_upgrade_path("alpha"));

    // no chain dir without a blockchain ID
    let files = subnet_data_files(&app, "i-2", "alpha", &subnet_id, &ids::Id::empty());
    assert_eq!(files.len(), 1);
    assert!(files[0].1.ends_with(&format!("subnets/{}.json", subnet_id)));
}
