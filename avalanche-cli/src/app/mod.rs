pub mod migrations;

use std::{
    fs,
    io::{self, Error, ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    constants,
    models::{sidecar, ClusterConfig, ClustersConfig, Sidecar, VmType},
};

/// Writes through a temp file in the same directory and renames it over the target,
/// so readers never observe a truncated file.
pub fn write_file_atomic(file_path: &str, data: &[u8]) -> io::Result<()> {
    let path = Path::new(file_path);
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent_dir)?;

    let mut f = tempfile::NamedTempFile::new_in(&parent_dir)?;
    f.write_all(data)?;
    f.flush()?;
    f.persist(path).map_err(|e| {
        Error::new(
            ErrorKind::Other,
            format!("failed to persist '{}' ({})", file_path, e),
        )
    })?;
    Ok(())
}

/// JSON with 4-space indentation.
pub fn encode_json_indented<T: Serialize>(v: &T) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    v.serialize(&mut ser).map_err(|e| {
        Error::new(
            ErrorKind::Other,
            format!("failed to serialize to JSON {}", e),
        )
    })?;
    Ok(buf)
}

/// Handle to the CLI data directory and everything persisted under it.
#[derive(Debug, Clone)]
pub struct Avalanche {
    base_dir: PathBuf,
}

impl Avalanche {
    pub fn new(base_dir: &str) -> Self {
        Self {
            base_dir: PathBuf::from(base_dir),
        }
    }

    /// "$AVALANCHE_CLI_BASE_DIR" if set, "~/.avalanche-cli" otherwise.
    pub fn default_base_dir() -> io::Result<String> {
        if let Ok(d) = std::env::var(constants::BASE_DIR_ENV) {
            if !d.is_empty() {
                return Ok(d);
            }
        }
        match dirs::home_dir() {
            Some(home) => Ok(home.join(constants::BASE_DIR_NAME).display().to_string()),
            None => Err(Error::new(
                ErrorKind::NotFound,
                "failed to find the home directory",
            )),
        }
    }

    /// Creates the directory layout.
    pub fn setup(&self) -> io::Result<()> {
        for d in [
            self.get_base_dir(),
            self.get_subnet_dir(),
            self.get_nodes_dir(),
            self.get_local_dir(),
            self.get_snapshots_dir(),
            self.get_runs_dir(),
            self.get_plugins_dir(),
        ] {
            fs::create_dir_all(&d)?;
        }
        Ok(())
    }

    fn join(&self, parts: &[&str]) -> String {
        let mut p = self.base_dir.clone();
        for part in parts {
            p = p.join(part);
        }
        p.display().to_string()
    }

    pub fn get_base_dir(&self) -> String {
        self.base_dir.display().to_string()
    }
    pub fn get_config_path(&self) -> String {
        self.join(&[constants::CONFIG_FILE_NAME])
    }
    pub fn get_subnet_dir(&self) -> String {
        self.join(&[constants::SUBNET_DIR])
    }
    pub fn get_nodes_dir(&self) -> String {
        self.join(&[constants::NODES_DIR])
    }
    pub fn get_local_dir(&self) -> String {
        self.join(&[constants::LOCAL_DIR])
    }
    pub fn get_snapshots_dir(&self) -> String {
        self.join(&[constants::SNAPSHOTS_DIR])
    }
    pub fn get_runs_dir(&self) -> String {
        self.join(&[constants::RUNS_DIR])
    }
    pub fn get_bin_dir(&self) -> String {
        self.join(&[constants::BIN_DIR])
    }
    /// Plugin dir shared by the default local network.
    pub fn get_plugins_dir(&self) -> String {
        self.join(&[constants::BIN_DIR, "plugins"])
    }
    /// "<runs>/<server_name>.run"
    pub fn get_server_run_file(&self, server_name: &str) -> String {
        self.join(&[constants::RUNS_DIR, &format!("{}.run", server_name)])
    }
    pub fn get_clusters_config_path(&self) -> String {
        self.join(&[constants::NODES_DIR, constants::CLUSTERS_CONFIG_FILE_NAME])
    }
    pub fn get_inventory_dir(&self, cluster_name: &str) -> String {
        self.join(&[constants::NODES_DIR, constants::INVENTORIES_DIR, cluster_name])
    }
    /// Root data dir of a local cluster.
    pub fn get_local_cluster_dir(&self, cluster_name: &str) -> String {
        self.join(&[constants::LOCAL_DIR, cluster_name])
    }
    /// Node-side files of a cloud node (e.g., a custom genesis) keyed by cloud ID.
    pub fn get_node_instance_dir(&self, cloud_id: &str) -> String {
        self.join(&[constants::NODES_DIR, cloud_id])
    }

    pub fn get_blockchain_dir(&self, name: &str) -> String {
        self.join(&[constants::SUBNET_DIR, name])
    }
    pub fn get_sidecar_path(&self, name: &str) -> String {
        self.join(&[constants::SUBNET_DIR, name, constants::SIDECAR_FILE_NAME])
    }
    pub fn get_genesis_path(&self, name: &str) -> String {
        self.join(&[constants::SUBNET_DIR, name, constants::GENESIS_FILE_NAME])
    }
    pub fn get_chain_config_path(&self, name: &str) -> String {
        self.join(&[constants::SUBNET_DIR, name, constants::CHAIN_CONFIG_FILE_NAME])
    }
    pub fn get_subnet_config_path(&self, name: &str) -> String {
        self.join(&[constants::SUBNET_DIR, name, constants::SUBNET_CONFIG_FILE_NAME])
    }
    /// Network upgrades of the blockchain VM.
    pub fn get_upgrade_path(&self, name: &str) -> String {
        self.join(&[constants::SUBNET_DIR, name, constants::UPGRADE_FILE_NAME])
    }
    /// Extra node flags a blockchain needs on the nodes tracking it.
    pub fn get_avago_node_config_path(&self, name: &str) -> String {
        self.join(&[constants::SUBNET_DIR, name, constants::NODE_CONFIG_FILE_NAME])
    }

    pub fn sidecar_exists(&self, name: &str) -> bool {
        Path::new(&self.get_sidecar_path(name)).exists()
    }
    pub fn genesis_exists(&self, name: &str) -> bool {
        Path::new(&self.get_genesis_path(name)).exists()
    }
    pub fn chain_config_exists(&self, name: &str) -> bool {
        Path::new(&self.get_chain_config_path(name)).exists()
    }
    pub fn network_upgrade_exists(&self, name: &str) -> bool {
        Path::new(&self.get_upgrade_path(name)).exists()
    }

    pub fn write_genesis(&self, name: &str, genesis: &[u8]) -> io::Result<()> {
        write_file_atomic(&self.get_genesis_path(name), genesis)
    }

    pub fn load_raw_genesis(&self, name: &str) -> io::Result<Vec<u8>> {
        let p = self.get_genesis_path(name);
        if !Path::new(&p).exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("genesis {} does not exist", p),
            ));
        }
        fs::read(p)
    }

    /// Writes a new sidecar.
    /// Subnet-EVM chain IDs must be unique across the installation.
    pub fn create_sidecar(&self, sc: &mut Sidecar) -> io::Result<()> {
        sidecar::check_blockchain_name(&sc.name)?;
        if sc.token_name.is_empty() {
            sc.token_name = constants::DEFAULT_TOKEN_NAME.to_string();
        }
        if sc.vm == VmType::SubnetEvm && !sc.chain_id.is_empty() {
            let (exists, other) = self.subnet_evm_chain_id_exists(&sc.chain_id)?;
            if exists && other != sc.name {
                return Err(Error::new(
                    ErrorKind::AlreadyExists,
                    format!(
                        "the provided subnet evm chain ID {} is already used by {}",
                        sc.chain_id, other
                    ),
                ));
            }
        }
        fs::create_dir_all(self.get_blockchain_dir(&sc.name))?;
        self.update_sidecar(sc)
    }

    pub fn load_sidecar(&self, name: &str) -> io::Result<Sidecar> {
        let p = self.get_sidecar_path(name);
        log::debug!("loading sidecar from {}", p);

        if !Path::new(&p).exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("blockchain {} does not exist ({} not found)", name, p),
            ));
        }
        let f = fs::File::open(&p)?;
        serde_json::from_reader(f).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("invalid sidecar {} ({})", p, e),
            )
        })
    }

    /// Stamps the current schema version and overwrites the sidecar.
    pub fn update_sidecar(&self, sc: &mut Sidecar) -> io::Result<()> {
        sc.version = constants::SIDECAR_VERSION.to_string();
        let p = self.get_sidecar_path(&sc.name);
        log::info!("syncing sidecar '{}' to '{}'", sc.name, p);
        let d = encode_json_indented(sc)?;
        write_file_atomic(&p, &d)
    }

    /// Names of every blockchain directory holding a sidecar, sorted.
    pub fn get_sidecar_names(&self) -> io::Result<Vec<String>> {
        let subnet_dir = self.get_subnet_dir();
        if !Path::new(&subnet_dir).exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&subnet_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if self.sidecar_exists(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn load_sidecars(&self) -> io::Result<Vec<Sidecar>> {
        self.get_sidecar_names()?
            .iter()
            .map(|n| self.load_sidecar(n))
            .collect()
    }

    /// Returns whether some Subnet-EVM blockchain already uses the chain ID, and its name.
    pub fn subnet_evm_chain_id_exists(&self, chain_id: &str) -> io::Result<(bool, String)> {
        for sc in self.load_sidecars()? {
            if sc.vm == VmType::SubnetEvm && sc.chain_id == chain_id {
                return Ok((true, sc.name));
            }
        }
        Ok((false, String::new()))
    }

    pub fn delete_blockchain(&self, name: &str) -> io::Result<()> {
        sidecar::check_blockchain_name(name)?;
        let d = self.get_blockchain_dir(name);
        if !Path::new(&d).exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("blockchain {} does not exist", name),
            ));
        }
        log::info!("removing blockchain dir '{}'", d);
        fs::remove_dir_all(d)
    }

    /// Missing file yields an empty config.
    pub fn load_clusters_config(&self) -> io::Result<ClustersConfig> {
        let p = self.get_clusters_config_path();
        if !Path::new(&p).exists() {
            return Ok(ClustersConfig {
                version: constants::CLUSTERS_CONFIG_VERSION.to_string(),
                ..Default::default()
            });
        }
        let f = fs::File::open(&p)?;
        serde_json::from_reader(f).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("invalid clusters config {} ({})", p, e),
            )
        })
    }

    pub fn write_clusters_config(&self, cfg: &ClustersConfig) -> io::Result<()> {
        let p = self.get_clusters_config_path();
        log::info!("syncing clusters config to '{}'", p);
        let d = encode_json_indented(cfg)?;
        write_file_atomic(&p, &d)
    }

    pub fn cluster_exists(&self, cluster_name: &str) -> io::Result<bool> {
        Ok(self
            .load_clusters_config()?
            .clusters
            .contains_key(cluster_name))
    }

    pub fn get_cluster_config(&self, cluster_name: &str) -> io::Result<ClusterConfig> {
        match self.load_clusters_config()?.clusters.get(cluster_name) {
            Some(cc) => Ok(cc.clone()),
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("cluster {} not found", cluster_name),
            )),
        }
    }

    pub fn set_cluster_config(&self, cluster_name: &str, cc: ClusterConfig) -> io::Result<()> {
        let mut cfg = self.load_clusters_config()?;
        if cfg.version.is_empty() {
            cfg.version = constants::CLUSTERS_CONFIG_VERSION.to_string();
        }
        cfg.clusters.insert(cluster_name.to_string(), cc);
        self.write_clusters_config(&cfg)
    }

    pub fn remove_cluster_config(&self, cluster_name: &str) -> io::Result<()> {
        let mut cfg = self.load_clusters_config()?;
        if cfg.clusters.remove(cluster_name).is_none() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("cluster {} not found", cluster_name),
            ));
        }
        self.write_clusters_config(&cfg)
    }
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- app::test_sidecar_lifecycle --exact --show-output
#[test]
fn test_sidecar_lifecycle() {
    use std::str::FromStr;

    use avalanche_types::ids;

    use crate::models::NetworkData;

    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    let tmp_dir = tempfile::tempdir().unwrap();
    let app = Avalanche::new(tmp_dir.path().to_str().unwrap());
    app.setup().unwrap();
    assert!(app.get_sidecar_names().unwrap().is_empty());

    let mut sc = Sidecar::new("alpha", VmType::SubnetEvm);
    sc.chain_id = String::from("99999");
    app.create_sidecar(&mut sc).unwrap();
    assert_eq!(sc.token_name, constants::DEFAULT_TOKEN_NAME);
    assert_eq!(sc.version, constants::SIDECAR_VERSION);

    // chain ID reuse by another Subnet-EVM blockchain is rejected
    let mut dup = Sidecar::new("beta", VmType::SubnetEvm);
    dup.chain_id = String::from("99999");
    let err = app.create_sidecar(&mut dup).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let mut custom = Sidecar::new("gamma", VmType::CustomVm);
    custom.chain_id = String::from("99999");
    app.create_sidecar(&mut custom).unwrap();

    let mut loaded = app.load_sidecar("alpha").unwrap();
    assert_eq!(loaded, sc);
    loaded.networks.insert(
        String::from("Local Network"),
        NetworkData {
            subnet_id: ids::Id::from_str("srEXiWaHuhNyGwPUi444Tu47ZEDwxTWrbQiuD7FmgSAQ6X7Dy")
                .unwrap(),
            blockchain_id: ids::Id::from_str("v3m4wPxaHpvGr8qfMeyK6PRW3idZrPHmYcMTt7oXdK47yurVH")
                .unwrap(),
            rpc_endpoints: vec![String::from("http://127.0.0.1:9650/ext/bc/x/rpc")],
            ws_endpoints: Vec::new(),
        },
    );
    app.update_sidecar(&mut loaded).unwrap();
    assert!(app.load_sidecar("alpha").unwrap().is_deployed_to("Local Network"));

    let raw = fs::read_to_string(app.get_sidecar_path("alpha")).unwrap();
    assert!(raw.contains("\n    \"Name\": \"alpha\""));

    assert_eq!(app.get_sidecar_names().unwrap(), vec!["alpha", "gamma"]);

    app.delete_blockchain("gamma").unwrap();
    assert_eq!(app.get_sidecar_names().unwrap(), vec!["alpha"]);
    assert_eq!(
        app.load_sidecar("gamma").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- app::test_clusters_config --exact --show-output
#[test]
fn test_clusters_config() {
    use crate::models::Network;

    let tmp_dir = tempfile::tempdir().unwrap();
    let app = Avalanche::new(tmp_dir.path().to_str().unwrap());

    let cfg = app.load_clusters_config().unwrap();
    assert!(cfg.clusters.is_empty());
    assert!(!app.cluster_exists("c1").unwrap());

    app.set_cluster_config(
        "c1",
        ClusterConfig {
            local: true,
            network: Network::local().with_cluster("c1"),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(app.cluster_exists("c1").unwrap());
    assert!(app.get_cluster_config("c1").unwrap().local);
    assert_eq!(
        app.get_cluster_config("c2").unwrap_err().to_string(),
        "cluster c2 not found"
    );

    app.remove_cluster_config("c1").unwrap();
    assert!(!app.cluster_exists("c1").unwrap());
    assert!(app.remove_cluster_config("c1").is_err());
}
