use std::{
    fs,
    io::{self, Error, ErrorKind},
    path::Path,
    str::FromStr,
    time::Duration,
};

use avalanche_types::ids;
use reqwest::ClientBuilder;

use crate::{
    app::Avalanche,
    config::Config,
    constants,
    netrunner::{self, BlockchainSpec, ClusterInfo, LoadSnapshotRequest, NetworkRunner},
    subnet::{self, DeployInfo},
};

/// Deploys blockchains to the default local network.
pub struct LocalDeployer<'a, R: NetworkRunner> {
    app: &'a Avalanche,
    runner: &'a R,
    avalanchego_path: String,
    snapshot_archive_url: String,
    health_check_interval: Duration,
    health_check_timeout: Duration,
}

impl<'a, R: NetworkRunner> LocalDeployer<'a, R> {
    pub fn new(app: &'a Avalanche, runner: &'a R, cfg: &Config) -> Self {
        Self {
            app,
            runner,
            avalanchego_path: cfg.avalanchego_path.clone(),
            snapshot_archive_url: cfg.snapshot_archive_url.clone(),
            health_check_interval: cfg.health_check_interval(),
            health_check_timeout: cfg.health_check_timeout(),
        }
    }

    /// Makes sure the default snapshot, the plugin dir and the AvalancheGo binary exist.
    /// Returns the binary path and the plugin dir.
    pub async fn setup_local_env(&self) -> io::Result<(String, String)> {
        set_default_snapshot(
            &self.app.get_snapshots_dir(),
            &self.snapshot_archive_url,
            false,
        )
        .await
        .map_err(|e| {
            Error::new(
                e.kind(),
                format!("failed setting up snapshots: {}", e),
            )
        })?;

        let plugin_dir = self.app.get_plugins_dir();
        fs::create_dir_all(&plugin_dir)?;

        if self.avalanchego_path.is_empty() || !Path::new(&self.avalanchego_path).exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!(
                    "evaluated avalanchego path to be '{}' but it does not exist",
                    self.avalanchego_path
                ),
            ));
        }
        Ok((self.avalanchego_path.clone(), plugin_dir))
    }

    pub async fn wait_for_healthy(&self) -> io::Result<ClusterInfo> {
        netrunner::wait_for_healthy(
            self.runner,
            self.health_check_interval,
            self.health_check_timeout,
        )
        .await
    }

    /// Creates the blockchain on the local network, booting the network from
    /// the default snapshot if nothing runs.
    /// Returns None if a blockchain of the same VM is already deployed.
    pub async fn deploy_to_local_network(
        &self,
        chain: &str,
        genesis_path: &str,
        vm_bin: &str,
    ) -> io::Result<Option<DeployInfo>> {
        let (avalanchego_path, plugin_dir) = self.setup_local_env().await?;

        let mut network_booted = true;
        let cluster_info = match self.wait_for_healthy().await {
            Ok(info) => Some(info),
            Err(e) if netrunner::is_not_bootstrapped(&e) => {
                network_booted = false;
                None
            }
            Err(e) => {
                return Err(Error::new(
                    e.kind(),
                    format!("failed to query network health: {}", e),
                ))
            }
        };

        let vm_id = avalanche_types::subnet::vm_name_to_id(chain)?;
        log::debug!("VM of {} gets ID {}", chain, vm_id);

        if let Some(info) = &cluster_info {
            if info.find_blockchain_by_vm_id(&vm_id.to_string()).is_some() {
                log::info!("blockchain {} has already been deployed", chain);
                return Ok(None);
            }
        }

        subnet::install_plugin(&vm_id, vm_bin, &plugin_dir)?;

        if !network_booted {
            log::info!("starting network from snapshot {}", constants::DEFAULT_SNAPSHOT_NAME);
            self.runner
                .load_snapshot(LoadSnapshotRequest {
                    snapshot_name: constants::DEFAULT_SNAPSHOT_NAME.to_string(),
                    exec_path: avalanchego_path,
                    plugin_dir: plugin_dir.clone(),
                    root_data_dir: self.app.get_runs_dir(),
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    Error::new(e.kind(), format!("failed to start network: {}", e))
                })?;
        }

        let info = self.wait_for_healthy().await?;
        let subnet_id = pick_subnet_id(&info)?;

        self.runner
            .create_blockchains(vec![BlockchainSpec {
                vm_name: chain.to_string(),
                genesis: genesis_path.to_string(),
                subnet_id: Some(subnet_id.clone()),
                ..Default::default()
            }])
            .await
            .map_err(|e| {
                Error::new(e.kind(), format!("failed to deploy blockchain: {}", e))
            })?;
        log::info!("blockchain has been deployed, waiting until network acknowledges...");

        let info = self.wait_for_healthy().await?;
        let (blockchain_id, _) = info
            .find_blockchain_by_vm_id(&vm_id.to_string())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Other,
                    format!("blockchain of VM {} not found after deploy", vm_id),
                )
            })?;

        Ok(Some(DeployInfo {
            subnet_id: parse_id(&subnet_id)?,
            blockchain_id: parse_id(&blockchain_id)?,
            rpc_endpoints: info
                .uris()
                .iter()
                .map(|u| subnet::rpc_endpoint(u, &blockchain_id))
                .collect(),
        }))
    }
}

/// Preloaded subnets are used round-robin by the number of existing blockchains.
pub fn pick_subnet_id(info: &ClusterInfo) -> io::Result<String> {
    let subnet_ids = info.subnet_ids();
    if subnet_ids.is_empty() {
        return Err(Error::new(
            ErrorKind::Other,
            "the network has not preloaded subnet IDs",
        ));
    }
    Ok(subnet_ids[info.custom_chains.len() % subnet_ids.len()].clone())
}

fn parse_id(s: &str) -> io::Result<ids::Id> {
    ids::Id::from_str(s).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("invalid ID {} ({})", s, e),
        )
    })
}

/// Downloads the bootstrap snapshot archive if missing and extracts it
/// into the default snapshot. "force" re-extracts an existing snapshot.
pub async fn set_default_snapshot(
    snapshots_dir: &str,
    archive_url: &str,
    force: bool,
) -> io::Result<()> {
    fs::create_dir_all(snapshots_dir)?;
    let archive_path = Path::new(snapshots_dir).join(constants::BOOTSTRAP_SNAPSHOT_ARCHIVE_NAME);

    if !archive_path.exists() {
        log::info!("downloading bootstrap snapshot from {}", archive_url);
        let cli = ClientBuilder::new()
            .user_agent(env!("CARGO_PKG_NAME"))
            .timeout(constants::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::new(
                    ErrorKind::Other,
                    format!("failed ClientBuilder build {}", e),
                )
            })?;
        let resp = cli.get(archive_url).send().await.map_err(|e| {
            Error::new(
                ErrorKind::Other,
                format!("failed downloading bootstrap snapshot: {}", e),
            )
        })?;
        if !resp.status().is_success() {
            return Err(Error::new(
                ErrorKind::Other,
                format!(
                    "failed downloading bootstrap snapshot: unexpected http status code: {}",
                    resp.status().as_u16()
                ),
            ));
        }
        let b = resp.bytes().await.map_err(|e| {
            Error::new(
                ErrorKind::Other,
                format!("failed downloading bootstrap snapshot: {}", e),
            )
        })?;
        crate::app::write_file_atomic(&archive_path.display().to_string(), &b)?;
    }

    let snapshot_path = default_snapshot_path(snapshots_dir);
    if force && Path::new(&snapshot_path).exists() {
        log::info!("removing default snapshot '{}'", snapshot_path);
        fs::remove_dir_all(&snapshot_path)?;
    }
    if !Path::new(&snapshot_path).exists() {
        log::info!("installing bootstrap snapshot to '{}'", snapshots_dir);
        compress_manager::unpack_directory(
            &archive_path.display().to_string(),
            snapshots_dir,
            compress_manager::DirDecoder::TarGzip,
        )
        .map_err(|e| {
            Error::new(
                e.kind(),
                format!("failed installing bootstrap snapshot: {}", e),
            )
        })?;
    }
    Ok(())
}

pub fn default_snapshot_path(snapshots_dir: &str) -> String {
    Path::new(snapshots_dir)
        .join(format!(
            "{}{}",
            constants::SNAPSHOT_PREFIX,
            constants::DEFAULT_SNAPSHOT_NAME
        ))
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netrunner::fake::FakeRunner;

    fn setup() -> (tempfile::TempDir, Avalanche, Config, String) {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Info)
            .is_test(true)
            .try_init();

        let tmp_dir = tempfile::tempdir().unwrap();
        let app = Avalanche::new(tmp_dir.path().join("base").to_str().unwrap());
        app.setup().unwrap();

        // snapshot already installed, nothing gets downloaded
        let snapshots_dir = app.get_snapshots_dir();
        fs::write(
            Path::new(&snapshots_dir).join(constants::BOOTSTRAP_SNAPSHOT_ARCHIVE_NAME),
            b"bogus",
        )
        .unwrap();
        fs::create_dir_all(default_snapshot_path(&snapshots_dir)).unwrap();

        let avalanchego = tmp_dir.path().join("avalanchego");
        fs::write(&avalanchego, b"bin").unwrap();
        let vm_bin = tmp_dir.path().join("subnet-evm");
        fs::write(&vm_bin, b"vm").unwrap();

        let cfg = Config {
            avalanchego_path: avalanchego.display().to_string(),
            health_check_interval_ms: 1,
            health_check_timeout_seconds: 5,
            ..Default::default()
        };
        (tmp_dir, app, cfg, vm_bin.display().to_string())
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- subnet::local::tests::test_deploy_boots_network --exact --show-output
    #[tokio::test]
    async fn test_deploy_boots_network() {
        let (_tmp, app, cfg, vm_bin) = setup();
        let runner = FakeRunner::new(2);
        let deployer = LocalDeployer::new(&app, &runner, &cfg);

        let info = deployer
            .deploy_to_local_network("alpha", "/tmp/genesis.json", &vm_bin)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.rpc_endpoints.len(), 5);
        assert!(info.rpc_endpoints[0].starts_with("http://127.0.0.1:9650/ext/bc/"));
        assert!(info.rpc_endpoints[0].ends_with(&format!("{}/rpc", info.blockchain_id)));

        let st = runner.state.lock().unwrap();
        let loaded = st.loaded.as_ref().unwrap();
        assert_eq!(loaded.snapshot_name, constants::DEFAULT_SNAPSHOT_NAME);
        assert_eq!(loaded.exec_path, cfg.avalanchego_path);
        assert_eq!(st.created.len(), 1);
        assert_eq!(st.created[0].vm_name, "alpha");
        assert_eq!(st.created[0].genesis, "/tmp/genesis.json");
        // first blockchain takes the first sorted preloaded subnet
        let mut subnets: Vec<String> = st.info.as_ref().unwrap().subnets.keys().cloned().collect();
        subnets.sort();
        assert_eq!(st.created[0].subnet_id.as_deref(), Some(subnets[0].as_str()));
        assert_eq!(info.subnet_id.to_string(), subnets[0]);

        let vm_id = avalanche_types::subnet::vm_name_to_id("alpha").unwrap();
        assert!(Path::new(&app.get_plugins_dir())
            .join(vm_id.to_string())
            .exists());
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- subnet::local::tests::test_deploy_round_robin_and_already_deployed --exact --show-output
    #[tokio::test]
    async fn test_deploy_round_robin_and_already_deployed() {
        let (_tmp, app, cfg, vm_bin) = setup();
        let runner = FakeRunner::running(5, 2, &app.get_runs_dir());
        let deployer = LocalDeployer::new(&app, &runner, &cfg);

        let first = deployer
            .deploy_to_local_network("alpha", "/tmp/a.json", &vm_bin)
            .await
            .unwrap()
            .unwrap();
        let second = deployer
            .deploy_to_local_network("beta", "/tmp/b.json", &vm_bin)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(first.subnet_id, second.subnet_id);
        assert_ne!(first.blockchain_id, second.blockchain_id);

        // network was already running
        assert!(!runner.calls().iter().any(|c| c == "load_snapshot"));

        assert!(deployer
            .deploy_to_local_network("alpha", "/tmp/a.json", &vm_bin)
            .await
            .unwrap()
            .is_none());
        assert_eq!(runner.state.lock().unwrap().created.len(), 2);
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- subnet::local::tests::test_deploy_without_preloaded_subnets --exact --show-output
    #[tokio::test]
    async fn test_deploy_without_preloaded_subnets() {
        let (_tmp, app, cfg, vm_bin) = setup();
        let runner = FakeRunner::running(5, 0, &app.get_runs_dir());
        let deployer = LocalDeployer::new(&app, &runner, &cfg);

        let err = deployer
            .deploy_to_local_network("alpha", "/tmp/a.json", &vm_bin)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "the network has not preloaded subnet IDs");
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- subnet::local::tests::test_missing_avalanchego --exact --show-output
    #[tokio::test]
    async fn test_missing_avalanchego() {
        let (_tmp, app, mut cfg, vm_bin) = setup();
        cfg.avalanchego_path = String::from("/no/such/avalanchego");
        let runner = FakeRunner::new(2);
        let deployer = LocalDeployer::new(&app, &runner, &cfg);

        let err = deployer
            .deploy_to_local_network("alpha", "/tmp/a.json", &vm_bin)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(runner.calls().is_empty());
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- subnet::local::tests::test_force_default_snapshot --exact --show-output
    #[tokio::test]
    async fn test_force_default_snapshot() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let snapshots_dir = tmp_dir.path().to_str().unwrap();
        fs::write(
            tmp_dir.path().join(constants::BOOTSTRAP_SNAPSHOT_ARCHIVE_NAME),
            b"not a tarball",
        )
        .unwrap();

        let snapshot_path = default_snapshot_path(snapshots_dir);
        fs::create_dir_all(&snapshot_path).unwrap();
        fs::write(Path::new(&snapshot_path).join("state.txt"), b"stale").unwrap();

        // existing snapshot is kept, the archive is not touched
        set_default_snapshot(snapshots_dir, "http://127.0.0.1:1/none", false)
            .await
            .unwrap();
        assert_eq!(
            fs::read(Path::new(&snapshot_path).join("state.txt")).unwrap(),
            b"stale"
        );

        // forced: removed, then re-extracted from the (broken) archive
        let err = set_default_snapshot(snapshots_dir, "http://127.0.0.1:1/none", true)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("failed installing bootstrap snapshot"));
        assert!(!Path::new(&snapshot_path).join("state.txt").exists());
    }
}
