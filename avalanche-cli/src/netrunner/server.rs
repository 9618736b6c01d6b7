use std::{
    fs::{self, File},
    io::{self, Error, ErrorKind},
    path::Path,
    process::{Command, Stdio},
};

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

use crate::{
    app::{self, Avalanche},
    config::Config,
    constants,
    netrunner::{gateway::Gateway, NetworkRunner},
};

/// Written once the server process is spawned.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct RunFile {
    pub pid: u32,
    pub grpc_port: u16,
    pub gateway_port: u16,
}

impl RunFile {
    pub fn load(file_path: &str) -> io::Result<Option<Self>> {
        if !Path::new(file_path).exists() {
            return Ok(None);
        }
        let d = fs::read(file_path)?;
        let rf: RunFile = serde_json::from_slice(&d).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("invalid run file {} ({})", file_path, e),
            )
        })?;
        Ok(Some(rf))
    }

    pub fn sync(&self, file_path: &str) -> io::Result<()> {
        let d = app::encode_json_indented(self)?;
        app::write_file_atomic(file_path, &d)
    }
}

/// Manages the local avalanche-network-runner server process.
#[derive(Debug, Clone)]
pub struct Server {
    bin: String,
    grpc_port: u16,
    gateway_endpoint: String,
    snapshots_dir: String,
    run_file_path: String,
    log_path: String,
}

impl Server {
    /// Server of the default local network.
    pub fn new(app: &Avalanche, cfg: &Config) -> Self {
        Self::with_endpoint(
            app,
            cfg,
            constants::SERVER_NAME,
            cfg.grpc_port,
            &cfg.gateway_endpoint,
        )
    }

    /// Server of local clusters.
    pub fn for_local_cluster(app: &Avalanche, cfg: &Config) -> Self {
        Self::with_endpoint(
            app,
            cfg,
            constants::LOCAL_CLUSTER_SERVER_NAME,
            constants::LOCAL_CLUSTER_GRPC_PORT,
            constants::LOCAL_CLUSTER_GATEWAY_ENDPOINT,
        )
    }

    fn with_endpoint(
        app: &Avalanche,
        cfg: &Config,
        name: &str,
        grpc_port: u16,
        gateway_endpoint: &str,
    ) -> Self {
        Self {
            bin: cfg.network_runner_bin(),
            grpc_port,
            gateway_endpoint: gateway_endpoint.to_string(),
            snapshots_dir: app.get_snapshots_dir(),
            run_file_path: app.get_server_run_file(name),
            log_path: Path::new(&app.get_runs_dir())
                .join(format!("{}.log", name))
                .display()
                .to_string(),
        }
    }

    pub fn gateway(&self) -> io::Result<Gateway> {
        Gateway::new(&self.gateway_endpoint)
    }

    fn gateway_port(&self) -> io::Result<u16> {
        let u = reqwest::Url::parse(&self.gateway_endpoint).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("invalid gateway endpoint {} ({})", self.gateway_endpoint, e),
            )
        })?;
        Ok(u.port_or_known_default()
            .unwrap_or(constants::DEFAULT_GATEWAY_PORT))
    }

    pub async fn is_running(&self) -> bool {
        match self.gateway() {
            Ok(gw) => gw.ping().await.is_ok(),
            Err(_) => false,
        }
    }

    /// Starts the server unless one already answers, then waits until it does.
    pub async fn start(&self) -> io::Result<Gateway> {
        let gw = self.gateway()?;
        if gw.ping().await.is_ok() {
            log::info!("network-runner server already running at {}", self.gateway_endpoint);
            return Ok(gw);
        }

        let gateway_port = self.gateway_port()?;
        if let Some(parent) = Path::new(&self.log_path).parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&self.snapshots_dir)?;
        let log_file = File::create(&self.log_path)?;
        let err_file = log_file.try_clone()?;

        log::info!(
            "starting '{}' server (grpc :{}, gateway :{}), logs in {}",
            self.bin,
            self.grpc_port,
            gateway_port,
            self.log_path
        );
        let child = Command::new(&self.bin)
            .arg("server")
            .arg(format!("--port=:{}", self.grpc_port))
            .arg(format!("--grpc-gateway-port=:{}", gateway_port))
            .arg("--log-level=info")
            .arg(format!("--snapshots-dir={}", self.snapshots_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(err_file))
            .spawn()
            .map_err(|e| {
                Error::new(
                    ErrorKind::Other,
                    format!("failed to start '{}' ({})", self.bin, e),
                )
            })?;

        RunFile {
            pid: child.id(),
            grpc_port: self.grpc_port,
            gateway_port,
        }
        .sync(&self.run_file_path)?;

        let deadline = Instant::now() + constants::SERVER_START_TIMEOUT;
        loop {
            if gw.ping().await.is_ok() {
                log::info!("network-runner server is up (pid {})", child.id());
                return Ok(gw);
            }
            if Instant::now() > deadline {
                return Err(Error::new(
                    ErrorKind::TimedOut,
                    format!(
                        "network-runner server not ready after {:?}, see {}",
                        constants::SERVER_START_TIMEOUT,
                        self.log_path
                    ),
                ));
            }
            sleep(constants::HEALTH_CHECK_INTERVAL * 5).await;
        }
    }

    /// Kills the server recorded in the run file.
    /// No-op if none was started.
    pub fn stop(&self) -> io::Result<()> {
        let rf = match RunFile::load(&self.run_file_path)? {
            Some(rf) => rf,
            None => {
                log::info!("no network-runner server run file found");
                return Ok(());
            }
        };
        log::info!("stopping network-runner server (pid {})", rf.pid);
        match command_manager::run(&format!("kill {}", rf.pid)) {
            Ok(_) => {}
            Err(e) => log::warn!("failed to kill pid {} ({}), assuming it exited", rf.pid, e),
        }
        fs::remove_file(&self.run_file_path)
    }
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- netrunner::server::test_run_file --exact --show-output
#[test]
fn test_run_file() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let app = Avalanche::new(tmp_dir.path().to_str().unwrap());
    app.setup().unwrap();

    let p = app.get_server_run_file(constants::SERVER_NAME);
    assert!(RunFile::load(&p).unwrap().is_none());

    let rf = RunFile {
        pid: 4321,
        grpc_port: 8080,
        gateway_port: 8081,
    };
    rf.sync(&p).unwrap();
    assert_eq!(RunFile::load(&p).unwrap(), Some(rf));

    let server = Server::new(&app, &Config::default());
    assert_eq!(server.gateway_port().unwrap(), 8081);
    assert_eq!(server.gateway().unwrap().endpoint(), constants::DEFAULT_GATEWAY_ENDPOINT);

    let local = Server::for_local_cluster(&app, &Config::default());
    assert_eq!(local.gateway_port().unwrap(), 8091);
    assert!(local.run_file_path.ends_with("server-local-cluster.run"));
}
