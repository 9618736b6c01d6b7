use std::{
    fs::{self, File},
    io::{self, Error, ErrorKind, Write},
    path::Path,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::constants;

/// CLI configuration, persisted as YAML in the data directory.
/// Every field is optional on disk.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Path of the "avalanche-network-runner" binary.
    /// Looked up in PATH if empty.
    #[serde(default)]
    pub network_runner_path: String,
    /// AvalancheGo binary used by local networks.
    #[serde(default)]
    pub avalanchego_path: String,
    /// Subnet-EVM binary installed as the plugin of Subnet-EVM blockchains.
    #[serde(default)]
    pub subnet_evm_path: String,

    /// HTTP gateway of the network-runner server.
    #[serde(default = "default_gateway_endpoint")]
    pub gateway_endpoint: String,
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,

    #[serde(default = "default_snapshot_archive_url")]
    pub snapshot_archive_url: String,

    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
    #[serde(default = "default_health_check_timeout_seconds")]
    pub health_check_timeout_seconds: u64,

    #[serde(default = "default_ssh_timeout_seconds")]
    pub ssh_timeout_seconds: u64,
    #[serde(default = "default_ssh_long_running_timeout_seconds")]
    pub ssh_long_running_timeout_seconds: u64,
}

fn default_gateway_endpoint() -> String {
    constants::DEFAULT_GATEWAY_ENDPOINT.to_string()
}
fn default_grpc_port() -> u16 {
    constants::DEFAULT_GRPC_PORT
}
fn default_snapshot_archive_url() -> String {
    constants::DEFAULT_SNAPSHOT_ARCHIVE_URL.to_string()
}
fn default_health_check_interval_ms() -> u64 {
    constants::HEALTH_CHECK_INTERVAL.as_millis() as u64
}
fn default_health_check_timeout_seconds() -> u64 {
    constants::HEALTH_CHECK_TIMEOUT.as_secs()
}
fn default_ssh_timeout_seconds() -> u64 {
    constants::SSH_SCRIPT_TIMEOUT.as_secs()
}
fn default_ssh_long_running_timeout_seconds() -> u64 {
    constants::SSH_LONG_RUNNING_SCRIPT_TIMEOUT.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_runner_path: String::new(),
            avalanchego_path: String::new(),
            subnet_evm_path: String::new(),
            gateway_endpoint: default_gateway_endpoint(),
            grpc_port: default_grpc_port(),
            snapshot_archive_url: default_snapshot_archive_url(),
            health_check_interval_ms: default_health_check_interval_ms(),
            health_check_timeout_seconds: default_health_check_timeout_seconds(),
            ssh_timeout_seconds: default_ssh_timeout_seconds(),
            ssh_long_running_timeout_seconds: default_ssh_long_running_timeout_seconds(),
        }
    }
}

impl Config {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_seconds)
    }
    pub fn ssh_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_timeout_seconds)
    }
    pub fn ssh_long_running_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_long_running_timeout_seconds)
    }

    /// "avalanche-network-runner" from PATH if unset.
    pub fn network_runner_bin(&self) -> String {
        if self.network_runner_path.is_empty() {
            return String::from("avalanche-network-runner");
        }
        self.network_runner_path.clone()
    }

    pub fn encode_yaml(&self) -> io::Result<String> {
        serde_yaml::to_string(&self).map_err(|e| {
            Error::new(
                ErrorKind::Other,
                format!("failed to serialize Config to YAML {}", e),
            )
        })
    }

    /// Saves the current config to disk
    /// and overwrites the file.
    pub fn sync(&self, file_path: &str) -> io::Result<()> {
        log::info!("syncing Config to '{}'", file_path);

        let path = Path::new(file_path);
        if let Some(parent_dir) = path.parent() {
            fs::create_dir_all(parent_dir)?;
        }

        let d = self.encode_yaml()?;
        let mut f = File::create(file_path)?;
        f.write_all(d.as_bytes())
    }

    pub fn load(file_path: &str) -> io::Result<Self> {
        log::info!("loading Config from {}", file_path);

        if !Path::new(file_path).exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("file {} does not exists", file_path),
            ));
        }

        let f = File::open(file_path).map_err(|e| {
            Error::new(
                ErrorKind::Other,
                format!("failed to open {} ({})", file_path, e),
            )
        })?;
        let cfg: Config = serde_yaml::from_reader(f)
            .map_err(|e| Error::new(ErrorKind::InvalidInput, format!("invalid YAML: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads the config, falling back to defaults if the file does not exist.
    pub fn load_or_default(file_path: &str) -> io::Result<Self> {
        match Self::load(file_path) {
            Ok(c) => Ok(c),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("no config found at {}, using defaults", file_path);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn validate(&self) -> io::Result<()> {
        if !self.gateway_endpoint.starts_with("http://")
            && !self.gateway_endpoint.starts_with("https://")
        {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("invalid 'gateway_endpoint' {}", self.gateway_endpoint),
            ));
        }
        if self.health_check_interval_ms == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "'health_check_interval_ms' must be >0",
            ));
        }
        if self.health_check_timeout_seconds == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "'health_check_timeout_seconds' must be >0",
            ));
        }
        Ok(())
    }
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- config::test_config --exact --show-output
#[test]
fn test_config() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    let d = r#"
avalanchego_path: /opt/avalanchego
health_check_interval_ms: 250
"#;
    let tmp_dir = tempfile::tempdir().unwrap();
    let p = tmp_dir.path().join("config.yaml");
    fs::write(&p, d).unwrap();
    let p = p.to_str().unwrap();

    let cfg = Config::load(p).unwrap();
    assert_eq!(cfg.avalanchego_path, "/opt/avalanchego");
    assert_eq!(cfg.health_check_interval(), Duration::from_millis(250));
    assert_eq!(cfg.gateway_endpoint, constants::DEFAULT_GATEWAY_ENDPOINT);
    assert_eq!(cfg.network_runner_bin(), "avalanche-network-runner");

    cfg.sync(p).unwrap();
    assert_eq!(Config::load(p).unwrap(), cfg);

    let missing = tmp_dir.path().join("none.yaml");
    let cfg = Config::load_or_default(missing.to_str().unwrap()).unwrap();
    assert_eq!(cfg, Config::default());

    let bad = tmp_dir.path().join("bad.yaml");
    fs::write(&bad, "gateway_endpoint: localhost:8081\n").unwrap();
    assert!(Config::load(bad.to_str().unwrap()).is_err());
}
