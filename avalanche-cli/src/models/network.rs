use std::{
    fmt,
    io::{self, Error, ErrorKind},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::constants;

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    #[default]
    Undefined,
    Mainnet,
    Fuji,
    Local,
    Devnet,
}

/// ref. https://doc.rust-lang.org/std/fmt/trait.Display.html
impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NetworkKind::Undefined => write!(f, "Undefined"),
            NetworkKind::Mainnet => write!(f, "Mainnet"),
            NetworkKind::Fuji => write!(f, "Fuji"),
            NetworkKind::Local => write!(f, "Local Network"),
            NetworkKind::Devnet => write!(f, "Devnet"),
        }
    }
}

/// Network a blockchain or a cluster is bound to.
/// Its name keys the per-network deployment data of every sidecar.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct Network {
    pub kind: NetworkKind,
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub endpoint: String,
    /// Non-empty when the network is the one run by a named cluster.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
}

impl Network {
    pub fn new(kind: NetworkKind, id: u32, endpoint: &str) -> Self {
        Self {
            kind,
            id,
            endpoint: endpoint.to_string(),
            cluster_name: String::new(),
        }
    }

    pub fn local() -> Self {
        Self::new(
            NetworkKind::Local,
            constants::LOCAL_NETWORK_ID,
            constants::LOCAL_API_ENDPOINT,
        )
    }

    pub fn fuji() -> Self {
        Self::new(
            NetworkKind::Fuji,
            constants::FUJI_NETWORK_ID,
            constants::FUJI_API_ENDPOINT,
        )
    }

    pub fn mainnet() -> Self {
        Self::new(
            NetworkKind::Mainnet,
            constants::MAINNET_NETWORK_ID,
            constants::MAINNET_API_ENDPOINT,
        )
    }

    pub fn devnet(endpoint: &str, id: u32) -> Self {
        Self::new(NetworkKind::Devnet, id, endpoint)
    }

    /// Binds the network to a cluster, which changes its name.
    pub fn with_cluster(mut self, cluster_name: &str) -> Self {
        self.cluster_name = cluster_name.to_string();
        self
    }

    /// Parses the network names accepted on the command line.
    pub fn from_flag(s: &str) -> io::Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::local()),
            "fuji" | "testnet" => Ok(Self::fuji()),
            "mainnet" => Ok(Self::mainnet()),
            _ => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("unknown network {}", s),
            )),
        }
    }

    pub fn name(&self) -> String {
        if !self.cluster_name.is_empty() {
            return format!("Cluster {}", self.cluster_name);
        }
        self.kind.to_string()
    }

    /// Value for the node's "network-id" flag.
    pub fn network_id_flag_value(&self) -> String {
        match self.kind {
            NetworkKind::Local => format!("network-{}", constants::LOCAL_NETWORK_ID),
            NetworkKind::Devnet | NetworkKind::Undefined => format!("network-{}", self.id),
            NetworkKind::Fuji => String::from("fuji"),
            NetworkKind::Mainnet => String::from("mainnet"),
        }
    }

    pub fn bootstrap_timeout(&self) -> Duration {
        match self.kind {
            NetworkKind::Local | NetworkKind::Undefined => Duration::from_secs(2 * 60),
            NetworkKind::Devnet => Duration::from_secs(10 * 60),
            NetworkKind::Fuji | NetworkKind::Mainnet => Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- models::network::test_network_name --exact --show-output
#[test]
fn test_network_name() {
    assert_eq!(Network::local().name(), "Local Network");
    assert_eq!(Network::fuji().name(), "Fuji");
    assert_eq!(Network::mainnet().name(), "Mainnet");
    assert_eq!(Network::local().with_cluster("abc").name(), "Cluster abc");

    assert_eq!(Network::local().network_id_flag_value(), "network-1337");
    assert_eq!(
        Network::devnet("http://1.2.3.4:9650", 1338).network_id_flag_value(),
        "network-1338"
    );
    assert_eq!(Network::fuji().network_id_flag_value(), "fuji");

    assert_eq!(Network::from_flag("Fuji").unwrap(), Network::fuji());
    assert!(Network::from_flag("nope").is_err());
}
