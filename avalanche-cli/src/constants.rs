use std::time::Duration;

pub const BASE_DIR_NAME: &str = ".avalanche-cli";
pub const BASE_DIR_ENV: &str = "AVALANCHE_CLI_BASE_DIR";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

pub const SUBNET_DIR: &str = "subnets";
pub const NODES_DIR: &str = "nodes";
pub const LOCAL_DIR: &str = "local";
pub const SNAPSHOTS_DIR: &str = "snapshots";
pub const RUNS_DIR: &str = "runs";
pub const BIN_DIR: &str = "bin";
pub const INVENTORIES_DIR: &str = "inventories";

pub const SIDECAR_FILE_NAME: &str = "sidecar.json";
pub const GENESIS_FILE_NAME: &str = "genesis.json";
pub const CHAIN_CONFIG_FILE_NAME: &str = "chain.json";
pub const SUBNET_CONFIG_FILE_NAME: &str = "subnet.json";
pub const NODE_CONFIG_FILE_NAME: &str = "node-config.json";
pub const UPGRADE_FILE_NAME: &str = "upgrade.json";
pub const ALIASES_FILE_NAME: &str = "aliases.json";
pub const CLUSTERS_CONFIG_FILE_NAME: &str = "cluster_config.json";
pub const HOSTS_FILE_NAME: &str = "hosts";
pub const SERVER_NAME: &str = "server";

/// Written into a local cluster root once the network is up.
/// Its presence means the root holds a restorable in-place snapshot.
pub const LOCAL_STATE_FILE_NAME: &str = "state.json";
/// Network description exported by a local network directory,
/// used to clone its genesis and bootstrappers.
pub const LOCAL_NETWORK_FILE_NAME: &str = "network.json";

pub const STAKER_KEY_FILE_NAME: &str = "staker.key";
pub const STAKER_CERT_FILE_NAME: &str = "staker.crt";
pub const BLS_KEY_FILE_NAME: &str = "signer.key";

/// Sidecar suffix used before sidecars moved under "subnets/<name>/".
pub const LEGACY_SIDECAR_SUFFIX: &str = "_sidecar.json";
pub const LEGACY_GENESIS_SUFFIX: &str = "_genesis.json";

pub const SIDECAR_VERSION: &str = "1.4.0";
pub const CLUSTERS_CONFIG_VERSION: &str = "1";

pub const DEFAULT_SNAPSHOT_NAME: &str = "default-1337";
pub const SNAPSHOT_PREFIX: &str = "anr-snapshot-";
pub const BOOTSTRAP_SNAPSHOT_ARCHIVE_NAME: &str = "bootstrapSnapshot.tar.gz";
pub const DEFAULT_SNAPSHOT_ARCHIVE_URL: &str =
    "https://github.com/ava-labs/avalanche-cli/raw/main/assets/bootstrapSnapshot.tar.gz";

pub const DEFAULT_GATEWAY_ENDPOINT: &str = "http://127.0.0.1:8081";
pub const DEFAULT_GRPC_PORT: u16 = 8080;
pub const DEFAULT_GATEWAY_PORT: u16 = 8081;
/// Local clusters run under their own network-runner server.
pub const LOCAL_CLUSTER_GRPC_PORT: u16 = 8090;
pub const LOCAL_CLUSTER_GATEWAY_ENDPOINT: &str = "http://127.0.0.1:8091";
pub const LOCAL_CLUSTER_SERVER_NAME: &str = "server-local-cluster";

pub const LOCAL_API_ENDPOINT: &str = "http://127.0.0.1:9650";
pub const AVALANCHEGO_API_PORT: u16 = 9650;
pub const AVALANCHEGO_P2P_PORT: u16 = 9651;
pub const SSH_PORT: u16 = 22;

pub const LOCAL_NETWORK_ID: u32 = 1337;
pub const FUJI_NETWORK_ID: u32 = 5;
pub const MAINNET_NETWORK_ID: u32 = 1;
pub const FUJI_API_ENDPOINT: &str = "https://api.avax-test.network";
pub const MAINNET_API_ENDPOINT: &str = "https://api.avax.network";

pub const LOCAL_NETWORK_NUM_NODES: u32 = 5;
pub const DEFAULT_NUM_LOCAL_NODES: u32 = 1;

pub const DEFAULT_TOKEN_NAME: &str = "TEST";
pub const ANSIBLE_SSH_USER: &str = "ubuntu";
pub const ANSIBLE_SSH_SHELL_PARAMS: &str = "-o IdentitiesOnly=yes -o StrictHostKeyChecking=no";

pub const AWS_NODE_ANSIBLE_PREFIX: &str = "aws_node";
pub const GCP_NODE_ANSIBLE_PREFIX: &str = "gcp_node";
pub const DOCKER_NODE_PREFIX: &str = "docker";

pub const API_ROLE: &str = "API";
pub const VALIDATOR_ROLE: &str = "Validator";
pub const MONITOR_ROLE: &str = "Monitor";
pub const LOAD_TEST_ROLE: &str = "Load Test";

/// Remote layout on cloud hosts.
pub const CLOUD_NODE_CONFIG_PATH: &str = "/home/ubuntu/.avalanchego/configs";
pub const CLOUD_NODE_PLUGINS_PATH: &str = "/home/ubuntu/.avalanchego/plugins";

pub const SSH_SCRIPT_TIMEOUT: Duration = Duration::from_secs(120);
pub const SSH_LONG_RUNNING_SCRIPT_TIMEOUT: Duration = Duration::from_secs(600);
pub const SSH_FILE_OPS_TIMEOUT: Duration = Duration::from_secs(100);
pub const SSH_DIR_OPS_TIMEOUT: Duration = Duration::from_secs(10);
pub const SSH_POST_TIMEOUT: Duration = Duration::from_secs(10);
pub const SSH_CONNECT_RETRIES: u32 = 5;
pub const SSH_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(100);
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(120);
pub const BOOTSTRAP_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const RPC_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const RPC_TIMEOUT: Duration = Duration::from_secs(60);
pub const SERVER_START_TIMEOUT: Duration = Duration::from_secs(30);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const UPSIZE_SETTLE_WAIT: Duration = Duration::from_secs(10);

/// Docker compose file driving the node services on cloud hosts.
pub const REMOTE_COMPOSE_FILE: &str = "/home/ubuntu/.avalanche-cli/services/docker-compose.yml";
pub const REMOTE_NODE_CONFIG_FILE_NAME: &str = "node.json";
pub const AVALANCHEGO_SERVICE: &str = "avalanchego";
pub const SUBNET_EVM_RELEASE_URL: &str = "https://github.com/ava-labs/subnet-evm/releases/download";
