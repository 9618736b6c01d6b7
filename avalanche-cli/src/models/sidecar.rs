use std::{
    collections::BTreeMap,
    fmt,
    io::{self, Error, ErrorKind},
};

use avalanche_types::{ids, subnet};
use serde::{Deserialize, Serialize};

pub const SUBNET_EVM: &str = "Subnet-EVM";
pub const CUSTOM_VM: &str = "Custom VM";
/// VM name written by older releases.
pub const LEGACY_SUBNET_EVM: &str = "SubnetEVM";

/// VM backing a blockchain.
/// Unknown names are kept verbatim so that a sidecar written by
/// a newer release round-trips unchanged.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(from = "String", into = "String")]
pub enum VmType {
    #[default]
    SubnetEvm,
    CustomVm,
    Other(String),
}

impl From<String> for VmType {
    fn from(s: String) -> Self {
        match s.as_str() {
            SUBNET_EVM => VmType::SubnetEvm,
            CUSTOM_VM => VmType::CustomVm,
            _ => VmType::Other(s),
        }
    }
}

impl From<VmType> for String {
    fn from(vm: VmType) -> Self {
        vm.to_string()
    }
}

impl fmt::Display for VmType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VmType::SubnetEvm => write!(f, "{}", SUBNET_EVM),
            VmType::CustomVm => write!(f, "{}", CUSTOM_VM),
            VmType::Other(s) => write!(f, "{}", s),
        }
    }
}

impl VmType {
    /// Parses the VM names accepted on the command line.
    pub fn from_flag(s: &str) -> io::Result<Self> {
        match s.to_lowercase().as_str() {
            "subnet-evm" | "subnetevm" | "evm" => Ok(VmType::SubnetEvm),
            "custom" | "custom-vm" => Ok(VmType::CustomVm),
            _ => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("unknown vm {}", s),
            )),
        }
    }
}

/// Longest blockchain name a VM ID can be derived from.
pub const MAX_BLOCKCHAIN_NAME_LEN: usize = 32;

/// Blockchain names are ASCII letters, digits and spaces, and short
/// enough to derive the VM ID from.
pub fn check_blockchain_name(name: &str) -> io::Result<()> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::InvalidInput, "empty blockchain name"));
    }
    if name.len() > MAX_BLOCKCHAIN_NAME_LEN {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "blockchain name {} is longer than {} bytes",
                name, MAX_BLOCKCHAIN_NAME_LEN
            ),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "invalid blockchain name {:?}, only letters, digits and spaces are allowed",
                name
            ),
        ));
    }
    Ok(())
}

/// Deployment of a blockchain on one network.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone)]
#[serde(default)]
pub struct NetworkData {
    #[serde(rename = "SubnetID")]
    pub subnet_id: ids::Id,
    #[serde(rename = "BlockchainID")]
    pub blockchain_id: ids::Id,
    #[serde(rename = "RPCEndpoints")]
    pub rpc_endpoints: Vec<String>,
    #[serde(rename = "WSEndpoints")]
    pub ws_endpoints: Vec<String>,
}

impl Default for NetworkData {
    fn default() -> Self {
        Self {
            subnet_id: ids::Id::empty(),
            blockchain_id: ids::Id::empty(),
            rpc_endpoints: Vec::new(),
            ws_endpoints: Vec::new(),
        }
    }
}

/// Per-blockchain metadata.
/// Keyed by blockchain name on disk, with one "NetworkData"
/// entry per network name (see "Network::name").
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
pub struct Sidecar {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "VM")]
    pub vm: VmType,
    #[serde(rename = "VMVersion", default)]
    pub vm_version: String,
    /// AvalancheGo RPC protocol version the VM release speaks.
    /// Zero when unknown.
    #[serde(rename = "RPCVersion", default)]
    pub rpc_version: u32,
    #[serde(rename = "TokenName", default)]
    pub token_name: String,
    #[serde(rename = "ChainID", default)]
    pub chain_id: String,
    /// Local path of a custom VM binary.
    #[serde(rename = "CustomVMPath", default, skip_serializing_if = "String::is_empty")]
    pub custom_vm_path: String,
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Networks", default)]
    pub networks: BTreeMap<String, NetworkData>,
}

impl Sidecar {
    pub fn new(name: &str, vm: VmType) -> Self {
        Self {
            name: name.to_string(),
            vm,
            ..Default::default()
        }
    }

    /// VM ID is derived from the blockchain name.
    pub fn vm_id(&self) -> io::Result<ids::Id> {
        subnet::vm_name_to_id(&self.name)
    }

    pub fn network_data(&self, network_name: &str) -> Option<&NetworkData> {
        self.networks.get(network_name)
    }

    /// Returns true if the blockchain has a non-empty blockchain ID on the network.
    pub fn is_deployed_to(&self, network_name: &str) -> bool {
        match self.networks.get(network_name) {
            Some(d) => d.blockchain_id != ids::Id::empty(),
            None => false,
        }
    }
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- models::sidecar::test_sidecar_json --exact --show-output
#[test]
fn test_sidecar_json() {
    use std::str::FromStr;

    let d = r#"
{
    "Name": "mychain",
    "VM": "Subnet-EVM",
    "VMVersion": "v0.5.6",
    "TokenName": "TEST",
    "ChainID": "12345",
    "Version": "1.4.0",
    "Networks": {
        "Local Network": {
            "SubnetID": "srEXiWaHuhNyGwPUi444Tu47ZEDwxTWrbQiuD7FmgSAQ6X7Dy",
            "BlockchainID": "v3m4wPxaHpvGr8qfMeyK6PRW3idZrPHmYcMTt7oXdK47yurVH",
            "RPCEndpoints": ["http://127.0.0.1:9650/ext/bc/v3m4wPxaHpvGr8qfMeyK6PRW3idZrPHmYcMTt7oXdK47yurVH/rpc"]
        }
    }
}
"#;
    let sc: Sidecar = serde_json::from_str(d).unwrap();
    assert_eq!(sc.vm, VmType::SubnetEvm);
    assert!(sc.is_deployed_to("Local Network"));
    assert!(!sc.is_deployed_to("Fuji"));

    let data = sc.network_data("Local Network").unwrap();
    assert_eq!(
        data.blockchain_id,
        ids::Id::from_str("v3m4wPxaHpvGr8qfMeyK6PRW3idZrPHmYcMTt7oXdK47yurVH").unwrap()
    );
    assert!(data.ws_endpoints.is_empty());

    let unknown: Sidecar = serde_json::from_str(r#"{"Name":"x","VM":"unknown"}"#).unwrap();
    assert_eq!(unknown.vm, VmType::Other(String::from("unknown")));
    let s = serde_json::to_string(&unknown).unwrap();
    assert!(s.contains(r#""VM":"unknown""#));
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- models::sidecar::test_check_blockchain_name --exact --show-output
#[test]
fn test_check_blockchain_name() {
    for name in ["alpha", "My Chain 2", "A", "abcdefghijklmnopqrstuvwxyz012345"] {
        assert!(check_blockchain_name(name).is_ok(), "{}", name);
    }
    for name in [
        "",
        "../../escape",
        "a/b",
        "dash-name",
        "under_score",
        "tab\tname",
        "caf\u{e9}",
        "abcdefghijklmnopqrstuvwxyz0123456",
    ] {
        assert_eq!(
            check_blockchain_name(name).unwrap_err().kind(),
            ErrorKind::InvalidInput,
            "{}",
            name
        );
    }
}
