pub mod local;

use std::{
    fs,
    io::{self, Error, ErrorKind},
    path::Path,
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use avalanche_types::ids;

use crate::models::{NetworkData, Sidecar, VmType};

/// Result of deploying a blockchain.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeployInfo {
    pub subnet_id: ids::Id,
    pub blockchain_id: ids::Id,
    pub rpc_endpoints: Vec<String>,
}

/// "<uri>/ext/bc/<blockchain_id>/rpc"
pub fn rpc_endpoint(uri: &str, blockchain_id: &str) -> String {
    format!("{}/ext/bc/{}/rpc", uri.trim_end_matches('/'), blockchain_id)
}

/// "ws://<host>/ext/bc/<blockchain_id>/ws"
pub fn ws_endpoint(uri: &str, blockchain_id: &str) -> String {
    let host = uri
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');
    format!("ws://{}/ext/bc/{}/ws", host, blockchain_id)
}

/// Adds the RPC and WS endpoints of the node at "uri" to the deployment.
/// Endpoints already recorded are kept once.
pub fn add_node_endpoints(data: &mut NetworkData, uri: &str) {
    let blockchain_id = data.blockchain_id.to_string();
    let rpc = rpc_endpoint(uri, &blockchain_id);
    if !data.rpc_endpoints.contains(&rpc) {
        data.rpc_endpoints.push(rpc);
    }
    let ws = ws_endpoint(uri, &blockchain_id);
    if !data.ws_endpoints.contains(&ws) {
        data.ws_endpoints.push(ws);
    }
}

/// Records the deployment under the network name in the sidecar.
pub fn record_deployment(sc: &mut Sidecar, network_name: &str, info: &DeployInfo) {
    sc.networks.insert(
        network_name.to_string(),
        NetworkData {
            subnet_id: info.subnet_id.clone(),
            blockchain_id: info.blockchain_id.clone(),
            rpc_endpoints: info.rpc_endpoints.clone(),
            ws_endpoints: Vec::new(),
        },
    );
}

/// Local binary of the blockchain VM.
pub fn vm_binary_path(sc: &Sidecar, subnet_evm_path: &str) -> io::Result<String> {
    match &sc.vm {
        VmType::SubnetEvm => {
            if subnet_evm_path.is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "'subnet_evm_path' is not configured",
                ));
            }
            Ok(subnet_evm_path.to_string())
        }
        VmType::CustomVm => {
            if sc.custom_vm_path.is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("blockchain {} has no custom VM binary", sc.name),
                ));
            }
            Ok(sc.custom_vm_path.clone())
        }
        VmType::Other(vm) => Err(Error::new(
            ErrorKind::InvalidInput,
            format!("unknown vm: {}", vm),
        )),
    }
}

/// Copies the VM binary to "<plugin_dir>/<vm_id>", executable.
pub fn install_plugin(vm_id: &ids::Id, vm_bin: &str, plugin_dir: &str) -> io::Result<String> {
    if vm_bin.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "VM binary path is empty",
        ));
    }
    if !Path::new(vm_bin).exists() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("VM binary {} does not exist", vm_bin),
        ));
    }
    fs::create_dir_all(plugin_dir)?;
    let dst = Path::new(plugin_dir).join(vm_id.to_string());
    log::info!("installing plugin '{}' to '{}'", vm_bin, dst.display());
    fs::copy(vm_bin, &dst)?;

    #[cfg(unix)]
    fs::set_permissions(&dst, fs::Permissions::from_mode(0o755))?;

    Ok(dst.display().to_string())
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- subnet::test_install_plugin --exact --show-output
#[test]
fn test_install_plugin() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    let tmp_dir = tempfile::tempdir().unwrap();
    let bin = tmp_dir.path().join("subnet-evm");
    fs::write(&bin, b"#!/bin/sh\n").unwrap();
    let plugin_dir = tmp_dir.path().join("plugins");

    let vm_id = avalanche_types::subnet::vm_name_to_id("mychain").unwrap();
    let dst = install_plugin(
        &vm_id,
        bin.to_str().unwrap(),
        plugin_dir.to_str().unwrap(),
    )
    .unwrap();
    assert!(dst.ends_with(&vm_id.to_string()));
    assert_eq!(fs::read(&dst).unwrap(), b"#!/bin/sh\n");
    #[cfg(unix)]
    assert_eq!(
        fs::metadata(&dst).unwrap().permissions().mode() & 0o777,
        0o755
    );

    assert!(install_plugin(&vm_id, "", plugin_dir.to_str().unwrap()).is_err());
    assert!(install_plugin(&vm_id, "/no/such/bin", plugin_dir.to_str().unwrap()).is_err());

    let mut sc = Sidecar::new("mychain", VmType::SubnetEvm);
    assert_eq!(vm_binary_path(&sc, "/opt/subnet-evm").unwrap(), "/opt/subnet-evm");
    assert!(vm_binary_path(&sc, "").is_err());
    sc.vm = VmType::CustomVm;
    sc.custom_vm_path = String::from("/opt/custom");
    assert_eq!(vm_binary_path(&sc, "/opt/subnet-evm").unwrap(), "/opt/custom");
    sc.vm = VmType::Other(String::from("Mystery"));
    assert_eq!(
        vm_binary_path(&sc, "").unwrap_err().to_string(),
        "unknown vm: Mystery"
    );

    assert_eq!(
        rpc_endpoint("http://127.0.0.1:9650/", "abc"),
        "http://127.0.0.1:9650/ext/bc/abc/rpc"
    );
    assert_eq!(
        ws_endpoint("http://1.2.3.4:9650", "abc"),
        "ws://1.2.3.4:9650/ext/bc/abc/ws"
    );
}
