use std::{
    fs,
    io::{self, Error, ErrorKind},
    path::Path,
};

use avalanche_cli::{
    app::Avalanche,
    models::{sidecar, Sidecar, VmType},
};
use clap::{Arg, Command};

use crate::prompt;

pub const NAME: &str = "create";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Creates a blockchain configuration from a genesis file")
        .arg(
            Arg::new("BLOCKCHAIN_NAME")
                .help("Name of the blockchain")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("GENESIS")
                .long("genesis")
                .help("Genesis file of the blockchain")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("VM")
                .long("vm")
                .help("Sets the VM of the blockchain")
                .required(false)
                .num_args(1)
                .value_parser(["subnet-evm", "custom"])
                .default_value("subnet-evm"),
        )
        .arg(
            Arg::new("VM_VERSION")
                .long("vm-version")
                .help("Sets the VM release (e.g., v0.5.6)")
                .required(false)
                .num_args(1),
        )
        .arg(
            Arg::new("CUSTOM_VM_PATH")
                .long("custom-vm-path")
                .help("Local binary of the custom VM")
                .required(false)
                .num_args(1),
        )
        .arg(
            Arg::new("EVM_CHAIN_ID")
                .long("evm-chain-id")
                .help("Sets the EVM chain ID (read from the genesis if empty)")
                .required(false)
                .num_args(1),
        )
        .arg(
            Arg::new("TOKEN_NAME")
                .long("token-name")
                .help("Sets the native token name")
                .required(false)
                .num_args(1),
        )
        .arg(
            Arg::new("FORCE")
                .long("force")
                .short('f')
                .help("Overwrites an existing configuration")
                .required(false)
                .num_args(0),
        )
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub name: String,
    pub genesis_path: String,
    pub vm: String,
    pub vm_version: String,
    pub custom_vm_path: String,
    pub evm_chain_id: String,
    pub token_name: String,
    pub force: bool,
}

pub fn execute(app: &Avalanche, opts: Options) -> io::Result<()> {
    sidecar::check_blockchain_name(&opts.name)?;
    if app.sidecar_exists(&opts.name) && !opts.force {
        return Err(Error::new(
            ErrorKind::AlreadyExists,
            format!(
                "blockchain {} already exists, use --force to overwrite",
                opts.name
            ),
        ));
    }

    let vm = VmType::from_flag(&opts.vm)?;
    if vm == VmType::CustomVm {
        if opts.custom_vm_path.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "--custom-vm-path is required for custom VMs",
            ));
        }
        if !Path::new(&opts.custom_vm_path).exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("custom VM binary {} does not exist", opts.custom_vm_path),
            ));
        }
    }

    let genesis = fs::read(&opts.genesis_path).map_err(|e| {
        Error::new(
            e.kind(),
            format!("failed to read genesis {} ({})", opts.genesis_path, e),
        )
    })?;
    let genesis_json: serde_json::Value = serde_json::from_slice(&genesis).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("invalid genesis {} ({})", opts.genesis_path, e),
        )
    })?;

    let mut sc = Sidecar::new(&opts.name, vm.clone());
    sc.vm_version = opts.vm_version.clone();
    sc.token_name = opts.token_name.clone();
    sc.custom_vm_path = opts.custom_vm_path.clone();
    sc.chain_id = if !opts.evm_chain_id.is_empty() {
        opts.evm_chain_id.clone()
    } else if vm == VmType::SubnetEvm {
        evm_chain_id_from_genesis(&genesis_json).unwrap_or_default()
    } else {
        String::new()
    };

    app.create_sidecar(&mut sc)?;
    app.write_genesis(&opts.name, &genesis)?;

    prompt::print_success(&format!(
        "Successfully created blockchain configuration {} ({})",
        sc.name, sc.vm
    ))
}

/// "config.chainId" of a Subnet-EVM genesis.
fn evm_chain_id_from_genesis(genesis: &serde_json::Value) -> Option<String> {
    match genesis.get("config")?.get("chainId")? {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// RUST_LOG=debug cargo test --package avalanche --bin avalanche -- blockchain::create::test_create --exact --show-output
#[test]
fn test_create() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    let tmp_dir = tempfile::tempdir().unwrap();
    let app = Avalanche::new(&tmp_dir.path().join("base").display().to_string());
    app.setup().unwrap();

    let genesis_path = tmp_dir.path().join("genesis.json");
    fs::write(&genesis_path, br#"{"config":{"chainId":12345},"alloc":{}}"#).unwrap();

    let opts = Options {
        name: String::from("mychain"),
        genesis_path: genesis_path.display().to_string(),
        vm: String::from("subnet-evm"),
        vm_version: String::from("v0.5.6"),
        ..Default::default()
    };
    execute(&app, opts.clone()).unwrap();

    let sc = app.load_sidecar("mychain").unwrap();
    assert_eq!(sc.vm, VmType::SubnetEvm);
    assert_eq!(sc.chain_id, "12345");
    assert_eq!(sc.vm_version, "v0.5.6");
    assert!(app.genesis_exists("mychain"));

    let err = execute(&app, opts.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    // same chain ID on another blockchain
    let err = execute(
        &app,
        Options {
            name: String::from("other"),
            ..opts.clone()
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    execute(
        &app,
        Options {
            force: true,
            token_name: String::from("FOO"),
            ..opts.clone()
        },
    )
    .unwrap();
    assert_eq!(app.load_sidecar("mychain").unwrap().token_name, "FOO");

    let err = execute(
        &app,
        Options {
            name: String::from("custom"),
            vm: String::from("custom"),
            ..opts.clone()
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    // names end up in paths under the base dir
    for name in ["../../escape", "a/b", "abcdefghijklmnopqrstuvwxyz0123456"] {
        let err = execute(
            &app,
            Options {
                name: String::from(name),
                ..opts.clone()
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
    assert!(!tmp_dir.path().join("escape").exists());
    assert_eq!(app.get_sidecar_names().unwrap(), vec!["mychain"]);
}
