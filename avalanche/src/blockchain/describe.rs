use std::io::{self, Error, ErrorKind};

use avalanche_cli::app::Avalanche;
use clap::{Arg, Command};

use crate::prompt;

pub const NAME: &str = "describe";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Prints the configuration and deployments of a blockchain")
        .arg(
            Arg::new("BLOCKCHAIN_NAME")
                .help("Name of the blockchain")
                .required(true)
                .num_args(1),
        )
}

pub fn execute(app: &Avalanche, name: &str) -> io::Result<()> {
    let sc = app.load_sidecar(name)?;
    prompt::print_title(&format!("Blockchain '{}'", name))?;
    println!("VM:         {}", sc.vm);
    if !sc.vm_version.is_empty() {
        println!("VM version: {}", sc.vm_version);
    }
    if !sc.chain_id.is_empty() {
        println!("Chain ID:   {}", sc.chain_id);
    }
    println!("Token:      {}", sc.token_name);
    println!("VM ID:      {}", sc.vm_id()?);

    for (network_name, d) in sc.networks.iter() {
        prompt::print_title(&format!("Deployment on {}", network_name))?;
        println!("Subnet ID:     {}", d.subnet_id);
        println!("Blockchain ID: {}", d.blockchain_id);
        for ep in d.rpc_endpoints.iter() {
            println!("RPC URL:       {}", ep);
        }
        for ep in d.ws_endpoints.iter() {
            println!("WS URL:        {}", ep);
        }
    }

    let genesis = app.load_raw_genesis(name)?;
    let genesis: serde_json::Value = serde_json::from_slice(&genesis).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("invalid genesis of {} ({})", name, e),
        )
    })?;
    let genesis = serde_json::to_string_pretty(&genesis).map_err(|e| {
        Error::new(
            ErrorKind::Other,
            format!("failed to encode genesis ({})", e),
        )
    })?;
    prompt::print_title("Genesis")?;
    println!("{}", genesis);
    Ok(())
}
