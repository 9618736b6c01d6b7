use std::io;

use avalanche_cli::{
    app::Avalanche,
    config::Config,
    models::Network,
    netrunner::server::Server,
    subnet::{self, local::LocalDeployer},
};
use clap::{Arg, Command};

use crate::prompt;

pub const NAME: &str = "deploy";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Deploys a blockchain configuration")
        .arg(
            Arg::new("BLOCKCHAIN_NAME")
                .help("Name of the blockchain")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("LOCAL")
                .long("local")
                .short('l')
                .help("Deploys to the local network (default)")
                .required(false)
                .num_args(0),
        )
}

pub async fn execute(app: &Avalanche, cfg: &Config, name: &str, local: bool) -> io::Result<()> {
    if !local {
        log::info!("no network selected, deploying {} to the local network", name);
    }
    let mut sc = app.load_sidecar(name)?;
    let genesis_path = app.get_genesis_path(name);
    if !app.genesis_exists(name) {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("genesis of {} does not exist", name),
        ));
    }
    let vm_bin = subnet::vm_binary_path(&sc, &cfg.subnet_evm_path)?;

    let network = Network::local();
    prompt::print_title(&format!("Deploying [{}] to {}", name, network.name()))?;

    let server = Server::new(app, cfg);
    let gw = server.start().await?;
    let deployer = LocalDeployer::new(app, &gw, cfg);

    let info = match deployer
        .deploy_to_local_network(name, &genesis_path, &vm_bin)
        .await?
    {
        Some(info) => info,
        None => {
            return prompt::print_warning(&format!(
                "Blockchain {} has already been deployed to {}",
                name,
                network.name()
            ))
        }
    };

    subnet::record_deployment(&mut sc, &network.name(), &info);
    app.update_sidecar(&mut sc)?;

    prompt::print_success(&format!(
        "Blockchain {} deployed\nSubnet ID:     {}\nBlockchain ID: {}",
        name, info.subnet_id, info.blockchain_id
    ))?;
    for ep in info.rpc_endpoints.iter() {
        println!("RPC URL: {}", ep);
    }
    Ok(())
}
