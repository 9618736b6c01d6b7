use std::io;

use avalanche_cli::{
    app::Avalanche,
    config::Config,
    netrunner::{self, server::Server},
};
use clap::Command;

use crate::prompt;

pub const NAME: &str = "status";

pub fn command() -> Command {
    Command::new(NAME).about("Prints the status of the local network")
}

pub async fn execute(app: &Avalanche, cfg: &Config) -> io::Result<()> {
    let server = Server::new(app, cfg);
    if !server.is_running().await {
        return prompt::print_warning("No local network running");
    }
    let info = match netrunner::status_if_running(&server.gateway()?).await? {
        Some(info) => info,
        None => return prompt::print_warning("No local network running"),
    };

    prompt::print_title("Network is up")?;
    println!("Healthy:        {}", info.healthy);
    println!("Custom VMs:     {}", info.custom_chains_healthy);
    println!("Root data dir:  {}", info.root_data_dir);
    println!("Number of nodes: {}", info.node_names.len());
    println!("Number of custom VMs: {}", info.custom_chains.len());

    prompt::print_title("Node information")?;
    for node in info.nodes() {
        println!("{} has ID {} and endpoint {}", node.name, node.id, node.uri);
    }
    if !info.custom_chains.is_empty() {
        prompt::print_title("Custom VMs")?;
        for (blockchain_id, chain) in info.custom_chains.iter() {
            println!(
                "{}: blockchain {} on subnet {} (VM {})",
                chain.chain_name, blockchain_id, chain.subnet_id, chain.vm_id
            );
            for uri in info.uris() {
                println!("  {}", avalanche_cli::subnet::rpc_endpoint(&uri, blockchain_id));
            }
        }
    }
    Ok(())
}
