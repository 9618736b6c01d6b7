use std::io;

use avalanche_cli::{app::Avalanche, config::Config, node::sync::SyncOptions};
use clap::{Arg, Command};

use crate::prompt;

pub const NAME: &str = "sync";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Makes every node of a cluster track a deployed blockchain")
        .arg(
            Arg::new("CLUSTER_NAME")
                .help("Name of the cluster")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("BLOCKCHAIN_NAME")
                .help("Name of the blockchain")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("NO_CHECKS")
                .long("no-checks")
                .help("Skips the bootstrap, health and RPC compatibility checks")
                .required(false)
                .num_args(0),
        )
        .arg(
            Arg::new("SUBNET_ALIASES")
                .long("subnet-aliases")
                .help("Comma-separated aliases of the blockchain")
                .required(false)
                .num_args(1),
        )
}

pub async fn execute(
    app: &Avalanche,
    cfg: &Config,
    cluster_name: &str,
    blockchain_name: &str,
    opts: &SyncOptions,
) -> io::Result<()> {
    prompt::print_title(&format!(
        "Syncing cluster {} with blockchain {}",
        cluster_name, blockchain_name
    ))?;
    avalanche_cli::node::sync::sync_subnet(app, cfg, cluster_name, blockchain_name, opts).await?;
    prompt::print_success(&format!(
        "Nodes of cluster {} are now tracking {}",
        cluster_name, blockchain_name
    ))
}
