mod list;
pub mod local;
pub mod sync;
mod whitelist;

use std::io;

use avalanche_cli::{app::Avalanche, config::Config};
use clap::{ArgMatches, Command};

pub const NAME: &str = "node";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Manages local clusters and remote node clusters")
        .subcommand_required(true)
        .subcommands(vec![
            local::command(),
            list::command(),
            sync::command(),
            whitelist::command(),
        ])
}

pub async fn execute(app: &Avalanche, cfg: &Config, matches: &ArgMatches) -> io::Result<()> {
    match matches.subcommand() {
        Some((local::NAME, sub_matches)) => local::execute(app, cfg, sub_matches).await,
        Some((list::NAME, _)) => list::execute(app, cfg).await,
        Some((sync::NAME, sub_matches)) => {
            let aliases = sub_matches
                .get_one::<String>("SUBNET_ALIASES")
                .unwrap_or(&String::new())
                .clone();
            let opts = avalanche_cli::node::sync::SyncOptions {
                avoid_checks: sub_matches.get_flag("NO_CHECKS"),
                subnet_aliases: aliases
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            };
            sync::execute(
                app,
                cfg,
                sub_matches
                    .get_one::<String>("CLUSTER_NAME")
                    .unwrap_or(&String::new()),
                sub_matches
                    .get_one::<String>("BLOCKCHAIN_NAME")
                    .unwrap_or(&String::new()),
                &opts,
            )
            .await
        }
        Some((whitelist::NAME, sub_matches)) => {
            whitelist::execute(
                app,
                sub_matches
                    .get_one::<String>("CLUSTER_NAME")
                    .unwrap_or(&String::new()),
                sub_matches
                    .get_one::<String>("IP")
                    .unwrap_or(&String::new()),
                sub_matches
                    .get_one::<String>("REGION")
                    .unwrap_or(&String::from("us-east-1")),
                sub_matches
                    .get_one::<String>("SECURITY_GROUP")
                    .unwrap_or(&String::new()),
            )
            .await
        }
        _ => unreachable!("unknown subcommand"),
    }
}
