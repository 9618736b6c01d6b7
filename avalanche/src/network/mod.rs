mod clean;
mod start;
mod status;
mod stop;

use std::io;

use avalanche_cli::{app::Avalanche, config::Config};
use clap::{ArgMatches, Command};

pub const NAME: &str = "network";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Manages the local network")
        .subcommand_required(true)
        .subcommands(vec![
            start::command(),
            stop::command(),
            status::command(),
            clean::command(),
        ])
}

pub async fn execute(app: &Avalanche, cfg: &Config, matches: &ArgMatches) -> io::Result<()> {
    match matches.subcommand() {
        Some((start::NAME, _)) => start::execute(app, cfg).await,
        Some((stop::NAME, _)) => stop::execute(app, cfg).await,
        Some((status::NAME, _)) => status::execute(app, cfg).await,
        Some((clean::NAME, sub_matches)) => {
            clean::execute(
                app,
                cfg,
                sub_matches.get_flag("HARD"),
                sub_matches.get_flag("SKIP_PROMPT"),
            )
            .await
        }
        _ => unreachable!("unknown subcommand"),
    }
}
