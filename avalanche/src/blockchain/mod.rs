mod create;
mod delete;
mod deploy;
mod describe;
mod list;

use std::io;

use avalanche_cli::{app::Avalanche, config::Config};
use clap::{ArgMatches, Command};

pub const NAME: &str = "blockchain";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Creates, deploys and manages blockchain configurations")
        .subcommand_required(true)
        .subcommands(vec![
            create::command(),
            deploy::command(),
            list::command(),
            describe::command(),
            delete::command(),
        ])
}

pub async fn execute(app: &Avalanche, cfg: &Config, matches: &ArgMatches) -> io::Result<()> {
    match matches.subcommand() {
        Some((create::NAME, sub_matches)) => {
            let opts = create::Options {
                name: sub_matches
                    .get_one::<String>("BLOCKCHAIN_NAME")
                    .unwrap_or(&String::new())
                    .clone(),
                genesis_path: sub_matches
                    .get_one::<String>("GENESIS")
                    .unwrap_or(&String::new())
                    .clone(),
                vm: sub_matches
                    .get_one::<String>("VM")
                    .unwrap_or(&String::from("subnet-evm"))
                    .clone(),
                vm_version: sub_matches
                    .get_one::<String>("VM_VERSION")
                    .unwrap_or(&String::new())
                    .clone(),
                custom_vm_path: sub_matches
                    .get_one::<String>("CUSTOM_VM_PATH")
                    .unwrap_or(&String::new())
                    .clone(),
                evm_chain_id: sub_matches
                    .get_one::<String>("EVM_CHAIN_ID")
                    .unwrap_or(&String::new())
                    .clone(),
                token_name: sub_matches
                    .get_one::<String>("TOKEN_NAME")
                    .unwrap_or(&String::new())
                    .clone(),
                force: sub_matches.get_flag("FORCE"),
            };
            create::execute(app, opts)
        }
        Some((deploy::NAME, sub_matches)) => {
            deploy::execute(
                app,
                cfg,
                sub_matches
                    .get_one::<String>("BLOCKCHAIN_NAME")
                    .unwrap_or(&String::new()),
                sub_matches.get_flag("LOCAL"),
            )
            .await
        }
        Some((list::NAME, _)) => list::execute(app),
        Some((describe::NAME, sub_matches)) => describe::execute(
            app,
            sub_matches
                .get_one::<String>("BLOCKCHAIN_NAME")
                .unwrap_or(&String::new()),
        ),
        Some((delete::NAME, sub_matches)) => delete::execute(
            app,
            sub_matches
                .get_one::<String>("BLOCKCHAIN_NAME")
                .unwrap_or(&String::new()),
            sub_matches.get_flag("SKIP_PROMPT"),
        ),
        _ => unreachable!("unknown subcommand"),
    }
}
