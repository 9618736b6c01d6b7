use std::io;

use avalanche_cli::app::Avalanche;
use clap::{Arg, Command};

use crate::prompt;

pub const NAME: &str = "delete";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Deletes a blockchain configuration")
        .arg(
            Arg::new("BLOCKCHAIN_NAME")
                .help("Name of the blockchain")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("SKIP_PROMPT")
                .long("skip-prompt")
                .short('s')
                .help("Skips prompt mode")
                .required(false)
                .num_args(0),
        )
}

pub fn execute(app: &Avalanche, name: &str, skip_prompt: bool) -> io::Result<()> {
    // fail before prompting
    app.load_sidecar(name)?;

    if !prompt::confirm(skip_prompt, &format!("delete blockchain {}", name))? {
        return Ok(());
    }
    app.delete_blockchain(name)?;
    prompt::print_success(&format!("Deleted blockchain {}", name))
}
