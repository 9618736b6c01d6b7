use std::io;

use avalanche_cli::{
    app::Avalanche,
    config::Config,
    constants,
    netrunner::{self, server::Server, NetworkRunner},
};
use clap::Command;

use crate::prompt;

pub const NAME: &str = "stop";

pub fn command() -> Command {
    Command::new(NAME).about("Stops the local network, saving its state as the default snapshot")
}

pub async fn execute(app: &Avalanche, cfg: &Config) -> io::Result<()> {
    let server = Server::new(app, cfg);
    if !server.is_running().await {
        return prompt::print_warning("Network-runner server is not running");
    }
    let gw = server.gateway()?;

    if netrunner::status_if_running(&gw).await?.is_some() {
        // the server refuses to overwrite a snapshot
        if let Err(e) = gw.remove_snapshot(constants::DEFAULT_SNAPSHOT_NAME).await {
            log::debug!("no previous snapshot removed ({})", e);
        }
        // saving a snapshot stops the network
        gw.save_snapshot(constants::DEFAULT_SNAPSHOT_NAME).await?;
        prompt::print_success("Network stopped successfully")?;
    } else {
        prompt::print_warning("Network already stopped")?;
    }

    server.stop()
}
