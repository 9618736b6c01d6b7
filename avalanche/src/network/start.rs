use std::io;

use avalanche_cli::{
    app::Avalanche,
    config::Config,
    constants,
    netrunner::{self, server::Server, LoadSnapshotRequest, NetworkRunner},
    subnet::local::LocalDeployer,
};
use clap::Command;

use crate::prompt;

pub const NAME: &str = "start";

pub fn command() -> Command {
    Command::new(NAME).about("Starts the local network from its last snapshot")
}

pub async fn execute(app: &Avalanche, cfg: &Config) -> io::Result<()> {
    let server = Server::new(app, cfg);
    let gw = server.start().await?;

    if let Some(info) = netrunner::status_if_running(&gw).await? {
        prompt::print_warning(&format!(
            "Network is already running ({} node(s) at {})",
            info.node_names.len(),
            info.root_data_dir
        ))?;
        return Ok(());
    }

    let deployer = LocalDeployer::new(app, &gw, cfg);
    let (avalanchego_path, plugin_dir) = deployer.setup_local_env().await?;

    prompt::print_title("Starting the local network...")?;
    gw.load_snapshot(LoadSnapshotRequest {
        snapshot_name: constants::DEFAULT_SNAPSHOT_NAME.to_string(),
        exec_path: avalanchego_path,
        plugin_dir,
        root_data_dir: app.get_runs_dir(),
        ..Default::default()
    })
    .await?;

    let info = deployer.wait_for_healthy().await?;
    prompt::print_success("Network ready to use. Local network node endpoints:")?;
    for node in info.nodes() {
        println!("{}: {}", node.name, node.uri);
    }
    Ok(())
}
