use std::{fs, io, path::Path};

use avalanche_cli::{
    app::Avalanche,
    config::Config,
    constants,
    models::Network,
    netrunner::{self, server::Server, NetworkRunner},
    subnet::local::default_snapshot_path,
};
use clap::{Arg, Command};

use crate::prompt;

pub const NAME: &str = "clean";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Stops the local network and deletes its state")
        .arg(
            Arg::new("HARD")
                .long("hard")
                .help("Also removes the downloaded binaries and the snapshot archive")
                .required(false)
                .num_args(0),
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

pub async fn execute(
    app: &Avalanche,
    cfg: &Config,
    hard: bool,
    skip_prompt: bool,
) -> io::Result<()> {
    if !prompt::confirm(skip_prompt, "delete the local network state")? {
        return Ok(());
    }

    let server = Server::new(app, cfg);
    if server.is_running().await {
        let gw = server.gateway()?;
        if netrunner::status_if_running(&gw).await?.is_some() {
            gw.stop().await?;
        }
    }
    server.stop()?;

    let cleaned = remove_local_deployments(app)?;
    log::info!("removed local deployments of {} blockchain(s)", cleaned);

    let plugin_dir = app.get_plugins_dir();
    if Path::new(&plugin_dir).exists() {
        fs::remove_dir_all(&plugin_dir)?;
    }
    fs::create_dir_all(&plugin_dir)?;

    let snapshot_path = default_snapshot_path(&app.get_snapshots_dir());
    if Path::new(&snapshot_path).exists() {
        log::info!("removing default snapshot {}", snapshot_path);
        fs::remove_dir_all(&snapshot_path)?;
    }

    if hard {
        let archive = Path::new(&app.get_snapshots_dir())
            .join(constants::BOOTSTRAP_SNAPSHOT_ARCHIVE_NAME);
        if archive.exists() {
            fs::remove_file(&archive)?;
        }
        let bin_dir = app.get_bin_dir();
        if Path::new(&bin_dir).exists() {
            log::info!("removing binaries in {}", bin_dir);
            fs::remove_dir_all(&bin_dir)?;
        }
    }

    prompt::print_success("Local network cleaned")
}

/// Drops the local network entry of every sidecar.
/// Returns how many sidecars changed.
fn remove_local_deployments(app: &Avalanche) -> io::Result<usize> {
    let network_name = Network::local().name();
    let mut cleaned = 0;
    for mut sc in app.load_sidecars()? {
        if sc.networks.remove(&network_name).is_some() {
            app.update_sidecar(&mut sc)?;
            cleaned += 1;
        }
    }
    Ok(cleaned)
}

/// RUST_LOG=debug cargo test --package avalanche --bin avalanche -- network::clean::test_remove_local_deployments --exact --show-output
#[test]
fn test_remove_local_deployments() {
    use avalanche_cli::models::{NetworkData, Sidecar, VmType};

    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    let tmp_dir = tempfile::tempdir().unwrap();
    let app = Avalanche::new(tmp_dir.path().to_str().unwrap());
    app.setup().unwrap();

    let mut a = Sidecar::new("a", VmType::SubnetEvm);
    a.networks
        .insert(Network::local().name(), NetworkData::default());
    a.networks
        .insert(Network::fuji().name(), NetworkData::default());
    app.create_sidecar(&mut a).unwrap();

    let mut b = Sidecar::new("b", VmType::CustomVm);
    app.create_sidecar(&mut b).unwrap();

    assert_eq!(remove_local_deployments(&app).unwrap(), 1);
    let a = app.load_sidecar("a").unwrap();
    assert!(a.network_data(&Network::local().name()).is_none());
    assert!(a.network_data(&Network::fuji().name()).is_some());

    assert_eq!(remove_local_deployments(&app).unwrap(), 0);
}
