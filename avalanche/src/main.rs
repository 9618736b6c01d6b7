mod blockchain;
mod network;
mod node;
mod prompt;

use std::io;

use avalanche_cli::{
    app::{migrations, Avalanche},
    config::Config,
};
use clap::{crate_version, Arg, Command};

const APP_NAME: &str = "avalanche";

fn command() -> Command {
    Command::new(APP_NAME)
        .version(crate_version!())
        .about("Avalanche local networks, blockchains and node clusters")
        .arg(
            Arg::new("LOG_LEVEL")
                .long("log-level")
                .short('l')
                .help("Sets the log level")
                .required(false)
                .num_args(1)
                .value_parser(["debug", "info", "warn"])
                .default_value("info")
                .global(true),
        )
        .arg(
            Arg::new("BASE_DIR")
                .long("base-dir")
                .help("Sets the data directory (default $AVALANCHE_CLI_BASE_DIR or ~/.avalanche-cli)")
                .required(false)
                .num_args(1)
                .global(true),
        )
        .subcommand_required(true)
        .subcommands(vec![
            blockchain::command(),
            network::command(),
            node::command(),
        ])
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let matches = command().get_matches();

    let log_level = matches
        .get_one::<String>("LOG_LEVEL")
        .unwrap_or(&String::from("info"))
        .clone();
    // ref. https://github.com/env-logger-rs/env_logger/issues/47
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    );

    let base_dir = match matches.get_one::<String>("BASE_DIR") {
        Some(d) => d.clone(),
        None => Avalanche::default_base_dir()?,
    };
    let app = Avalanche::new(&base_dir);
    app.setup()?;
    migrations::run_migrations(&app)?;

    let cfg = Config::load_or_default(&app.get_config_path())?;
    log::debug!("loaded config from {}: {:?}", app.get_config_path(), cfg);

    match matches.subcommand() {
        Some((blockchain::NAME, sub_matches)) => {
            blockchain::execute(&app, &cfg, sub_matches).await
        }
        Some((network::NAME, sub_matches)) => network::execute(&app, &cfg, sub_matches).await,
        Some((node::NAME, sub_matches)) => node::execute(&app, &cfg, sub_matches).await,
        _ => unreachable!("unknown subcommand"),
    }
}

/// RUST_LOG=debug cargo test --package avalanche --bin avalanche -- test_command --exact --show-output
#[test]
fn test_command() {
    command().debug_assert();

    let m = command()
        .try_get_matches_from([
            "avalanche",
            "node",
            "local",
            "start",
            "mycluster",
            "--num-nodes",
            "3",
            "--fuji",
            "--base-dir",
            "/tmp/avalanche-test",
        ])
        .unwrap();
    assert_eq!(
        m.get_one::<String>("BASE_DIR").map(|s| s.as_str()),
        Some("/tmp/avalanche-test")
    );
    let (name, node_m) = m.subcommand().unwrap();
    assert_eq!(name, node::NAME);
    let (name, local_m) = node_m.subcommand().unwrap();
    assert_eq!(name, node::local::NAME);
    let (name, start_m) = local_m.subcommand().unwrap();
    assert_eq!(name, "start");
    assert_eq!(start_m.get_one::<u32>("NUM_NODES"), Some(&3));
    assert!(start_m.get_flag("FUJI"));

    let m = command()
        .try_get_matches_from([
            "avalanche",
            "node",
            "sync",
            "mycluster",
            "mychain",
            "--subnet-aliases",
            "a,b",
            "--no-checks",
        ])
        .unwrap();
    let (_, node_m) = m.subcommand().unwrap();
    let (name, sync_m) = node_m.subcommand().unwrap();
    assert_eq!(name, node::sync::NAME);
    assert!(sync_m.get_flag("NO_CHECKS"));

    assert!(command()
        .try_get_matches_from(["avalanche", "blockchain", "create", "mychain"])
        .is_err());
}
