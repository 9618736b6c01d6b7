use std::io;

use avalanche_cli::{app::Avalanche, models::Sidecar};
use clap::Command;

use crate::prompt;

pub const NAME: &str = "list";

pub fn command() -> Command {
    Command::new(NAME).about("Lists blockchain configurations and their deployments")
}

pub fn execute(app: &Avalanche) -> io::Result<()> {
    let sidecars = app.load_sidecars()?;
    if sidecars.is_empty() {
        return prompt::print_warning("No blockchain configurations found");
    }
    prompt::print_title(&format!("{} blockchain(s)", sidecars.len()))?;
    println!(
        "{:<20} {:<12} {:<10} {}",
        "NAME", "VM", "CHAIN ID", "DEPLOYED"
    );
    for sc in sidecars.iter() {
        println!("{}", row(sc));
    }
    Ok(())
}

fn row(sc: &Sidecar) -> String {
    let deployed: Vec<String> = sc
        .networks
        .keys()
        .filter(|n| sc.is_deployed_to(n))
        .cloned()
        .collect();
    format!(
        "{:<20} {:<12} {:<10} {}",
        sc.name,
        sc.vm.to_string(),
        sc.chain_id,
        if deployed.is_empty() {
            String::from("-")
        } else {
            deployed.join(", ")
        }
    )
}

/// RUST_LOG=debug cargo test --package avalanche --bin avalanche -- blockchain::list::test_row --exact --show-output
#[test]
fn test_row() {
    use avalanche_cli::models::{NetworkData, VmType};
    use avalanche_types::ids;

    let mut sc = Sidecar::new("mychain", VmType::SubnetEvm);
    sc.chain_id = String::from("12345");
    assert!(row(&sc).ends_with(" -"));

    sc.networks.insert(
        String::from("Local Network"),
        NetworkData {
            blockchain_id: ids::Id::from_slice(&[1, 2, 3]),
            ..Default::default()
        },
    );
    sc.networks
        .insert(String::from("Fuji"), NetworkData::default());
    let r = row(&sc);
    assert!(r.starts_with("mychain"));
    assert!(r.contains("Subnet-EVM"));
    assert!(r.ends_with("Local Network"));
}
