use std::{collections::BTreeMap, io};

use avalanche_cli::{
    app::Avalanche,
    config::Config,
    inventory,
    jsonrpc::HttpNodeClient,
    models::ClusterConfig,
    netrunner::server::Server,
    node::local::LocalCluster,
};
use clap::Command;

use crate::prompt;

pub const NAME: &str = "list";

pub fn command() -> Command {
    Command::new(NAME).about("Lists every cluster and its nodes")
}

pub async fn execute(app: &Avalanche, cfg: &Config) -> io::Result<()> {
    let clusters = app.load_clusters_config()?.clusters;
    if clusters.is_empty() {
        return prompt::print_warning("No clusters found");
    }

    let server = Server::for_local_cluster(app, cfg);
    let gw = server.gateway()?;
    let node_client = HttpNodeClient;
    let lc = LocalCluster::new(app, &gw, &node_client, cfg);
    let running: BTreeMap<String, bool> = lc
        .list()
        .await?
        .into_iter()
        .map(|e| (e.name, e.running))
        .collect();

    for (name, cc) in clusters.iter() {
        prompt::print_title(&format!("Cluster {} ({})", name, cluster_kind(cc)))?;
        println!("Network: {}", cc.network.kind);
        if cc.local {
            println!(
                "Running: {}",
                running.get(name).copied().unwrap_or(false)
            );
            println!("Root dir: {}", app.get_local_cluster_dir(name));
            continue;
        }

        let hosts = match inventory::get_host_map_from_inventory(&app.get_inventory_dir(name)) {
            Ok(hosts) => hosts,
            Err(e) => {
                log::warn!("failed to load inventory of {} ({})", name, e);
                BTreeMap::new()
            }
        };
        for cloud_id in cc.get_cloud_ids() {
            let ip = hosts
                .values()
                .find(|h| h.get_cloud_id() == cloud_id)
                .map(|h| h.ip.clone())
                .unwrap_or_default();
            println!(
                "  {} {} [{}]",
                cloud_id,
                ip,
                cc.get_host_roles(&cloud_id).join(", ")
            );
        }
        if !cc.subnets.is_empty() {
            println!("Tracking: {}", cc.subnets.join(", "));
        }
    }
    Ok(())
}

fn cluster_kind(cc: &ClusterConfig) -> &'static str {
    if cc.local {
        "local"
    } else if cc.external {
        "external"
    } else {
        "cloud"
    }
}
