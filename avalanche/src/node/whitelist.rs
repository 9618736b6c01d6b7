use std::io::{self, Error, ErrorKind};

use avalanche_cli::{app::Avalanche, aws, constants};
use clap::{Arg, Command};

use crate::prompt;

pub const NAME: &str = "whitelist";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Allows SSH and API access to the nodes of a cluster from an IP")
        .arg(
            Arg::new("CLUSTER_NAME")
                .help("Name of the cluster")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("IP")
                .long("ip")
                .help("IP (or CIDR) to allow")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("REGION")
                .long("region")
                .short('r')
                .help("Sets the AWS region for API calls/endpoints")
                .required(false)
                .num_args(1)
                .default_value("us-east-1"),
        )
        .arg(
            Arg::new("SECURITY_GROUP")
                .long("security-group")
                .help("Security group of the cluster nodes")
                .required(true)
                .num_args(1),
        )
}

pub async fn execute(
    app: &Avalanche,
    cluster_name: &str,
    ip: &str,
    region: &str,
    security_group: &str,
) -> io::Result<()> {
    let cc = app.get_cluster_config(cluster_name)?;
    if cc.local {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("cluster {} is local, nothing to whitelist", cluster_name),
        ));
    }

    let ports = [
        constants::SSH_PORT as i32,
        constants::AVALANCHEGO_API_PORT as i32,
    ];
    let opened = aws::whitelist_ip(region, security_group, ip, &ports).await?;
    if opened.is_empty() {
        return prompt::print_warning(&format!(
            "{} is already allowed in {}",
            ip, security_group
        ));
    }
    prompt::print_success(&format!(
        "Allowed {} on port(s) {:?} of {}",
        ip, opened, security_group
    ))
}
