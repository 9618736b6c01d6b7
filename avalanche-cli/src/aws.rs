//! Security group helpers for cloud clusters.
use std::{
    io::{self, Error, ErrorKind},
    net::IpAddr,
    time::Duration,
};

use aws_manager::ec2;
use aws_sdk_ec2::types::{IpPermission, IpRange, SecurityGroup};
use ipnet::IpNet;

const ANY_CIDR: &str = "0.0.0.0/0";

/// Returns true if an ingress rule of the security group lets the IP in on the port.
/// A missing prefix length means a single host ("/32").
pub fn check_ip_in_sg(sg: &SecurityGroup, current_ip: &str, port: i32) -> bool {
    let current_ip = if current_ip.contains('/') {
        current_ip.to_string()
    } else {
        format!("{}/32", current_ip)
    };
    let ip: Option<IpAddr> = current_ip
        .split('/')
        .next()
        .and_then(|s| s.parse().ok());

    for perm in sg.ip_permissions().unwrap_or_default() {
        let port_matches = perm.from_port() == Some(port);
        for range in perm.ip_ranges().unwrap_or_default() {
            let cidr = match range.cidr_ip() {
                Some(c) => c,
                None => continue,
            };
            if cidr == ANY_CIDR || cidr == current_ip {
                if port_matches {
                    return true;
                }
                continue;
            }
            let net: IpNet = match cidr.parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if let Some(ip) = ip {
                if port_matches && net.contains(&ip) {
                    return true;
                }
            }
        }
    }
    false
}

/// Authorizes TCP ingress from the IP on every port the security group does not allow yet.
/// Returns the ports that were opened.
pub async fn whitelist_ip(
    region: &str,
    sg_id: &str,
    ip: &str,
    ports: &[i32],
) -> io::Result<Vec<i32>> {
    let cidr = if ip.contains('/') {
        ip.to_string()
    } else {
        format!("{}/32", ip)
    };
    cidr.parse::<IpNet>().map_err(|e| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("invalid IP {} ({})", ip, e),
        )
    })?;

    let shared_config =
        aws_manager::load_config(Some(region.to_string()), None, Some(Duration::from_secs(30))).await;
    let ec2_manager = ec2::Manager::new(&shared_config);

    let out = ec2_manager
        .cli
        .describe_security_groups()
        .group_ids(sg_id)
        .send()
        .await
        .map_err(|e| {
            Error::new(
                ErrorKind::Other,
                format!("failed describe_security_groups {} ({:?})", sg_id, e),
            )
        })?;
    let sg = match out.security_groups().and_then(|sgs| sgs.first()) {
        Some(sg) => sg.clone(),
        None => {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("security group {} not found in {}", sg_id, region),
            ))
        }
    };

    let mut opened = Vec::new();
    for port in ports.iter().copied() {
        if check_ip_in_sg(&sg, ip, port) {
            log::info!("{} already allowed on port {} of {}", ip, port, sg_id);
            continue;
        }
        log::info!("authorizing {} on port {} of {}", cidr, port, sg_id);
        ec2_manager
            .cli
            .authorize_security_group_ingress()
            .group_id(sg_id)
            .ip_permissions(
                IpPermission::builder()
                    .ip_protocol("tcp")
                    .from_port(port)
                    .to_port(port)
                    .ip_ranges(IpRange::builder().cidr_ip(cidr.clone()).build())
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                Error::new(
                    ErrorKind::Other,
                    format!(
                        "failed authorize_security_group_ingress {} port {} ({:?})",
                        sg_id, port, e
                    ),
                )
            })?;
        opened.push(port);
    }
    Ok(opened)
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- aws::test_check_ip_in_sg --exact --show-output
#[test]
fn test_check_ip_in_sg() {
    let rule = |port: i32, cidrs: &[&str]| {
        let mut b = IpPermission::builder().from_port(port);
        for c in cidrs {
            b = b.ip_ranges(IpRange::builder().cidr_ip(*c).build());
        }
        b.build()
    };
    let sg = SecurityGroup::builder()
        .ip_permissions(rule(80, &["192.168.1.0/24", "10.0.0.0/16", "1.1.1.1/32"]))
        .ip_permissions(rule(443, &["172.16.0.0/16"]))
        .ip_permissions(rule(22, &["0.0.0.0/0"]))
        .build();

    assert!(check_ip_in_sg(&sg, "192.168.1.5", 80));
    assert!(!check_ip_in_sg(&sg, "192.168.2.5", 80));
    assert!(!check_ip_in_sg(&sg, "invalid_ip", 80));
    // in range, wrong port
    assert!(!check_ip_in_sg(&sg, "10.0.1.5", 443));
    assert!(!check_ip_in_sg(&sg, "172.17.0.5", 443));
    assert!(check_ip_in_sg(&sg, "172.16.3.4", 443));

    assert!(check_ip_in_sg(&sg, "0.0.0.0/0", 22));
    assert!(check_ip_in_sg(&sg, "0.0.0.0", 22));
    assert!(!check_ip_in_sg(&sg, "0.0.0.0/0", 23));
    assert!(!check_ip_in_sg(&sg, "0.0.0.0", 23));
    assert!(check_ip_in_sg(&sg, "1.1.1.1", 22));
    assert!(check_ip_in_sg(&sg, "1.1.1.1/32", 80));

    assert!(!check_ip_in_sg(&SecurityGroup::builder().build(), "1.1.1.1", 80));
}
