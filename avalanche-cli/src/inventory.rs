//! Ansible-style host inventory of a cloud cluster.
//! One host per line: "<id> ansible_host=<ip> ansible_user=<user> ..."
use std::{
    collections::BTreeMap,
    fs,
    io::{self, Error, ErrorKind},
    path::Path,
};

use crate::{
    constants,
    models::{host, Host},
};

fn hosts_file(inventory_dir: &str) -> String {
    Path::new(inventory_dir)
        .join(constants::HOSTS_FILE_NAME)
        .display()
        .to_string()
}

/// Writes the inventory of AWS hosts from the cloud ID to public IP map.
pub fn create_host_inventory(
    inventory_dir: &str,
    cert_file_path: &str,
    public_ips: &BTreeMap<String, String>,
) -> io::Result<()> {
    log::info!(
        "creating inventory with {} host(s) in '{}'",
        public_ips.len(),
        inventory_dir
    );

    let mut hosts = Vec::new();
    for (cloud_id, ip) in public_ips.iter() {
        hosts.push(Host {
            node_id: host::host_cloud_id_to_ansible_id(host::AWS_CLOUD_SERVICE, cloud_id)?,
            ip: ip.clone(),
            ssh_user: constants::ANSIBLE_SSH_USER.to_string(),
            ssh_private_key_path: cert_file_path.to_string(),
            ssh_common_args: constants::ANSIBLE_SSH_SHELL_PARAMS.to_string(),
            api_node: false,
        });
    }
    write_inventory(inventory_dir, &hosts)
}

pub fn write_inventory(inventory_dir: &str, hosts: &[Host]) -> io::Result<()> {
    fs::create_dir_all(inventory_dir)?;
    let mut contents = String::new();
    for h in hosts.iter() {
        contents.push_str(&h.inventory_record());
        contents.push('\n');
    }
    crate::app::write_file_atomic(&hosts_file(inventory_dir), contents.as_bytes())
}

/// Splits a record on spaces, keeping single-quoted values together.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '\'' => quoted = !quoted,
            ' ' | '\t' if !quoted => {
                if !cur.is_empty() {
                    fields.push(std::mem::take(&mut cur));
                }
            }
            _ => cur.push(c),
        }
    }
    if !cur.is_empty() {
        fields.push(cur);
    }
    fields
}

pub fn parse_inventory_record(line: &str) -> io::Result<Host> {
    let fields = split_record(line.trim());
    let node_id = match fields.first() {
        Some(id) => id.clone(),
        None => {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "empty inventory record",
            ))
        }
    };

    let mut h = Host {
        node_id,
        ..Default::default()
    };
    for field in fields.iter().skip(1) {
        let (k, v) = match field.split_once('=') {
            Some(kv) => kv,
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("malformed inventory field '{}' for {}", field, h.node_id),
                ))
            }
        };
        match k {
            "ansible_host" => h.ip = v.to_string(),
            "ansible_user" => h.ssh_user = v.to_string(),
            "ansible_ssh_private_key_file" => h.ssh_private_key_path = v.to_string(),
            "ansible_ssh_common_args" => h.ssh_common_args = v.to_string(),
            _ => log::debug!("ignoring inventory field {}", k),
        }
    }
    if h.ip.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("no ansible_host for {}", h.node_id),
        ));
    }
    Ok(h)
}

pub fn get_inventory_from_file(inventory_dir: &str) -> io::Result<Vec<Host>> {
    let file_path = hosts_file(inventory_dir);
    if !Path::new(&file_path).exists() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("inventory {} does not exist", file_path),
        ));
    }
    let contents = fs::read_to_string(&file_path)?;
    contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_inventory_record)
        .collect()
}

/// Inventory IDs of the hosts, in file order.
pub fn get_hosts_from_inventory(inventory_dir: &str) -> io::Result<Vec<String>> {
    Ok(get_inventory_from_file(inventory_dir)?
        .into_iter()
        .map(|h| h.node_id)
        .collect())
}

pub fn get_host_map_from_inventory(inventory_dir: &str) -> io::Result<BTreeMap<String, Host>> {
    Ok(get_inventory_from_file(inventory_dir)?
        .into_iter()
        .map(|h| (h.node_id.clone(), h))
        .collect())
}

/// Rewrites the public IP of the hosts in the cloud ID to IP map,
/// keeping every other record unchanged.
pub fn update_inventory_host_public_ip(
    inventory_dir: &str,
    new_ips: &BTreeMap<String, String>,
) -> io::Result<()> {
    let mut hosts = get_inventory_from_file(inventory_dir)?;
    for h in hosts.iter_mut() {
        if let Some(ip) = new_ips.get(&h.get_cloud_id()) {
            log::info!("updating {} public IP {} -> {}", h.node_id, h.ip, ip);
            h.ip = ip.clone();
        }
    }
    write_inventory(inventory_dir, &hosts)
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- inventory::test_inventory --exact --show-output
#[test]
fn test_inventory() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    let tmp_dir = tempfile::tempdir().unwrap();
    let dir = tmp_dir.path().join("cluster").display().to_string();

    let ips = BTreeMap::from([
        (String::from("i-1"), String::from("10.0.0.1")),
        (String::from("i-2"), String::from("10.0.0.2")),
    ]);
    create_host_inventory(&dir, "/keys/k.pem", &ips).unwrap();

    let hosts = get_inventory_from_file(&dir).unwrap();
    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0].node_id, "aws_node_i-1");
    assert_eq!(hosts[0].ip, "10.0.0.1");
    assert_eq!(hosts[0].ssh_user, "ubuntu");
    assert_eq!(hosts[0].ssh_private_key_path, "/keys/k.pem");
    assert_eq!(
        hosts[0].ssh_common_args,
        "-o IdentitiesOnly=yes -o StrictHostKeyChecking=no"
    );

    assert_eq!(
        get_hosts_from_inventory(&dir).unwrap(),
        vec!["aws_node_i-1", "aws_node_i-2"]
    );

    update_inventory_host_public_ip(
        &dir,
        &BTreeMap::from([(String::from("i-2"), String::from("3.3.3.3"))]),
    )
    .unwrap();
    let m = get_host_map_from_inventory(&dir).unwrap();
    assert_eq!(m["aws_node_i-1"].ip, "10.0.0.1");
    assert_eq!(m["aws_node_i-2"].ip, "3.3.3.3");

    let h = parse_inventory_record(
        "gcp_node_x ansible_host=1.1.1.1 ansible_user=u ansible_ssh_private_key_file=/k ansible_ssh_common_args=''",
    )
    .unwrap();
    assert_eq!(h.get_cloud_id(), "x");
    assert!(h.ssh_common_args.is_empty());

    assert!(parse_inventory_record("aws_node_i-3 ansible_user=u").is_err());
    assert!(get_inventory_from_file(&tmp_dir.path().join("none").display().to_string()).is_err());
}
