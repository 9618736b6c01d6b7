use std::{
    io::{self, Error, ErrorKind},
    path::Path,
    process::Stdio,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    process::Command,
    time::{sleep, timeout, Instant},
};

use crate::constants;

pub const AWS_CLOUD_SERVICE: &str = "aws";
pub const GCP_CLOUD_SERVICE: &str = "gcp";
pub const DOCKER_CLOUD_SERVICE: &str = "docker";

/// ssh exits with 255 when the connection itself failed.
const SSH_CONNECTION_ERROR_CODE: i32 = 255;

/// SSH connection descriptor of a remote node.
/// Every operation spawns the system "ssh"/"scp" clients
/// and is bounded by the given timeout.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct Host {
    /// Inventory ID (e.g., "aws_node_i-0123").
    pub node_id: String,
    pub ip: String,
    pub ssh_user: String,
    pub ssh_private_key_path: String,
    #[serde(default)]
    pub ssh_common_args: String,
    #[serde(default)]
    pub api_node: bool,
}

impl Host {
    /// Cloud ID with the inventory prefix stripped.
    /// Empty if the prefix is unknown.
    pub fn get_cloud_id(&self) -> String {
        match host_ansible_id_to_cloud_id(&self.node_id) {
            Ok((_, cloud_id)) => cloud_id,
            Err(_) => String::new(),
        }
    }

    pub fn inventory_record(&self) -> String {
        [
            self.node_id.clone(),
            format!("ansible_host={}", self.ip),
            format!("ansible_user={}", self.ssh_user),
            format!("ansible_ssh_private_key_file={}", self.ssh_private_key_path),
            format!("ansible_ssh_common_args='{}'", self.ssh_common_args),
        ]
        .join(" ")
    }

    /// Resolves "~" against the remote user's home.
    pub fn expand_home(&self, path: &str) -> String {
        let user_home = format!("/home/{}", self.ssh_user);
        if path.is_empty() {
            return user_home;
        }
        match path.strip_prefix('~') {
            Some(rest) => Path::new(&user_home)
                .join(rest.trim_start_matches('/'))
                .display()
                .to_string(),
            None => path.to_string(),
        }
    }

    fn ssh_base_args(&self) -> Vec<String> {
        let mut args = vec![
            String::from("-i"),
            self.ssh_private_key_path.clone(),
            String::from("-o"),
            format!(
                "ConnectTimeout={}",
                constants::SSH_CONNECT_TIMEOUT.as_secs()
            ),
            String::from("-o"),
            String::from("BatchMode=yes"),
        ];
        args.extend(
            self.ssh_common_args
                .split_whitespace()
                .map(|s| s.to_string()),
        );
        args
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.ssh_user, self.ip)
    }

    /// Runs the script through "bash -s" on the host and returns the combined output.
    /// Connection failures are retried, script failures are not.
    pub async fn command(&self, script: &str, timeout_dur: Duration) -> io::Result<Vec<u8>> {
        let mut last_err = Error::new(ErrorKind::Other, "ssh never ran");
        for round in 0..constants::SSH_CONNECT_RETRIES {
            let mut cmd = Command::new("ssh");
            cmd.args(self.ssh_base_args())
                .arg("-p")
                .arg(constants::SSH_PORT.to_string())
                .arg(self.destination())
                .arg("bash -s")
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let mut child = cmd.spawn()?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(script.as_bytes()).await?;
            }
            let output = match timeout(timeout_dur, child.wait_with_output()).await {
                Ok(res) => res?,
                Err(_) => {
                    return Err(Error::new(
                        ErrorKind::TimedOut,
                        format!("command timed out after {:?} for host {}", timeout_dur, self.ip),
                    ))
                }
            };

            let mut combined = output.stdout.clone();
            combined.extend_from_slice(&output.stderr);
            if output.status.success() {
                return Ok(combined);
            }

            let msg = format!(
                "command failed for host {} ({}): {}",
                self.ip,
                output.status,
                String::from_utf8_lossy(&combined).trim()
            );
            if output.status.code() != Some(SSH_CONNECTION_ERROR_CODE) {
                return Err(Error::new(ErrorKind::Other, msg));
            }
            log::warn!("[round {}] failed to connect to {} ({})", round + 1, self.ip, msg);
            last_err = Error::new(ErrorKind::ConnectionRefused, msg);
            sleep(Duration::from_millis(500 + random_manager::u64() % 100)).await;
        }
        Err(last_err)
    }

    async fn scp(&self, from: &str, to: &str, timeout_dur: Duration) -> io::Result<()> {
        let mut cmd = Command::new("scp");
        cmd.args(self.ssh_base_args())
            .arg("-P")
            .arg(constants::SSH_PORT.to_string())
            .arg(from)
            .arg(to)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(timeout_dur, cmd.output()).await {
            Ok(res) => res?,
            Err(_) => {
                return Err(Error::new(
                    ErrorKind::TimedOut,
                    format!("copy timed out after {:?} for host {}", timeout_dur, self.ip),
                ))
            }
        };
        if !output.status.success() {
            return Err(Error::new(
                ErrorKind::Other,
                format!(
                    "failed to copy '{}' to '{}' for host {}: {}",
                    from,
                    to,
                    self.ip,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(())
    }

    /// Uploads a local file to the host.
    pub async fn upload(
        &self,
        local_file: &str,
        remote_file: &str,
        timeout_dur: Duration,
    ) -> io::Result<()> {
        let remote = format!("{}:{}", self.destination(), self.expand_home(remote_file));
        self.scp(local_file, &remote, timeout_dur).await
    }

    /// Uploads in-memory bytes through a temporary local file.
    pub async fn upload_bytes(
        &self,
        data: &[u8],
        remote_file: &str,
        timeout_dur: Duration,
    ) -> io::Result<()> {
        let tmp = tempfile::NamedTempFile::new()?;
        std::fs::write(tmp.path(), data)?;
        let local = tmp.path().display().to_string();
        self.upload(&local, remote_file, timeout_dur).await
    }

    /// Downloads a remote file from the host.
    pub async fn download(
        &self,
        remote_file: &str,
        local_file: &str,
        timeout_dur: Duration,
    ) -> io::Result<()> {
        if let Some(parent) = Path::new(local_file).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let remote = format!("{}:{}", self.destination(), self.expand_home(remote_file));
        self.scp(&remote, local_file, timeout_dur).await
    }

    pub async fn mkdir_all(&self, remote_dir: &str, timeout_dur: Duration) -> io::Result<()> {
        let dir = self.expand_home(remote_dir);
        self.command(&format!("mkdir -p '{}'", dir), timeout_dur)
            .await
            .map(|_| ())
    }

    pub async fn file_exists(&self, remote_file: &str, timeout_dur: Duration) -> bool {
        let f = self.expand_home(remote_file);
        self.command(&format!("test -f '{}'", f), timeout_dur)
            .await
            .is_ok()
    }

    /// Sends a JSON-RPC request to the node's local API from the host itself.
    pub async fn post(&self, path: &str, body: &str, timeout_dur: Duration) -> io::Result<Vec<u8>> {
        let path = if path.is_empty() { "/ext/info" } else { path };
        let script = format!(
            "curl -s -X POST --header 'content-type:application/json;' --data '{}' {}{}",
            body,
            constants::LOCAL_API_ENDPOINT,
            path
        );
        self.command(&script, timeout_dur).await
    }

    /// Waits until the host accepts TCP connections on the given port.
    pub async fn wait_for_port(&self, port: u16, timeout_dur: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout_dur;
        let addr = format!("{}:{}", self.ip, port);
        loop {
            if Instant::now() > deadline {
                return Err(Error::new(
                    ErrorKind::TimedOut,
                    format!(
                        "port {} on host {} is not available after {:?}",
                        port, self.ip, timeout_dur
                    ),
                ));
            }
            match timeout(constants::SSH_CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
                Ok(Ok(_)) => return Ok(()),
                _ => sleep(Duration::from_secs(1)).await,
            }
        }
    }

    /// Waits until the host runs a shell over SSH.
    pub async fn wait_for_ssh_shell(&self, timeout_dur: Duration) -> io::Result<()> {
        if self.ip.is_empty() {
            return Err(Error::new(ErrorKind::InvalidInput, "host IP is empty"));
        }
        let deadline = Instant::now() + timeout_dur;
        self.wait_for_port(constants::SSH_PORT, timeout_dur).await?;
        loop {
            if Instant::now() > deadline {
                return Err(Error::new(
                    ErrorKind::TimedOut,
                    format!(
                        "SSH shell on host {} is not available after {:?}",
                        self.ip, timeout_dur
                    ),
                ));
            }
            if self.command("echo", timeout_dur).await.is_ok() {
                return Ok(());
            }
            sleep(Duration::from_secs(1)).await;
        }
    }
}

/// Converts an inventory ID into its cloud service and cloud ID.
pub fn host_ansible_id_to_cloud_id(ansible_id: &str) -> io::Result<(String, String)> {
    let (service, prefix) = if ansible_id.starts_with(constants::AWS_NODE_ANSIBLE_PREFIX) {
        (AWS_CLOUD_SERVICE, constants::AWS_NODE_ANSIBLE_PREFIX)
    } else if ansible_id.starts_with(constants::GCP_NODE_ANSIBLE_PREFIX) {
        (GCP_CLOUD_SERVICE, constants::GCP_NODE_ANSIBLE_PREFIX)
    } else if ansible_id.starts_with(constants::DOCKER_NODE_PREFIX) {
        (DOCKER_CLOUD_SERVICE, constants::DOCKER_NODE_PREFIX)
    } else {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("unknown cloud service prefix in {}", ansible_id),
        ));
    };
    let cloud_id = ansible_id
        .strip_prefix(&format!("{}_", prefix))
        .unwrap_or(ansible_id);
    Ok((service.to_string(), cloud_id.to_string()))
}

pub fn host_cloud_id_to_ansible_id(cloud_service: &str, cloud_id: &str) -> io::Result<String> {
    match cloud_service {
        AWS_CLOUD_SERVICE => Ok(format!("{}_{}", constants::AWS_NODE_ANSIBLE_PREFIX, cloud_id)),
        GCP_CLOUD_SERVICE => Ok(format!("{}_{}", constants::GCP_NODE_ANSIBLE_PREFIX, cloud_id)),
        DOCKER_CLOUD_SERVICE => Ok(format!("{}_{}", constants::DOCKER_NODE_PREFIX, cloud_id)),
        _ => Err(Error::new(
            ErrorKind::InvalidInput,
            format!("unknown cloud service {}", cloud_service),
        )),
    }
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- models::host::test_host_ids --exact --show-output
#[test]
fn test_host_ids() {
    let (svc, id) = host_ansible_id_to_cloud_id("aws_node_i-0123456789").unwrap();
    assert_eq!(svc, "aws");
    assert_eq!(id, "i-0123456789");

    let (svc, id) = host_ansible_id_to_cloud_id("gcp_node_abc").unwrap();
    assert_eq!(svc, "gcp");
    assert_eq!(id, "abc");

    let (svc, id) = host_ansible_id_to_cloud_id("docker_1").unwrap();
    assert_eq!(svc, "docker");
    assert_eq!(id, "1");

    let err = host_ansible_id_to_cloud_id("azure_node_x").unwrap_err();
    assert!(err.to_string().contains("unknown cloud service prefix in azure_node_x"));

    assert_eq!(
        host_cloud_id_to_ansible_id("aws", "i-0123456789").unwrap(),
        "aws_node_i-0123456789"
    );
    assert!(host_cloud_id_to_ansible_id("azure", "x").is_err());

    let host = Host {
        node_id: String::from("aws_node_i-abc"),
        ip: String::from("1.2.3.4"),
        ssh_user: String::from("ubuntu"),
        ssh_private_key_path: String::from("/tmp/key.pem"),
        ssh_common_args: String::from("-o StrictHostKeyChecking=no"),
        api_node: false,
    };
    assert_eq!(host.get_cloud_id(), "i-abc");
    assert_eq!(
        host.inventory_record(),
        "aws_node_i-abc ansible_host=1.2.3.4 ansible_user=ubuntu ansible_ssh_private_key_file=/tmp/key.pem ansible_ssh_common_args='-o StrictHostKeyChecking=no'"
    );
    assert_eq!(host.expand_home("~/.avalanchego"), "/home/ubuntu/.avalanchego");
    assert_eq!(host.expand_home(""), "/home/ubuntu");
    assert_eq!(host.expand_home("/etc/hosts"), "/etc/hosts");
}
