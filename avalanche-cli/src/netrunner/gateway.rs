use std::io::{self, Error, ErrorKind};

use reqwest::{Client, ClientBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::{
    constants,
    netrunner::{
        missing_cluster_info, AddNodeRequest, BlockchainSpec, ClusterInfo, LoadSnapshotRequest,
        NetworkRunner, RestartNodeRequest, StartRequest,
    },
};

/// Error body of the gateway ("google.rpc.Status").
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StatusError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ClusterInfoResponse {
    cluster_info: Option<ClusterInfo>,
}

/// Network-runner client over the server's HTTP/JSON gateway.
#[derive(Debug, Clone)]
pub struct Gateway {
    endpoint: String,
    cli: Client,
}

impl Gateway {
    pub fn new(endpoint: &str) -> io::Result<Self> {
        let cli = ClientBuilder::new()
            .user_agent(env!("CARGO_PKG_NAME"))
            .timeout(constants::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::new(
                    ErrorKind::Other,
                    format!("failed ClientBuilder build {}", e),
                )
            })?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            cli,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        req: &Req,
    ) -> io::Result<Resp> {
        let url = format!("{}{}", self.endpoint, path);
        log::debug!("posting to {}", url);

        let resp = self.cli.post(&url).json(req).send().await.map_err(|e| {
            Error::new(
                ErrorKind::ConnectionRefused,
                format!("failed to reach network-runner at {} ({})", url, e),
            )
        })?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::new(ErrorKind::Other, format!("failed to read {} ({})", url, e)))?;

        if !status.is_success() {
            let msg = match serde_json::from_slice::<StatusError>(&body) {
                Ok(s) if !s.message.is_empty() => format!("{} (code {})", s.message, s.code),
                _ => String::from_utf8_lossy(&body).trim().to_string(),
            };
            return Err(Error::new(
                ErrorKind::Other,
                format!("network-runner {} failed: {}", path, msg),
            ));
        }
        serde_json::from_slice(&body).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("failed to decode {} response ({})", path, e),
            )
        })
    }

    async fn post_cluster_info<Req: Serialize>(
        &self,
        path: &str,
        req: &Req,
    ) -> io::Result<ClusterInfo> {
        let resp: ClusterInfoResponse = self.post(path, req).await?;
        resp.cluster_info.ok_or_else(missing_cluster_info)
    }
}

impl NetworkRunner for Gateway {
    async fn ping(&self) -> io::Result<()> {
        let _: serde_json::Value = self.post("/v1/ping", &json!({})).await?;
        Ok(())
    }

    async fn start(&self, req: StartRequest) -> io::Result<ClusterInfo> {
        log::info!(
            "starting {} node(s) with root '{}'",
            req.num_nodes,
            req.root_data_dir
        );
        self.post_cluster_info("/v1/control/start", &req).await
    }

    async fn health(&self) -> io::Result<ClusterInfo> {
        self.post_cluster_info("/v1/control/health", &json!({})).await
    }

    async fn status(&self) -> io::Result<ClusterInfo> {
        self.post_cluster_info("/v1/control/status", &json!({})).await
    }

    async fn stop(&self) -> io::Result<()> {
        log::info!("stopping network");
        let _: serde_json::Value = self.post("/v1/control/stop", &json!({})).await?;
        Ok(())
    }

    async fn add_node(&self, req: AddNodeRequest) -> io::Result<ClusterInfo> {
        log::info!("adding node {}", req.name);
        self.post_cluster_info("/v1/control/addnode", &req).await
    }

    async fn restart_node(&self, req: RestartNodeRequest) -> io::Result<ClusterInfo> {
        log::info!("restarting node {}", req.name);
        self.post_cluster_info("/v1/control/restartnode", &req).await
    }

    async fn load_snapshot(&self, req: LoadSnapshotRequest) -> io::Result<ClusterInfo> {
        log::info!("loading snapshot {}", req.snapshot_name);
        self.post_cluster_info("/v1/control/loadsnapshot", &req)
            .await
    }

    async fn save_snapshot(&self, snapshot_name: &str) -> io::Result<()> {
        log::info!("saving snapshot {}", snapshot_name);
        let _: serde_json::Value = self
            .post(
                "/v1/control/savesnapshot",
                &json!({ "snapshotName": snapshot_name }),
            )
            .await?;
        Ok(())
    }

    async fn remove_snapshot(&self, snapshot_name: &str) -> io::Result<()> {
        log::info!("removing snapshot {}", snapshot_name);
        let _: serde_json::Value = self
            .post(
                "/v1/control/removesnapshot",
                &json!({ "snapshotName": snapshot_name }),
            )
            .await?;
        Ok(())
    }

    async fn create_blockchains(&self, specs: Vec<BlockchainSpec>) -> io::Result<ClusterInfo> {
        log::info!("creating {} blockchain(s)", specs.len());
        self.post_cluster_info(
            "/v1/control/createblockchains",
            &json!({ "blockchainSpecs": specs }),
        )
        .await
    }
}
