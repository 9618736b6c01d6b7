//! Minimal AvalancheGo JSON-RPC client.
use std::{
    collections::HashMap,
    io::{self, Error, ErrorKind},
    time::Duration,
};

use reqwest::ClientBuilder;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

/// Returned by "info.isBootstrapped" before the node knows the chain.
pub const NO_CHAIN_ERROR: &str = "there is no chain with alias/ID";

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone)]
pub struct Response<T> {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// ref. https://docs.avax.network/reference/avalanchego/info-api#infoisbootstrapped
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IsBootstrappedResult {
    pub is_bootstrapped: bool,
}

/// ref. https://docs.avax.network/reference/avalanchego/info-api#infogetnodeid
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
pub struct GetNodeIdResult {
    #[serde(rename = "nodeID")]
    pub node_id: String,
}

/// ref. https://docs.avax.network/reference/avalanchego/info-api#infogetnodeversion
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetNodeVersionResult {
    pub version: String,
    #[serde(default)]
    pub database_version: String,
    #[serde(default)]
    pub rpc_protocol_version: serde_json::Value,
    #[serde(default)]
    pub git_commit: String,
    #[serde(default)]
    pub vm_versions: HashMap<String, String>,
}

impl GetNodeVersionResult {
    /// RPC protocol version, returned as a string or a number depending on the release.
    pub fn rpc_version(&self) -> Option<u32> {
        match &self.rpc_protocol_version {
            serde_json::Value::Number(n) => n.as_u64().map(|v| v as u32),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// ref. https://docs.avax.network/reference/avalanchego/health-api
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
pub struct HealthResult {
    pub healthy: bool,
}

/// ref. https://docs.avax.network/reference/avalanchego/p-chain/api#platformgetblockchainstatus
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Default)]
pub struct GetBlockchainStatusResult {
    pub status: String,
}

pub fn request_body(method: &str, params: Option<serde_json::Value>) -> String {
    let mut v = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
    });
    if let Some(p) = params {
        v["params"] = p;
    }
    v.to_string()
}

/// Decodes a JSON-RPC response, turning an "error" object into an io::Error.
pub fn parse_response<T: DeserializeOwned>(b: &[u8]) -> io::Result<T> {
    let resp: Response<T> = serde_json::from_slice(b).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!(
                "failed to decode response '{}' ({})",
                String::from_utf8_lossy(b).trim(),
                e
            ),
        )
    })?;
    if let Some(err) = resp.error {
        return Err(Error::new(ErrorKind::Other, err.message));
    }
    match resp.result {
        Some(r) => Ok(r),
        None => Err(Error::new(ErrorKind::InvalidData, "response has no result")),
    }
}

pub async fn post(url: &str, body: String) -> io::Result<Vec<u8>> {
    let cli = ClientBuilder::new()
        .user_agent(env!("CARGO_PKG_NAME"))
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|e| {
            Error::new(
                ErrorKind::Other,
                format!("failed ClientBuilder build {}", e),
            )
        })?;
    let resp = cli
        .post(url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| Error::new(ErrorKind::Other, format!("failed to post {} ({})", url, e)))?;
    let out = resp
        .bytes()
        .await
        .map_err(|e| Error::new(ErrorKind::Other, format!("failed to read {} ({})", url, e)))?;
    Ok(out.to_vec())
}

async fn call<T: DeserializeOwned>(
    uri: &str,
    path: &str,
    method: &str,
    params: Option<serde_json::Value>,
) -> io::Result<T> {
    let url = format!("{}{}", uri.trim_end_matches('/'), path);
    log::debug!("calling {} on {}", method, url);
    let b = post(&url, request_body(method, params)).await?;
    parse_response(&b)
}

pub async fn is_bootstrapped(uri: &str, chain: &str) -> io::Result<bool> {
    let r: IsBootstrappedResult = call(
        uri,
        "/ext/info",
        "info.isBootstrapped",
        Some(json!({ "chain": chain })),
    )
    .await?;
    Ok(r.is_bootstrapped)
}

pub async fn get_node_id(uri: &str) -> io::Result<String> {
    let r: GetNodeIdResult = call(uri, "/ext/info", "info.getNodeID", None).await?;
    Ok(r.node_id)
}

pub async fn get_node_version(uri: &str) -> io::Result<GetNodeVersionResult> {
    call(uri, "/ext/info", "info.getNodeVersion", None).await
}

pub async fn health(uri: &str) -> io::Result<bool> {
    let r: HealthResult = call(
        uri,
        "/ext/health",
        "health.health",
        Some(json!({ "tags": ["P"] })),
    )
    .await?;
    Ok(r.healthy)
}

pub async fn get_blockchain_status(uri: &str, blockchain_id: &str) -> io::Result<String> {
    let r: GetBlockchainStatusResult = call(
        uri,
        "/ext/bc/P",
        "platform.getBlockchainStatus",
        Some(json!({ "blockchainID": blockchain_id })),
    )
    .await?;
    Ok(r.status)
}

/// "eth_chainId" against a full RPC URL (e.g., "<uri>/ext/bc/<id>/rpc").
pub async fn eth_chain_id(rpc_url: &str) -> io::Result<String> {
    let b = post(rpc_url, request_body("eth_chainId", Some(json!([])))).await?;
    parse_response(&b)
}

/// Node RPC seam used by the local cluster lifecycle.
#[allow(async_fn_in_trait)]
pub trait NodeClient {
    async fn is_bootstrapped(&self, uri: &str, chain: &str) -> io::Result<bool>;
    async fn get_blockchain_status(&self, uri: &str, blockchain_id: &str) -> io::Result<String>;
    async fn eth_chain_id(&self, rpc_url: &str) -> io::Result<String>;
}

/// Talks to the nodes over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpNodeClient;

impl NodeClient for HttpNodeClient {
    async fn is_bootstrapped(&self, uri: &str, chain: &str) -> io::Result<bool> {
        is_bootstrapped(uri, chain).await
    }
    async fn get_blockchain_status(&self, uri: &str, blockchain_id: &str) -> io::Result<String> {
        get_blockchain_status(uri, blockchain_id).await
    }
    async fn eth_chain_id(&self, rpc_url: &str) -> io::Result<String> {
        eth_chain_id(rpc_url).await
    }
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- jsonrpc::test_parse_response --exact --show-output
#[test]
fn test_parse_response() {
    let r: IsBootstrappedResult =
        parse_response(br#"{"jsonrpc":"2.0","result":{"isBootstrapped":true},"id":1}"#).unwrap();
    assert!(r.is_bootstrapped);

    let err = parse_response::<IsBootstrappedResult>(
        br#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"there is no chain with alias/ID of 'abc'"},"id":1}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains(NO_CHAIN_ERROR));

    assert!(parse_response::<IsBootstrappedResult>(b"curl: (7) Failed to connect").is_err());

    let v: GetNodeVersionResult = parse_response(
        br#"{"jsonrpc":"2.0","result":{"version":"avalanchego/1.10.9","databaseVersion":"v1.4.5","rpcProtocolVersion":"28","gitCommit":"abc","vmVersions":{"platform":"v1.10.9"}},"id":1}"#,
    )
    .unwrap();
    assert_eq!(v.version, "avalanchego/1.10.9");
    assert_eq!(v.rpc_version(), Some(28));

    let id: String =
        parse_response(br#"{"jsonrpc":"2.0","id":1,"result":"0xa868"}"#).unwrap();
    assert_eq!(id, "0xa868");

    let body = request_body("info.isBootstrapped", Some(json!({"chain": "X"})));
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["method"], "info.isBootstrapped");
    assert_eq!(v["params"]["chain"], "X");
}
