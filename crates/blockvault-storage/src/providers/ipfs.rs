//! IPFS (kubo) HTTP RPC blob store client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use blockvault_core::config::IpfsConfig;
use blockvault_core::error::{AppError, ErrorKind};
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::ContentAddress;

/// Client for a kubo daemon's `/api/v0` RPC interface.
///
/// Every RPC call is a POST. Transport failures and timeouts surface as
/// `StorageUnavailable`; daemon replies that mention an unknown block
/// surface as `NotFound`.
#[derive(Debug, Clone)]
pub struct IpfsBlobStore {
    client: Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(rename = "Message")]
    message: String,
}

impl IpfsBlobStore {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: &IpfsConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build IPFS client", e)
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, command: &str, params: &[(&str, &str)]) -> AppResult<Url> {
        Url::parse_with_params(&format!("{}/api/v0/{command}", self.api_url), params).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid IPFS API URL: {}", self.api_url),
                e,
            )
        })
    }

    /// POST to an RPC command and return the successful response.
    async fn call(&self, command: &str, params: &[(&str, &str)], form: Option<Form>) -> AppResult<Response> {
        let url = self.endpoint(command, params)?;
        let mut request = self.client.post(url);
        if let Some(form) = form {
            request = request.multipart(form);
        }

        let response = request.send().await.map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RpcError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(rpc_error(command, status.as_u16(), &message))
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    let message = if e.is_timeout() {
        "IPFS daemon timed out"
    } else if e.is_connect() {
        "IPFS daemon is unreachable"
    } else {
        "IPFS request failed"
    };
    AppError::with_source(ErrorKind::StorageUnavailable, message, e)
}

fn rpc_error(command: &str, status: u16, message: &str) -> AppError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("not found") || lower.contains("no link named") {
        AppError::not_found(format!("IPFS {command}: {message}"))
    } else if lower.contains("invalid") && lower.contains("cid") {
        AppError::validation(format!("IPFS {command}: {message}"))
    } else {
        AppError::storage_unavailable(format!("IPFS {command} failed ({status}): {message}"))
    }
}

#[async_trait]
impl BlobStore for IpfsBlobStore {
    fn provider_type(&self) -> &str {
        "ipfs"
    }

    async fn health_check(&self) -> AppResult<bool> {
        match self.call("id", &[], None).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind == ErrorKind::StorageUnavailable => {
                warn!(api_url = %self.api_url, error = %e, "IPFS daemon health check failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn put(&self, data: Bytes) -> AppResult<ContentAddress> {
        let len = data.len() as u64;
        let part = Part::stream_with_length(Body::from(data), len).file_name("blob");
        let form = Form::new().part("file", part);

        let response = self.call("add", &[("pin", "false")], Some(form)).await?;
        let added: AddResponse = response.json().await.map_err(|e| {
            AppError::with_source(ErrorKind::Serialization, "Malformed IPFS add response", e)
        })?;

        let cid = ContentAddress::parse(&added.hash)?;
        debug!(cid = %cid, bytes = len, "Blob added to IPFS");
        Ok(cid)
    }

    async fn get(&self, cid: &ContentAddress) -> AppResult<Bytes> {
        let response = self
            .call("cat", &[("arg", cid.as_str()), ("offline", "true")], None)
            .await?;
        let data = response.bytes().await.map_err(transport_error)?;
        debug!(cid = %cid, bytes = data.len(), "Blob read from IPFS");
        Ok(data)
    }

    async fn pin(&self, cid: &ContentAddress) -> AppResult<()> {
        self.call("pin/add", &[("arg", cid.as_str())], None).await?;
        debug!(cid = %cid, "Pinned");
        Ok(())
    }

    async fn unpin(&self, cid: &ContentAddress) -> AppResult<()> {
        match self.call("pin/rm", &[("arg", cid.as_str())], None).await {
            Ok(_) => Ok(()),
            Err(e) if e.message.contains("not pinned") => Ok(()),
            Err(e) => Err(e),
        }
    }
}
