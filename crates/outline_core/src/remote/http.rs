//! reqwest-backed outline remote.

use crate::config::ClientConfig;
use crate::model::address::Address;
use crate::remote::{
    CreatedRecord, NodeRecord, OutlineRemote, RemoteError, RemoteMethod, RemoteResult,
    RenameRecord, RenameRequest,
};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Outline remote speaking JSON over HTTP.
///
/// Node addresses are server-relative paths; each one is appended to
/// `base_url` to build the request URL.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    /// Builds a client with the configured base URL and request timeout.
    pub fn new(config: &ClientConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self::with_client(client, config.base_url.as_str()))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Resolves one node address to an absolute request URL.
    pub fn url_for(&self, address: &Address) -> String {
        let raw = address.as_str();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return raw.to_string();
        }
        if raw.starts_with('/') {
            format!("{}{raw}", self.base_url)
        } else {
            format!("{}/{raw}", self.base_url)
        }
    }

    async fn send(
        &self,
        method: RemoteMethod,
        address: &Address,
        body: Option<&RenameRequest>,
    ) -> RemoteResult<Response> {
        let url = self.url_for(address);
        debug!("event=remote_request module=remote method={method} url={url}");

        let request = match method {
            RemoteMethod::Get => self.client.get(url.as_str()),
            RemoteMethod::Post => self
                .client
                .post(url.as_str())
                .header(reqwest::header::CONTENT_TYPE, "application/json"),
            RemoteMethod::Put => self.client.put(url.as_str()),
            RemoteMethod::Delete => self.client.delete(url.as_str()),
        };
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                method,
                address: address.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl OutlineRemote for HttpRemote {
    async fn fetch(&self, address: &Address) -> RemoteResult<NodeRecord> {
        let response = self.send(RemoteMethod::Get, address, None).await?;
        decode(response).await
    }

    async fn create(&self, parent: &Address) -> RemoteResult<CreatedRecord> {
        let response = self.send(RemoteMethod::Post, parent, None).await?;
        decode(response).await
    }

    async fn rename(&self, address: &Address, name: &str) -> RemoteResult<RenameRecord> {
        let body = RenameRequest {
            name: name.to_string(),
        };
        let response = self.send(RemoteMethod::Put, address, Some(&body)).await?;
        decode(response).await
    }

    async fn delete(&self, address: &Address) -> RemoteResult<()> {
        // 204 without a body; only the status matters.
        self.send(RemoteMethod::Delete, address, None).await?;
        Ok(())
    }
}
