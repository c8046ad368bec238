// src/health/probes.rs
// Ready-made procedures for the usual network dependencies.
use super::{Procedure, ProcedureError, Status};
use async_trait::async_trait;
use reqwest::Client;
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

/// UP when a TCP connection to `address` can be opened.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Procedure for TcpProbe {
    async fn check(&self) -> Result<Status, ProcedureError> {
        match TcpStream::connect(&self.address).await {
            Ok(_) => Ok(Status::ok().with("address", self.address.as_str())),
            Err(e) => {
                debug!("TCP probe to {} failed: {}", self.address, e);
                Err(ProcedureError::failed(format!(
                    "Connection to {} failed: {}",
                    self.address, e
                )))
            }
        }
    }
}

/// UP when a GET on `url` answers with a 2xx status.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: Url,
    client: Client,
}

impl HttpProbe {
    pub fn new(url: Url) -> Self {
        Self::with_client(url, Client::new())
    }

    pub fn with_client(url: Url, client: Client) -> Self {
        Self { url, client }
    }
}

#[async_trait]
impl Procedure for HttpProbe {
    async fn check(&self) -> Result<Status, ProcedureError> {
        let response = self.client.get(self.url.clone()).send().await.map_err(|e| {
            debug!("HTTP probe to {} failed: {}", self.url, e);
            ProcedureError::failed(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(Status::ok().with("status-code", status.as_u16()))
        } else {
            Err(ProcedureError::failed(format!("HTTP {}", status)))
        }
    }
}
