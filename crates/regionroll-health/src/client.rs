//! HTTP implementation of [`RegionTarget`].
//!
//! Each query opens a fresh HTTP/1 connection to the region endpoint,
//! bounded by a per-request timeout.

use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Empty};
use tracing::debug;

use regionroll_core::Region;

use crate::error::ProbeError;
use crate::target::{BoxFuture, HealthReport, RegionTarget, ServiceInfo};

/// Queries region services over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegionClient {
    timeout: Duration,
}

#[derive(serde::Deserialize)]
struct HealthBody {
    status: String,
}

impl HttpRegionClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Fetch `GET /` from a region.
    pub async fn service_info(&self, address: &str) -> Result<ServiceInfo, ProbeError> {
        let uri = format!("http://{address}/");
        let (status, body) = self.get(address, "/").await?;
        if !status.is_success() {
            return Err(ProbeError::Status {
                uri,
                status: status.as_u16(),
            });
        }
        serde_json::from_slice(&body).map_err(|e| ProbeError::Decode {
            uri,
            reason: e.to_string(),
        })
    }

    /// Fetch `GET /health` from a region.
    ///
    /// Only a 2xx response whose body reports `"status": "healthy"` counts
    /// as healthy; any other answer is an unhealthy report, not an error.
    pub async fn check_health(&self, address: &str) -> Result<HealthReport, ProbeError> {
        let (status, body) = self.get(address, "/health").await?;

        let reported = serde_json::from_slice::<HealthBody>(&body).map(|b| b.status);
        match reported {
            Ok(s) if status.is_success() && s == "healthy" => Ok(HealthReport::Healthy),
            Ok(s) => Ok(HealthReport::Unhealthy(format!("status {}: {s}", status.as_u16()))),
            Err(_) => Ok(HealthReport::Unhealthy(format!(
                "status {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body).trim()
            ))),
        }
    }

    async fn get(&self, address: &str, path: &str) -> Result<(StatusCode, Bytes), ProbeError> {
        match tokio::time::timeout(self.timeout, fetch(address, path)).await {
            Ok(result) => result,
            Err(_) => {
                let uri = format!("http://{address}{path}");
                debug!(%uri, "region query timed out");
                Err(ProbeError::Timeout {
                    uri,
                    timeout: self.timeout,
                })
            }
        }
    }
}

impl RegionTarget for HttpRegionClient {
    fn running_version<'a>(&'a self, region: &'a Region) -> BoxFuture<'a, Result<String, ProbeError>> {
        Box::pin(async move { Ok(self.service_info(&region.endpoint).await?.version) })
    }

    fn health<'a>(&'a self, region: &'a Region) -> BoxFuture<'a, Result<HealthReport, ProbeError>> {
        Box::pin(self.check_health(&region.endpoint))
    }
}

async fn fetch(address: &str, path: &str) -> Result<(StatusCode, Bytes), ProbeError> {
    let uri = format!("http://{address}{path}");

    let stream = tokio::net::TcpStream::connect(address)
        .await
        .map_err(|e| {
            debug!(error = %e, %uri, "region connection failed");
            ProbeError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| ProbeError::Handshake {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::builder()
        .method("GET")
        .uri(path)
        .header("host", address)
        .header("user-agent", concat!("regionroll/", env!("CARGO_PKG_VERSION")))
        .body(Empty::<Bytes>::new())
        .map_err(|e| ProbeError::Request {
            uri: uri.clone(),
            reason: e.to_string(),
        })?;

    let resp = sender.send_request(req).await.map_err(|e| ProbeError::Request {
        uri: uri.clone(),
        reason: e.to_string(),
    })?;

    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| ProbeError::Request {
            uri: uri.clone(),
            reason: e.to_string(),
        })?
        .to_bytes();

    debug!(%uri, status = status.as_u16(), "region query answered");
    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_port_is_a_connect_error() {
        let client = HttpRegionClient::new(Duration::from_millis(200));
        let err = client.service_info("127.0.0.1:1").await.unwrap_err();
        assert!(
            matches!(err, ProbeError::Connect { .. } | ProbeError::Timeout { .. }),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn health_on_closed_port_is_an_error_not_a_report() {
        let client = HttpRegionClient::new(Duration::from_millis(200));
        let region = Region::new("us-west", "127.0.0.1:1", "v1");
        assert!(client.health(&region).await.is_err());
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = HttpRegionClient::new(Duration::from_millis(100));
        let err = client.check_health(&addr).await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));
    }
}
