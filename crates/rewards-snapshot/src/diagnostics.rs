// Copyright 2026 Boundless Foundation, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Liveness endpoint for long tree generation runs.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

pub const HEALTH_PATH: &str = "health";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn app() -> Router {
    Router::new().route(&format!("/{HEALTH_PATH}"), get(health))
}

/// Binds `port` on all interfaces and serves [app] in the background.
///
/// Port 0 picks a free port; the bound address is returned.
pub async fn serve(port: u16) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        .await
        .context("Failed to bind a TCP listener")?;
    let addr = listener.local_addr().context("Failed to get listener address")?;

    tracing::info!("Diagnostics listening on: {}", addr);
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app()).await {
            tracing::error!("Diagnostics server failed: {:?}", err);
        }
    });

    Ok((addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let (addr, handle) = serve(0).await.unwrap();

        let status: HealthStatus =
            reqwest::get(format!("http://127.0.0.1:{}/{HEALTH_PATH}", addr.port()))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();

        assert_eq!(status.status, "healthy");
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
        handle.abort();
    }
}
