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

use std::future::Future;

use alloy::{
    eips::BlockNumberOrTag,
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::client::RpcClient,
    transports::http::Http,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use url::Url;

use crate::{ports::ExecutionClient, types::ExecutionHeader};

/// Execution client backed by an alloy provider.
#[derive(Clone)]
pub struct RpcExecutionClient<P> {
    provider: P,
    max_concurrent_requests: usize,
}

impl RpcExecutionClient<RootProvider> {
    /// Connects over HTTP with a connection pool sized for `max_concurrent_requests`.
    pub fn connect(url: Url, max_concurrent_requests: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(max_concurrent_requests)
            .build()
            .context("Failed to build HTTP client")?;
        let rpc_client = RpcClient::new(Http::with_client(client, url), false);
        let provider =
            ProviderBuilder::new().disable_recommended_fillers().connect_client(rpc_client);

        Ok(Self::new(provider, max_concurrent_requests))
    }
}

impl<P> RpcExecutionClient<P>
where
    P: Provider,
{
    pub fn new(provider: P, max_concurrent_requests: usize) -> Self {
        Self { provider, max_concurrent_requests }
    }

    /// Upper bound on simultaneous requests downstream stages should issue through this client.
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn header(&self, tag: BlockNumberOrTag) -> Result<Option<ExecutionHeader>> {
        let block = self
            .provider
            .get_block_by_number(tag)
            .await
            .with_context(|| format!("Failed to get block {tag}"))?;
        Ok(block.map(|block| ExecutionHeader {
            number: block.header.number,
            hash: block.header.hash,
            timestamp: block.header.timestamp,
        }))
    }

    async fn required_header(&self, number: u64) -> Result<ExecutionHeader> {
        self.header(BlockNumberOrTag::Number(number))
            .await?
            .with_context(|| format!("Block {number} not found"))
    }
}

#[async_trait]
impl<P> ExecutionClient for RpcExecutionClient<P>
where
    P: Provider + Send + Sync,
{
    async fn header_by_number(&self, number: Option<u64>) -> Result<Option<ExecutionHeader>> {
        let tag = number.map(BlockNumberOrTag::Number).unwrap_or(BlockNumberOrTag::Latest);
        self.header(tag).await
    }

    async fn header_by_time(&self, timestamp: u64) -> Result<ExecutionHeader> {
        let latest = self
            .header(BlockNumberOrTag::Latest)
            .await?
            .context("Execution client returned no latest block")?;
        latest_at_or_before(latest, timestamp, |number| self.required_header(number)).await
    }
}

/// Binary search for the last block with a timestamp `<= timestamp`, given the chain head.
///
/// Block timestamps are strictly increasing with the block number.
async fn latest_at_or_before<F, Fut>(
    latest: ExecutionHeader,
    timestamp: u64,
    fetch: F,
) -> Result<ExecutionHeader>
where
    F: Fn(u64) -> Fut,
    Fut: Future<Output = Result<ExecutionHeader>>,
{
    if latest.timestamp <= timestamp {
        return Ok(latest);
    }

    let (mut low, mut high) = (0, latest.number);
    let mut best = None;
    while low <= high {
        let mid = low + (high - low) / 2;
        let header = fetch(mid).await?;
        if header.timestamp <= timestamp {
            best = Some(header);
            low = mid + 1;
        } else if mid == 0 {
            break;
        } else {
            high = mid - 1;
        }
    }

    match best {
        Some(header) => {
            tracing::debug!(
                "Block {} (time {}) is the latest at or before {}",
                header.number,
                header.timestamp,
                timestamp
            );
            Ok(header)
        }
        None => bail!("No execution block found at or before time {timestamp}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::header_for_block;
    use std::sync::Mutex;

    fn chain(len: u64, block_time: u64, first_timestamp: u64) -> Vec<ExecutionHeader> {
        (0..len).map(|n| header_for_block(n, first_timestamp + n * block_time)).collect()
    }

    #[tokio::test]
    async fn test_latest_at_or_before_between_blocks() {
        let chain = chain(1000, 13, 100);
        let latest = *chain.last().unwrap();
        let fetched = Mutex::new(0);

        // Block 500 is at 6600, block 501 at 6613
        let header = latest_at_or_before(latest, 6610, |n| {
            *fetched.lock().unwrap() += 1;
            let header = chain[n as usize];
            async move { Ok(header) }
        })
        .await
        .unwrap();

        assert_eq!(header.number, 500);
        assert!(*fetched.lock().unwrap() <= 11);
    }

    #[tokio::test]
    async fn test_latest_at_or_before_exact_timestamp() {
        let chain = chain(64, 12, 0);
        let latest = *chain.last().unwrap();

        let header = latest_at_or_before(latest, 12 * 40, |n| {
            let header = chain[n as usize];
            async move { Ok(header) }
        })
        .await
        .unwrap();
        assert_eq!(header.number, 40);
    }

    #[tokio::test]
    async fn test_latest_at_or_before_head_is_early_enough() {
        let chain = chain(10, 12, 0);
        let latest = *chain.last().unwrap();

        let header = latest_at_or_before(latest, 10_000, |_| async {
            Err(anyhow::anyhow!("no fetch expected"))
        })
        .await
        .unwrap();
        assert_eq!(header, latest);
    }

    #[tokio::test]
    async fn test_latest_at_or_before_predates_chain() {
        let chain = chain(10, 12, 1000);
        let latest = *chain.last().unwrap();

        let err = latest_at_or_before(latest, 999, |n| {
            let header = chain[n as usize];
            async move { Ok(header) }
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("No execution block found at or before time 999"));
    }

    #[tokio::test]
    async fn test_connect_keeps_concurrency_hint() {
        let client =
            RpcExecutionClient::connect(Url::parse("http://localhost:8545").unwrap(), 200).unwrap();
        assert_eq!(client.max_concurrent_requests(), 200);
    }
}
