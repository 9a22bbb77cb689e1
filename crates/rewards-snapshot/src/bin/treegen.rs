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

use std::path::PathBuf;

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser};
use rewards_snapshot::{
    diagnostics, BeaconClient, ConsensusClient, EpochTimeConverter, Network,
    PastIntervalReconstructor, RewardsPoolReader, RpcExecutionClient, Settings, SnapshotResolver,
};
use serde::Serialize;
use url::Url;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Resolves the snapshot boundary of a rewards interval",
    long_about = None
)]
struct MainArgs {
    /// Interval to reconstruct. Negative values select the current, still open interval.
    #[clap(short, long, default_value = "-1", allow_negative_numbers = true)]
    interval: i64,
    /// URL of the execution client's JSON-RPC endpoint.
    #[clap(short, long, env, default_value = "http://localhost:8545")]
    ec_endpoint: Url,
    /// URL of the beacon node's REST API.
    #[clap(short, long, env, default_value = "http://localhost:5052")]
    bn_endpoint: Url,
    /// End the interval at the last proposed block of this epoch instead.
    #[clap(short, long)]
    target_epoch: Option<u64>,
    #[clap(flatten)]
    contract: ContractAddress,
    /// Print the current interval's boundaries and exit.
    #[clap(short, long)]
    network_info: bool,
    /// Pretty-print the JSON output. Pass `-p false` for compact output.
    #[clap(
        short,
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pretty_print: bool,
    /// Path to a TOML settings file.
    #[clap(long)]
    config: Option<PathBuf>,
    /// Serve a health endpoint on this port while running.
    #[clap(long, env)]
    diagnostics_port: Option<u16>,
}

#[derive(Args, Clone, Debug)]
#[group(required = true, multiple = false)]
struct ContractAddress {
    /// Address of the protocol storage contract the rewards pool is registered in.
    #[clap(long, env)]
    storage_address: Option<Address>,
    /// Address of the rewards pool contract.
    #[clap(long, env)]
    rewards_pool_address: Option<Address>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment variables from {:?}", path),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => bail!("failed to load .env file: {}", e),
    }

    let args = MainArgs::parse();

    let output = run(&args).await?;
    println!("{output}");

    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json =
        if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    json.context("Failed to serialize output")
}

/// Resolves the requested boundary and returns it as JSON.
async fn run(args: &MainArgs) -> Result<String> {
    let settings = match &args.config {
        Some(path) => Settings::load(path).await?,
        None => Settings::default(),
    };

    let _diagnostics = match args.diagnostics_port {
        Some(port) => Some(diagnostics::serve(port).await?),
        None => None,
    };

    let beacon = BeaconClient::new(args.bn_endpoint.clone())?;
    let chain_config =
        beacon.get_chain_config().await.context("Failed to get beacon chain config")?;
    let network = Network::from_chain_id(chain_config.chain_id)?;
    tracing::info!("Beacon node is configured for {}", network);

    let execution =
        RpcExecutionClient::connect(args.ec_endpoint.clone(), settings.max_concurrent_requests)?;
    let provider = execution.provider().clone();
    let protocol = match (args.contract.storage_address, args.contract.rewards_pool_address) {
        (Some(storage), _) => RewardsPoolReader::from_storage(provider, storage, &settings).await?,
        (None, Some(pool)) => RewardsPoolReader::new(provider, pool, &settings),
        (None, None) => bail!("Either a storage or a rewards pool address is required"),
    };
    let converter = EpochTimeConverter::new(&chain_config)?;

    if args.network_info {
        let resolver = SnapshotResolver::new(&beacon, &execution, &protocol, converter);
        let info = resolver.network_info().await?;
        return to_json(&info, args.pretty_print);
    }

    let coordinate = match u64::try_from(args.interval) {
        Ok(index) => {
            tracing::info!("Reconstructing interval {}", index);
            let reconstructor =
                PastIntervalReconstructor::new(&beacon, &execution, &protocol, converter);
            let reconstruction = reconstructor.reconstruct(index, args.target_epoch).await?;
            reconstruction.coordinate
        }
        Err(_) => {
            tracing::info!("Resolving the current interval");
            let resolver = SnapshotResolver::new(&beacon, &execution, &protocol, converter);
            resolver.resolve_current_with_target(args.target_epoch).await?
        }
    };

    to_json(&coordinate, args.pretty_print)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_args() {
        MainArgs::command().debug_assert();

        let args = MainArgs::try_parse_from([
            "treegen",
            "--rewards-pool-address",
            "0xee4d2a71cf479e0d3d0c3c2c923dbfeb57e73111",
        ])
        .unwrap();
        assert_eq!(args.interval, -1);
        assert_eq!(args.bn_endpoint.as_str(), "http://localhost:5052/");
        assert!(args.target_epoch.is_none());

        let args = MainArgs::try_parse_from([
            "treegen",
            "-i",
            "4",
            "-t",
            "150000",
            "--storage-address",
            "0x1d8f8f00cfa6758d7be78336684788fb0ee0fa46",
        ])
        .unwrap();
        assert_eq!(args.interval, 4);
        assert_eq!(args.target_epoch, Some(150000));
    }

    #[test]
    fn test_args_pretty_print_defaults_on() {
        let address = "0xee4d2a71cf479e0d3d0c3c2c923dbfeb57e73111";
        let parse = |extra: &[&str]| {
            let mut argv = vec!["treegen", "--rewards-pool-address", address];
            argv.extend_from_slice(extra);
            MainArgs::try_parse_from(argv).unwrap().pretty_print
        };

        assert!(parse(&[]));
        assert!(parse(&["-p"]));
        assert!(!parse(&["-p", "false"]));
        assert!(!parse(&["--pretty-print=false"]));
    }

    #[test]
    fn test_args_require_one_contract_address() {
        assert!(MainArgs::try_parse_from(["treegen"]).is_err());
        assert!(MainArgs::try_parse_from([
            "treegen",
            "--storage-address",
            "0x1d8f8f00cfa6758d7be78336684788fb0ee0fa46",
            "--rewards-pool-address",
            "0xee4d2a71cf479e0d3d0c3c2c923dbfeb57e73111",
        ])
        .is_err());
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_network() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/eth/v1/beacon/genesis");
            then.status(200).json_body(json!({ "data": { "genesis_time": "1606824023" } }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/eth/v1/config/spec");
            then.status(200).json_body(json!({
                "data": { "SECONDS_PER_SLOT": "12", "SLOTS_PER_EPOCH": "32" }
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/eth/v1/config/deposit_contract");
            then.status(200).json_body(json!({ "data": { "chain_id": "1337" } }));
        });

        let base_url = server.base_url();
        let args = MainArgs::try_parse_from([
            "treegen",
            "-b",
            base_url.as_str(),
            "--rewards-pool-address",
            "0xee4d2a71cf479e0d3d0c3c2c923dbfeb57e73111",
        ])
        .unwrap();

        let err = run(&args).await.unwrap_err();
        assert!(err.to_string().contains("unknown network with chain ID [1337]"));
    }
}
