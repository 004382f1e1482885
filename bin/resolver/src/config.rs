use crate::PipelineSettings;
use alloy_primitives::Address;
use claim::TrackerWindows;
use config::{NetworkConfig, NetworkConfigBuilder, SourceChainConfig};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Top-level resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Flare (attestation chain) RPC endpoint url
    pub flare_rpc_url: String,

    /// Source chain RPC endpoint url, used by the block-scan fallback
    pub source_rpc_url: String,

    /// ClaimBoard contract address
    pub claim_board: Address,

    /// Source chain whose payments are claimed
    #[serde(default)]
    pub source_chain: SourceChain,

    /// Etherscan-compatible indexer api key
    #[serde(default)]
    pub indexer_api_key: String,

    /// Verifier service api key
    #[serde(default = "default_api_key")]
    pub verifier_api_key: String,

    /// Data availability layer api key
    #[serde(default = "default_api_key")]
    pub da_api_key: String,

    /// Address and url overrides on top of the testnet presets
    #[serde(default)]
    pub overrides: Overrides,

    /// Stop before any chain write
    #[serde(default)]
    pub dry_run: bool,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// Prometheus exporter port, 0 disables the exporter
    #[serde(default)]
    pub metrics_port: u16,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceChain {
    #[default]
    Sepolia,
    Ethereum,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Overrides {
    pub fdc_hub: Option<Address>,
    pub fee_config: Option<Address>,
    pub fdc_verification: Option<Address>,
    pub relay: Option<Address>,
    pub indexer_url: Option<String>,
    pub verifier_url: Option<String>,
    pub da_layer_url: Option<String>,
}

/// Pacing and limits of the claim pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Claims processed in parallel
    #[serde(default = "default_max_concurrent_claims")]
    pub max_concurrent_claims: usize,

    /// Timeout of every network call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Wait after submitting a request for a located transaction
    #[serde(default = "default_success_window_secs")]
    pub success_window_secs: u64,

    /// Wait after failing to locate a transaction
    #[serde(default = "default_failure_window_secs")]
    pub failure_window_secs: u64,

    /// Confirmations requested when a claim specifies none
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: u32,

    /// Gas ceiling of the attestation request transaction
    #[serde(default = "default_submission_gas_limit")]
    pub submission_gas_limit: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_claims: default_max_concurrent_claims(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            success_window_secs: default_success_window_secs(),
            failure_window_secs: default_failure_window_secs(),
            required_confirmations: default_required_confirmations(),
            submission_gas_limit: default_submission_gas_limit(),
        }
    }
}

fn default_api_key() -> String {
    attestation::PUBLIC_TESTNET_API_KEY.to_string()
}

const fn default_max_concurrent_claims() -> usize {
    4
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_poll_interval_secs() -> u64 {
    15
}

const fn default_success_window_secs() -> u64 {
    180
}

const fn default_failure_window_secs() -> u64 {
    20
}

const fn default_required_confirmations() -> u32 {
    2
}

const fn default_submission_gas_limit() -> u64 {
    500_000
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> eyre::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        if config.pipeline.max_concurrent_claims == 0 {
            eyre::bail!("pipeline.max_concurrent_claims must be at least 1");
        }
        Ok(config)
    }

    /// Testnet presets with this file's overrides applied.
    pub fn network_config(&self) -> NetworkConfig {
        let source = match self.source_chain {
            SourceChain::Sepolia => SourceChainConfig::sepolia(),
            SourceChain::Ethereum => SourceChainConfig::ethereum(),
        };
        let mut builder = NetworkConfigBuilder::testnet().source(source);

        let o = &self.overrides;
        if let Some(address) = o.fdc_hub {
            builder = builder.fdc_hub(address);
        }
        if let Some(address) = o.fee_config {
            builder = builder.fee_config(address);
        }
        if let Some(address) = o.fdc_verification {
            builder = builder.fdc_verification(address);
        }
        if let Some(address) = o.relay {
            builder = builder.relay(address);
        }
        if let Some(url) = &o.indexer_url {
            builder = builder.indexer_url(url.clone());
        }
        if let Some(url) = &o.verifier_url {
            builder = builder.verifier_url(url.clone());
        }
        if let Some(url) = &o.da_layer_url {
            builder = builder.da_layer_url(url.clone());
        }
        builder.build()
    }

    pub const fn windows(&self) -> TrackerWindows {
        TrackerWindows {
            success_secs: self.pipeline.success_window_secs,
            failure_secs: self.pipeline.failure_window_secs,
        }
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.request_timeout_secs)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.pipeline.poll_interval_secs)
    }

    pub const fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_concurrent_claims: self.pipeline.max_concurrent_claims,
            request_timeout: self.request_timeout(),
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        flare_rpc_url = "https://coston2-api.flare.network/ext/C/rpc"
        source_rpc_url = "https://ethereum-sepolia-rpc.publicnode.com"
        claim_board = "0x1111111111111111111111111111111111111111"
    "#;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();

        assert_eq!(config.source_chain, SourceChain::Sepolia);
        assert_eq!(config.verifier_api_key, attestation::PUBLIC_TESTNET_API_KEY);
        assert!(!config.dry_run);
        assert_eq!(config.metrics_port, 0);
        assert_eq!(config.pipeline.max_concurrent_claims, 4);
        assert_eq!(config.pipeline.submission_gas_limit, 500_000);
        assert_eq!(config.windows(), TrackerWindows::default());

        let network = config.network_config();
        assert_eq!(network.flare.chain_id, 114);
        assert_eq!(network.source.verifier_name, "eth-sepolia");
        assert!(network.flare.relay.is_none());
    }

    #[test]
    fn test_overrides_and_pipeline_table() {
        let toml = format!(
            r#"{MINIMAL}
            source_chain = "ethereum"
            dry_run = true

            [overrides]
            relay = "0x2222222222222222222222222222222222222222"
            da_layer_url = "http://localhost:8080"

            [pipeline]
            max_concurrent_claims = 8
            failure_window_secs = 5
            "#
        );
        let config = Config::from_toml(&toml).unwrap();

        let network = config.network_config();
        assert_eq!(network.source.source_id, "ETH");
        assert_eq!(network.flare.relay, Some(Address::repeat_byte(0x22)));
        assert_eq!(network.services.da_layer_url, "http://localhost:8080");

        assert_eq!(config.pipeline.max_concurrent_claims, 8);
        assert_eq!(config.pipeline.success_window_secs, 180);
        assert_eq!(config.windows().failure_secs, 5);
        assert!(config.settings().dry_run);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let toml = format!("{MINIMAL}\n[pipeline]\nmax_concurrent_claims = 0\n");
        assert!(Config::from_toml(&toml).is_err());
    }
}
