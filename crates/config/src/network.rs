//! Network configuration for attestation requests.
//!
//! Provides chain-specific addresses and parameters for the attestation chain
//! (Flare) and the source chain whose payments are being claimed. Presets cover
//! Coston2 with Sepolia as source; other deployments are set through the builder.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Flare network configuration (the chain hosting the FDC and the ClaimBoard).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlareConfig {
    /// Chain ID
    pub chain_id: u64,
    /// FdcHub contract address
    pub fdc_hub: Address,
    /// FdcRequestFeeConfigurations contract address
    pub fee_config: Address,
    /// FdcVerification contract address
    pub fdc_verification: Address,
    /// Relay contract address, if finality should be checked onchain
    pub relay: Option<Address>,
    /// Unix timestamp at which voting round 0 started
    pub first_voting_round_start_ts: u64,
    /// Length of one voting epoch in seconds
    pub voting_epoch_duration_secs: u64,
    /// Protocol id of the FDC in the Relay contract
    pub fdc_protocol_id: u8,
}

impl FlareConfig {
    /// Flare Coston2 testnet configuration.
    pub const fn coston2() -> Self {
        Self {
            chain_id: 114,
            // https://coston2-explorer.flare.network/address/0x48aC463d7975828989331F4De43341627b9c5f1D
            fdc_hub: address!("0x48aC463d7975828989331F4De43341627b9c5f1D"),
            fee_config: address!("0x191a1282Ac700edE65c5B0AaF313BAcC3eA7fC7e"),
            fdc_verification: address!("0x075bf301fF07C4920e5261f93a0609640F53487D"),
            relay: None,
            first_voting_round_start_ts: 1658430000,
            voting_epoch_duration_secs: 90,
            fdc_protocol_id: 200,
        }
    }
}

/// Source chain configuration (the chain where the claimed payment happened).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChainConfig {
    /// Chain ID
    pub chain_id: u64,
    /// Path segment of the verifier service for this chain (e.g. `eth-sepolia`)
    pub verifier_name: String,
    /// FDC source id, encoded as bytes32 in requests (e.g. `testETH`)
    pub source_id: String,
    /// Block time in seconds (12 for Ethereum)
    pub block_time_secs: u64,
    /// Etherscan-compatible indexer API url
    pub indexer_url: String,
}

impl SourceChainConfig {
    /// Ethereum mainnet parameters.
    pub fn ethereum() -> Self {
        Self {
            chain_id: 1,
            verifier_name: "eth".to_string(),
            source_id: "ETH".to_string(),
            block_time_secs: 12,
            indexer_url: "https://api.etherscan.io/api".to_string(),
        }
    }

    /// Ethereum Sepolia testnet configuration.
    pub fn sepolia() -> Self {
        Self {
            chain_id: 11155111,
            verifier_name: "eth-sepolia".to_string(),
            source_id: "testETH".to_string(),
            block_time_secs: 12,
            indexer_url: "https://api-sepolia.etherscan.io/api".to_string(),
        }
    }
}

/// Offchain services of the attestation network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceUrls {
    /// Verifier service base url (prepares attestation requests)
    pub verifier_url: String,
    /// Data availability layer base url (serves proofs)
    pub da_layer_url: String,
}

impl ServiceUrls {
    /// Coston2 testnet services.
    pub fn testnet() -> Self {
        Self {
            verifier_url: "https://fdc-verifiers-testnet.flare.network".to_string(),
            da_layer_url: "https://ctn2-data-availability.flare.network".to_string(),
        }
    }
}

/// Complete network configuration for the attestation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Attestation chain configuration
    pub flare: FlareConfig,
    /// Source chain configuration
    pub source: SourceChainConfig,
    /// Attestation network services
    pub services: ServiceUrls,
}

impl NetworkConfig {
    /// Create testnet configuration (Coston2 + Sepolia).
    pub fn testnet() -> Self {
        NetworkConfigBuilder::testnet().build()
    }
}

/// Builder for custom network configurations.
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
    flare: FlareConfig,
    source: SourceChainConfig,
    services: ServiceUrls,
}

impl NetworkConfigBuilder {
    /// Start with testnet defaults.
    pub fn testnet() -> Self {
        Self {
            flare: FlareConfig::coston2(),
            source: SourceChainConfig::sepolia(),
            services: ServiceUrls::testnet(),
        }
    }

    /// Override FdcHub address.
    pub const fn fdc_hub(mut self, address: Address) -> Self {
        self.flare.fdc_hub = address;
        self
    }

    /// Override fee configuration address.
    pub const fn fee_config(mut self, address: Address) -> Self {
        self.flare.fee_config = address;
        self
    }

    /// Override FdcVerification address.
    pub const fn fdc_verification(mut self, address: Address) -> Self {
        self.flare.fdc_verification = address;
        self
    }

    /// Set the Relay address used for finality checks.
    pub const fn relay(mut self, address: Address) -> Self {
        self.flare.relay = Some(address);
        self
    }

    /// Replace the source chain parameters.
    pub fn source(mut self, source: SourceChainConfig) -> Self {
        self.source = source;
        self
    }

    /// Override the source chain indexer url.
    pub fn indexer_url(mut self, url: impl Into<String>) -> Self {
        self.source.indexer_url = url.into();
        self
    }

    /// Override the verifier service url.
    pub fn verifier_url(mut self, url: impl Into<String>) -> Self {
        self.services.verifier_url = url.into();
        self
    }

    /// Override the data availability layer url.
    pub fn da_layer_url(mut self, url: impl Into<String>) -> Self {
        self.services.da_layer_url = url.into();
        self
    }

    /// Build the network configuration.
    pub fn build(self) -> NetworkConfig {
        NetworkConfig {
            flare: self.flare,
            source: self.source,
            services: self.services,
        }
    }
}
