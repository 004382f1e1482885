//! Configuration types for the claim resolver.
//!
//! This crate provides:
//! - Network presets and a builder for overrides
//! - Flare Data Connector contract addresses and voting epoch parameters
//! - Source chain parameters used to locate and attest transactions

pub mod network;

pub use network::{
    FlareConfig, NetworkConfig, NetworkConfigBuilder, ServiceUrls, SourceChainConfig,
};
