//! Contract bindings for all external contracts.
//!
//! This crate consolidates the Solidity interfaces the resolver talks to:
//! - Flare Data Connector contracts (FdcHub, fee configuration, verification, Relay)
//! - The ClaimBoard bounty contract
//!
//! All bindings are generated using alloy's `sol!` macro.

pub mod claimboard;
pub mod fdc;
