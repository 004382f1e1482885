//! Request and prove `EVMTransaction` attestations.
//!
//! This crate provides:
//! - bytes32 identifier encoding and request validation
//! - [`AttestationRequestBuilder`] and the verifier service it talks to
//! - The proof model served by the data availability layer
//! - Voting round arithmetic, finality and onchain proof checks

pub mod builder;
pub mod da;
pub mod encoding;
pub mod finality;
pub mod proof;
pub mod request;
pub mod round;
mod serde_helpers;
pub mod verification;
pub mod verifier;

pub use builder::{AttestationRequestBuilder, PreparedRequest};
pub use da::{DaLayerClient, ProofSource};
pub use encoding::{decode_bytes32, encode_bytes32};
pub use finality::{RelayFinality, RoundFinality};
pub use proof::AttestationProof;
pub use request::{parse_transaction_hash, AttestationRequest, RequestBody, EVM_TRANSACTION};
pub use round::VotingEpoch;
pub use verification::{FdcVerification, ProofCheck};
pub use verifier::{HttpVerifier, VerifierService, PUBLIC_TESTNET_API_KEY};
