//! Flare Data Connector contract bindings.
//!
//! Includes the contracts needed to request an attestation and track its round:
//! - FdcHub (pay for and submit attestation requests)
//! - FdcRequestFeeConfigurations (price a request)
//! - Relay (voting round finalization)
//!
//! The `EVMTransaction` proof structs and `IFdcVerification` live in
//! [`crate::claimboard`] since `sol!` cannot reference structs across invocations.

use alloy_sol_types::sol;

sol! {
    /// FdcHub - entrypoint accepting paid attestation requests
    #[sol(rpc)]
    interface IFdcHub {
        /// Emitted for every accepted request
        event AttestationRequest(bytes data, uint256 fee);

        function requestAttestation(bytes calldata _data) external payable;
    }

    /// Fee configuration for attestation requests
    #[sol(rpc)]
    interface IFdcRequestFeeConfigurations {
        function getRequestFee(bytes calldata _data) external view returns (uint256);
    }

    /// Relay - stores finalized voting round roots per protocol
    #[sol(rpc)]
    interface IRelay {
        function isFinalized(uint256 _protocolId, uint256 _votingRoundId) external view returns (bool);
    }
}
