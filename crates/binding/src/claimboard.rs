//! ClaimBoard contract bindings.
//!
//! The ClaimBoard escrows a bounty against a claim that a payment happened on a
//! source chain. Claims are resolved by presenting an `EVMTransaction` proof, so
//! the proof structs and the FDC verification interface are declared here too.

use alloy_sol_types::sol;

sol! {
    /// A log emitted by the attested transaction.
    #[derive(Debug, PartialEq, Eq)]
    struct EVMTransactionEvent {
        uint32 logIndex;
        address emitterAddress;
        bytes32[] topics;
        bytes data;
        bool removed;
    }

    /// The request half of an `EVMTransaction` attestation.
    #[derive(Debug, PartialEq, Eq)]
    struct EVMTransactionRequestBody {
        bytes32 transactionHash;
        uint16 requiredConfirmations;
        bool provideInput;
        bool listEvents;
        uint32[] logIndices;
    }

    /// The attested facts about the transaction.
    #[derive(Debug, PartialEq, Eq)]
    struct EVMTransactionResponseBody {
        uint64 blockNumber;
        uint64 timestamp;
        address sourceAddress;
        bool isDeployment;
        address receivingAddress;
        uint256 value;
        bytes input;
        uint8 status;
        EVMTransactionEvent[] events;
    }

    /// Full attestation response as committed to in the voting round merkle tree.
    #[derive(Debug, PartialEq, Eq)]
    struct EVMTransactionResponse {
        bytes32 attestationType;
        bytes32 sourceId;
        uint64 votingRound;
        uint64 lowestUsedTimestamp;
        EVMTransactionRequestBody requestBody;
        EVMTransactionResponseBody responseBody;
    }

    /// Merkle proof plus the response it proves.
    #[derive(Debug, PartialEq, Eq)]
    struct EVMTransactionProof {
        bytes32[] merkleProof;
        EVMTransactionResponse data;
    }

    /// Verification of attestation proofs against the relayed merkle roots
    #[sol(rpc)]
    interface IFdcVerification {
        function verifyEVMTransaction(EVMTransactionProof calldata _proof) external view returns (bool _proved);
    }

    /// Stored claim as returned by `getClaim`.
    ///
    /// `fromAddr`/`toAddr` are raw `bytes` so that non-EVM source chains can be supported.
    #[derive(Debug, PartialEq, Eq)]
    struct ClaimRecord {
        uint16 sourceChainId;
        bytes fromAddr;
        bytes toAddr;
        uint256 amount;
        uint64 deadline;
        uint32 minConfs;
        address poster;
        uint256 bounty;
        uint8 status;
        address winner;
    }

    /// ClaimBoard - bounty board for cross-chain payment claims
    #[sol(rpc)]
    #[allow(clippy::too_many_arguments)]
    interface IClaimBoard {
        /// Emitted when a claim is posted
        event ClaimPosted(bytes32 indexed claimId, address indexed poster, uint256 amount, uint256 bounty, uint64 deadline);

        /// Emitted when a claim is resolved with a valid proof
        event ClaimResolved(bytes32 indexed claimId, address indexed winner, bool paymentFound);

        /// Emitted when the poster cancels an open claim
        event ClaimCancelled(bytes32 indexed claimId);

        error InvalidProof();
        error TransactionMismatch();
        error ClaimExpired();
        error ClaimAlreadyResolved();

        function postClaim(
            uint16 sourceChainId,
            bytes calldata fromAddr,
            bytes calldata toAddr,
            uint256 amount,
            uint32 minConfs,
            uint32 expirationMinutes
        ) external payable returns (bytes32);

        function getClaim(bytes32 claimId) external view returns (ClaimRecord memory);

        function getClaimsCount() external view returns (uint256);

        /// Summary row for enumeration. Unlike `ClaimRecord` the deployed
        /// contract returns `fromAddr`/`toAddr` as `address` here; only
        /// `claimId` and `status` are read, the rest comes from `getClaim`.
        function getClaimByIndex(uint256 index) external view returns (
            bytes32 claimId,
            address poster,
            uint256 amount,
            uint256 bounty,
            uint8 status,
            uint64 deadline,
            uint16 sourceChainId,
            address fromAddr,
            address toAddr,
            uint32 minConfs
        );

        function verifyPayment(bytes32 claimId, EVMTransactionProof calldata proof) external;

        function verifyNonExistence(bytes32 claimId, EVMTransactionProof calldata proof) external;

        function cancelClaim(bytes32 claimId) external;
    }
}
