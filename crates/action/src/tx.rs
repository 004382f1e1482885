//! Shared signing, broadcasting and revert decoding for chain writes.

use crate::{SignerFn, Submitted};
use alloy_contract::Error as ContractError;
use alloy_primitives::{TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, Provider};
use alloy_rpc_types::TransactionRequest;
use alloy_rpc_types_eth::{BlockId, BlockNumberOrTag};
use binding::claimboard::IClaimBoard::IClaimBoardErrors;
use claim::{PipelineError, Service, UpstreamError};
use tracing::{info, warn};

/// Revert reason carried by a failed call, if the failure was a revert.
///
/// ClaimBoard custom errors are rendered by name, `Error(string)` reverts by
/// their message, and anything else as the raw revert data.
pub(crate) fn revert_reason(err: &ContractError) -> Option<String> {
    if let Some(decoded) = err.as_decoded_interface_error::<IClaimBoardErrors>() {
        let name = match decoded {
            IClaimBoardErrors::InvalidProof(_) => "InvalidProof()",
            IClaimBoardErrors::TransactionMismatch(_) => "TransactionMismatch()",
            IClaimBoardErrors::ClaimExpired(_) => "ClaimExpired()",
            IClaimBoardErrors::ClaimAlreadyResolved(_) => "ClaimAlreadyResolved()",
        };
        return Some(name.to_string());
    }

    let data = err.as_revert_data()?;
    if data.is_empty() {
        return Some("execution reverted".to_string());
    }
    Some(alloy_sol_types::decode_revert_reason(&data).unwrap_or_else(|| data.to_string()))
}

/// Map a failed contract call: reverts keep their reason, the rest is transport.
pub(crate) fn call_error(call: &'static str, err: ContractError) -> PipelineError {
    match revert_reason(&err) {
        Some(reason) => PipelineError::ChainRevert { call, reason },
        None => UpstreamError::transport(Service::Rpc, err).into(),
    }
}

/// Sign `tx` and broadcast it. Returns once the node accepted the transaction.
pub(crate) async fn sign_and_broadcast<P>(
    provider: &P,
    signer: &SignerFn,
    call: &'static str,
    tx: TransactionRequest,
) -> Result<TxHash, PipelineError>
where
    P: Provider,
{
    let signed = signer(tx)
        .await
        .map_err(|e| UpstreamError::transport(Service::Rpc, e))?;

    let pending = provider
        .send_raw_transaction(&signed)
        .await
        .map_err(|e| UpstreamError::transport(Service::Rpc, e))?;
    let tx_hash = *pending.tx_hash();
    info!(tx_hash = %tx_hash, call, "Transaction broadcast");

    Ok(tx_hash)
}

/// Wait for `tx_hash` to be included.
///
/// A receipt with failed status is a [`PipelineError::ChainRevert`]. `replay` is
/// the request that was signed; it is re-run as a call at the including block
/// so the revert reason can be reported.
pub(crate) async fn wait_for_inclusion<P>(
    provider: &P,
    call: &'static str,
    tx_hash: TxHash,
    replay: TransactionRequest,
) -> Result<Submitted, PipelineError>
where
    P: Provider,
{
    // an earlier wait may have timed out after inclusion
    let known = provider
        .get_transaction_receipt(tx_hash)
        .await
        .map_err(|e| UpstreamError::transport(Service::Rpc, e))?;
    let receipt = match known {
        Some(receipt) => receipt,
        None => PendingTransactionBuilder::new(provider.root().clone(), tx_hash)
            .get_receipt()
            .await
            .map_err(|e| UpstreamError::transport(Service::Rpc, e))?,
    };

    if !receipt.status() {
        let reason = match receipt.block_number {
            Some(block) => replay_revert(provider, replay, block).await,
            None => None,
        };
        let reason = reason.unwrap_or_else(|| format!("transaction {} reverted onchain", tx_hash));
        warn!(tx_hash = %tx_hash, call, reason = %reason, "Transaction reverted");
        return Err(PipelineError::ChainRevert { call, reason });
    }

    let block_timestamp = match receipt.block_number {
        Some(number) => provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await
            .map_err(|e| UpstreamError::transport(Service::Rpc, e))?
            .map(|block| block.header.timestamp),
        None => None,
    };

    info!(
        tx_hash = %tx_hash,
        block_number = receipt.block_number,
        block_timestamp,
        gas_used = receipt.gas_used,
        call,
        "Transaction included"
    );

    Ok(Submitted {
        tx_hash,
        block_number: receipt.block_number,
        block_timestamp,
        gas_used: Some(U256::from(receipt.gas_used)),
    })
}

/// Re-run a reverted transaction as a call against the state of `block`.
pub(crate) async fn replay_revert<P>(
    provider: &P,
    tx: TransactionRequest,
    block: u64,
) -> Option<String>
where
    P: Provider,
{
    match provider.call(tx).block(BlockId::number(block)).await {
        Ok(_) => None,
        Err(e) => revert_reason(&ContractError::from(e)),
    }
}

/// Sign, broadcast and wait for inclusion.
pub(crate) async fn sign_and_send<P>(
    provider: &P,
    signer: &SignerFn,
    call: &'static str,
    tx: TransactionRequest,
) -> Result<Submitted, PipelineError>
where
    P: Provider,
{
    let replay = tx.clone();
    let tx_hash = sign_and_broadcast(provider, signer, call, tx).await?;
    wait_for_inclusion(provider, call, tx_hash, replay).await
}
