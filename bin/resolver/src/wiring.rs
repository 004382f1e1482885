//! Builds pipeline components from a [`Config`].

use crate::{config::Config, Pipeline};
use action::{AttestationHub, ClaimBoard, ClaimResolver, FdcHub};
use attestation::{
    AttestationRequestBuilder, DaLayerClient, FdcVerification, HttpVerifier, ProofCheck,
    ProofSource, RelayFinality, RoundFinality, VotingEpoch,
};
use locator::{BlockScanSearch, EtherscanIndexer, IndexerSearch, ProviderBlockSource, TransactionLocator};
use std::sync::Arc;

/// Indexer search with a block scan of the source chain as fallback.
pub fn locator(config: &Config) -> eyre::Result<TransactionLocator> {
    let network = config.network_config();
    let indexer = EtherscanIndexer::new(
        network.source.indexer_url.clone(),
        config.indexer_api_key.clone(),
        config.request_timeout(),
    )?;
    let source = client::create_provider(&config.source_rpc_url)?;
    let scan = BlockScanSearch::new(ProviderBlockSource::new(source), network.source.block_time_secs)
        .with_request_timeout(config.request_timeout());
    let primary = IndexerSearch::new(indexer).with_request_timeout(config.request_timeout());

    Ok(TransactionLocator::new(Arc::new(primary)).with_fallback(Arc::new(scan)))
}

pub fn request_builder(config: &Config) -> eyre::Result<AttestationRequestBuilder> {
    let network = config.network_config();
    let verifier = HttpVerifier::new(
        &network.services.verifier_url,
        &network.source.verifier_name,
        &config.verifier_api_key,
        config.request_timeout(),
    )?;

    Ok(AttestationRequestBuilder::new(Arc::new(verifier), network.source.source_id)
        .with_default_confirmations(config.pipeline.required_confirmations))
}

pub fn proof_source(config: &Config) -> eyre::Result<Arc<dyn ProofSource>> {
    let network = config.network_config();
    let da = DaLayerClient::new(
        &network.services.da_layer_url,
        &config.da_api_key,
        config.request_timeout(),
    )?;
    Ok(Arc::new(da))
}

/// Relay-backed finality, if a relay address is configured.
pub fn finality(config: &Config) -> eyre::Result<Option<Arc<dyn RoundFinality>>> {
    let flare = config.network_config().flare;
    let Some(relay) = flare.relay else {
        return Ok(None);
    };
    let provider = client::create_provider(&config.flare_rpc_url)?;
    Ok(Some(Arc::new(RelayFinality::new(
        provider,
        relay,
        flare.fdc_protocol_id,
    ))))
}

/// Onchain proof check against the FdcVerification contract.
pub fn proof_check(config: &Config) -> eyre::Result<Arc<dyn ProofCheck>> {
    let flare = config.network_config().flare;
    let provider = client::create_provider(&config.flare_rpc_url)?;
    Ok(Arc::new(FdcVerification::new(provider, flare.fdc_verification)))
}

pub fn voting_epoch(config: &Config) -> VotingEpoch {
    let flare = config.network_config().flare;
    VotingEpoch::new(
        flare.first_voting_round_start_ts,
        flare.voting_epoch_duration_secs,
    )
}

/// ClaimBoard client; read-only without a private key.
pub fn claim_board(config: &Config, private_key: Option<&str>) -> eyre::Result<Arc<dyn ClaimResolver>> {
    let provider = client::create_provider(&config.flare_rpc_url)?;
    let board = ClaimBoard::new(provider.clone(), config.claim_board);

    let Some(key) = private_key else {
        return Ok(Arc::new(board));
    };
    let chain_id = config.network_config().flare.chain_id;
    let signer = client::local_signer_fn(key, chain_id, provider)?;
    Ok(Arc::new(board.with_signer(signer, client::signer_address(key)?)))
}

pub fn attestation_hub(config: &Config, private_key: &str) -> eyre::Result<Arc<dyn AttestationHub>> {
    let flare = config.network_config().flare;
    let provider = client::create_provider(&config.flare_rpc_url)?;
    let signer = client::local_signer_fn(private_key, flare.chain_id, provider.clone())?;

    Ok(Arc::new(FdcHub::new(
        provider,
        signer,
        client::signer_address(private_key)?,
        flare.fdc_hub,
        flare.fee_config,
        config.pipeline.submission_gas_limit,
    )))
}

/// The full pipeline, signing with `private_key`.
pub fn pipeline(config: &Config, private_key: &str) -> eyre::Result<Pipeline> {
    let mut pipeline = Pipeline::new(
        locator(config)?,
        request_builder(config)?,
        attestation_hub(config, private_key)?,
        claim_board(config, Some(private_key))?,
        proof_source(config)?,
        voting_epoch(config),
        config.settings(),
    )
    .with_windows(config.windows())
    .with_proof_check(proof_check(config)?);

    if let Some(finality) = finality(config)? {
        pipeline = pipeline.with_finality(finality);
    }
    Ok(pipeline)
}
