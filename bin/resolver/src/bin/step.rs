//! CLI tool to run individual pipeline stages by hand.
//!
//! - `claims`: list open claims
//! - `locate`: find the payment matching a claim
//! - `prepare`: have the verifier encode an attestation request
//! - `submit`: pay for and submit an encoded request
//! - `fetch-proof`: fetch the proof of a request from the DA layer
//! - `verify`: resolve a claim with a proof file
//! - `cancel`: cancel an open claim as its poster
//! - `round`: voting round arithmetic

use action::{
    Action, AttestationSubmitter, CancelClaimAction, ClaimResolver, ProofVerifier, Resolution,
};
use alloy_primitives::{Bytes, B256};
use attestation::{AttestationProof, ProofCheck, ProofSource};
use binding::claimboard::EVMTransactionProof;
use clap::{Parser, Subcommand};
use eyre::OptionExt;
use resolver::{config::Config, unix_now, wiring};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "step")]
#[command(about = "Run individual pipeline stages for testing")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Private key for signing transactions (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY")]
    private_key: Option<String>,

    /// Dry-run mode: simulate writes without sending them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List open claims on the ClaimBoard
    Claims,

    /// Find the source chain payment matching a claim
    Locate {
        #[arg(long)]
        claim_id: B256,
    },

    /// Ask the verifier to encode an attestation request for a transaction
    Prepare {
        #[arg(long)]
        tx_hash: String,

        /// Required confirmations (0 uses the configured default)
        #[arg(long, default_value_t = 0)]
        confirmations: u32,
    },

    /// Pay the fee and submit an ABI-encoded attestation request
    Submit {
        #[arg(long)]
        request: Bytes,
    },

    /// Fetch the proof for a request attested in a voting round
    FetchProof {
        #[arg(long)]
        round: u64,

        #[arg(long)]
        request: Bytes,

        /// Write the proof JSON here instead of printing it
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Resolve a claim with a proof file as served by the DA layer
    Verify {
        #[arg(long)]
        claim_id: B256,

        #[arg(long)]
        proof: PathBuf,

        /// Present the proof to the non-existence entrypoint
        #[arg(long)]
        non_existence: bool,
    },

    /// Cancel an open claim as its poster
    Cancel {
        #[arg(long)]
        claim_id: B256,
    },

    /// Show the voting round containing a timestamp (default: now)
    Round {
        #[arg(long)]
        timestamp: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_file(&cli.config)?;

    // Override dry_run from CLI flag
    if cli.dry_run {
        config.dry_run = true;
    }
    let private_key = cli.private_key.as_deref();
    let signing_key = || {
        private_key.ok_or_eyre("this step signs transactions: pass --private-key or set PRIVATE_KEY")
    };

    let network = config.network_config();
    info!("Loaded config:");
    info!("  ClaimBoard: {}", config.claim_board);
    info!("  FdcHub: {}", network.flare.fdc_hub);
    info!("  Source: {}", network.source.source_id);
    if config.dry_run {
        info!("  Mode: DRY-RUN (no transactions will be executed)");
    }

    match cli.command {
        Command::Claims => {
            let board = wiring::claim_board(&config, None)?;
            let claims = board.open_claims().await?;

            for claim in &claims {
                info!(
                    claim_id = %claim.id,
                    from = %claim.from,
                    to = %claim.to,
                    amount = %claim.amount,
                    deadline = claim.deadline,
                    bounty = %claim.bounty,
                    "Open claim"
                );
            }
            info!(count = claims.len(), "Step completed: claims");
        }
        Command::Locate { claim_id } => {
            let board = wiring::claim_board(&config, None)?;
            let claim = board.claim(claim_id).await?;
            let found = wiring::locator(&config)?.locate(&claim).await?;

            match found {
                Some(tx) => info!(
                    tx_hash = %tx.hash,
                    block_number = tx.block_number,
                    timestamp = tx.timestamp,
                    "Matching transaction"
                ),
                None => info!("No matching transaction"),
            }
        }
        Command::Prepare {
            tx_hash,
            confirmations,
        } => {
            let hash = attestation::parse_transaction_hash(&tx_hash)?;
            let prepared = wiring::request_builder(&config)?
                .prepare(hash, confirmations)
                .await?;

            info!(bytes = prepared.abi_encoded.len(), "Verifier accepted request");
            println!("{}", prepared.abi_encoded);
        }
        Command::Submit { request } => {
            let hub = wiring::attestation_hub(&config, signing_key()?)?;
            let mut submitter = AttestationSubmitter::new(hub, request);

            if config.dry_run {
                let fee = submitter.dry_run().await?;
                info!(fee = %fee, "Dry run: simulation passed, request not submitted");
                return Ok(());
            }

            let submitted = submitter.execute().await?;
            let timestamp = submitted.block_timestamp.unwrap_or_else(unix_now);
            let round = wiring::voting_epoch(&config).round_for_timestamp(timestamp)?;
            info!(
                tx_hash = %submitted.tx_hash,
                voting_round = round,
                "Step completed: submit"
            );
        }
        Command::FetchProof {
            round,
            request,
            out,
        } => {
            let proof = wiring::proof_source(&config)?
                .proof(round, &request)
                .await?
                .ok_or_eyre("no proof available for this request and round (yet)")?;
            let json = serde_json::to_string_pretty(&proof)?;

            match out {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    info!(path = %path.display(), "Proof written");
                }
                None => println!("{}", json),
            }
        }
        Command::Verify {
            claim_id,
            proof,
            non_existence,
        } => {
            let contents = tokio::fs::read_to_string(&proof).await?;
            let proof: AttestationProof = serde_json::from_str(&contents)?;
            let key = if config.dry_run {
                private_key
            } else {
                Some(signing_key()?)
            };
            let board = wiring::claim_board(&config, key)?;

            let resolution = if non_existence {
                Resolution::NonExistence
            } else {
                let claim = board.claim(claim_id).await?;
                proof.check_payment(&claim)?;
                if !wiring::proof_check(&config)?.is_proved(&proof).await? {
                    eyre::bail!("FdcVerification rejected the proof");
                }
                Resolution::Payment
            };
            let proof: EVMTransactionProof = proof.into();

            if config.dry_run {
                board
                    .simulate_resolution(claim_id, resolution, &proof)
                    .await?;
                info!("Dry run: resolution simulated, not submitted");
                return Ok(());
            }

            let mut verifier = ProofVerifier::new(board, claim_id, resolution, proof);
            let submitted = verifier.execute().await?;
            info!(tx_hash = %submitted.tx_hash, "Step completed: verify");
        }
        Command::Cancel { claim_id } => {
            let board = wiring::claim_board(&config, Some(signing_key()?))?;
            let mut action = CancelClaimAction::new(board, claim_id);

            if action.is_completed().await? {
                info!("Claim already cancelled");
                return Ok(());
            }
            if config.dry_run {
                info!(ready = action.is_ready().await?, "Dry run: cancel not submitted");
                return Ok(());
            }

            let submitted = action.execute().await?;
            info!(tx_hash = %submitted.tx_hash, "Step completed: cancel");
        }
        Command::Round { timestamp } => {
            let epoch = wiring::voting_epoch(&config);
            let timestamp = timestamp.unwrap_or_else(unix_now);
            let round = epoch.round_for_timestamp(timestamp)?;

            info!(
                timestamp,
                voting_round = round,
                round_start = epoch.round_start(round),
                round_end = epoch.round_end(round),
                "Voting round"
            );
        }
    }

    Ok(())
}
