use clap::Parser;
use resolver::{config::Config, metrics::install_prometheus_exporter, unix_now, wiring, StepOutcome};
use std::sync::Arc;
use tokio::time;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "resolver")]
#[command(about = "Resolve open claims with FDC attestation proofs")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Private key for signing transactions (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY")]
    private_key: String,

    /// Dry-run mode: price and simulate, but never send transactions
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_file(&cli.config)?;
    if cli.dry_run {
        config.dry_run = true;
    }

    init_tracing(config.json_logs);
    info!("Starting resolver");

    let network = config.network_config();
    info!("Loaded config:");
    info!("  Flare chain: {}", network.flare.chain_id);
    info!("  Source chain: {} ({})", network.source.chain_id, network.source.source_id);
    info!("  ClaimBoard: {}", config.claim_board);
    info!("  FdcHub: {}", network.flare.fdc_hub);
    info!("  Signer: {}", client::signer_address(&cli.private_key)?);
    if config.dry_run {
        info!("  Mode: DRY-RUN (no transactions will be executed)");
    }

    if config.metrics_port != 0 {
        install_prometheus_exporter(config.metrics_port)?;
        info!(port = config.metrics_port, "Prometheus exporter listening");
    }

    let pipeline = Arc::new(wiring::pipeline(&config, &cli.private_key)?);
    let mut interval = time::interval(config.poll_interval());

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }

        match pipeline.tick(unix_now()).await {
            Ok(outcomes) => {
                for (claim_id, outcome) in &outcomes {
                    match outcome {
                        StepOutcome::Failed(e) => {
                            warn!(claim_id = %claim_id, error = %e, "Claim step failed");
                        }
                        other => {
                            info!(claim_id = %claim_id, outcome = other.label(), "Claim stepped");
                        }
                    }
                }
                info!(claims = outcomes.len(), "Cycle complete");
            }
            Err(e) => {
                error!(error = %e, "Failed to list open claims");
            }
        }
    }
}
