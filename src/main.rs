//! Wallet orchestration daemon.
//!
//! Wires the two flow machines to their real services: the send flow to the
//! RPC-backed transaction service, the error-report flow to the file-backed
//! error store and the telemetry sink. Confirmed transactions are logged
//! until a host signer consumes the submission channel.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::Address;
use clap::Parser;

use wallet_orchestrator::config::{loader, WalletConfig};
use wallet_orchestrator::observability;
use wallet_orchestrator::services::error_store::ErrorStore;
use wallet_orchestrator::services::report_error::{install_panic_hook, ReportErrorService};
use wallet_orchestrator::services::sink::{HttpSink, NoopSink, TelemetrySink};
use wallet_orchestrator::services::tx::RpcTxService;
use wallet_orchestrator::store::Store;
use wallet_orchestrator::Shutdown;

#[derive(Parser)]
#[command(name = "wallet-orchestrator", about = "Wallet flow orchestration daemon")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sender address transfers are built from.
    #[arg(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_tracing("wallet_orchestrator=debug");

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => loader::load_config(path)?,
        None => WalletConfig::default(),
    };

    tracing::info!(
        rpc_url = %config.provider.rpc_url,
        poll_interval_ms = config.reporting.poll_interval_ms,
        reporting_enabled = config.reporting.enabled,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::init_metrics(addr),
            Err(err) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %err,
                "failed to parse metrics address"
            ),
        }
    }

    let sender: Address = match &cli.address {
        Some(raw) => raw.parse().map_err(|err| format!("invalid address: {err}"))?,
        None => Address::ZERO,
    };
    let tx_service = Arc::new(RpcTxService::connect(config.provider.clone(), sender)?);

    let error_store = Arc::new(match &config.reporting.store_path {
        Some(path) => ErrorStore::open(path)?,
        None => ErrorStore::in_memory(),
    });
    install_panic_hook(error_store.clone());

    let sink: Arc<dyn TelemetrySink> = if config.reporting.enabled {
        Arc::new(HttpSink::new(config.reporting.clone()))
    } else {
        Arc::new(NoopSink)
    };
    let report_service = Arc::new(ReportErrorService::new(error_store, sink));

    let shutdown = Shutdown::new();
    let (registry, mut submissions) = Store::start(&config, tx_service, report_service, &shutdown);

    // Surface confirmed transactions until a host signer takes over.
    tokio::spawn(async move {
        while let Some(request) = submissions.recv().await {
            tracing::info!(
                address = %request.address,
                provider_url = %request.provider_url,
                fee_type = ?request.fee_type,
                "transaction confirmed, ready for submission"
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    shutdown.trigger();
    drop(registry);

    Ok(())
}
