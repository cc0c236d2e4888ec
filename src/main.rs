use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use trackmycoin::application::services::enrichment_service::{
    EnrichmentService, EnrichmentSettings,
};
use trackmycoin::cli::{Cli, Command};
use trackmycoin::config::AppConfig;
use trackmycoin::infrastructure::coingecko_client::{CoinGeckoClient, CoinGeckoConfig};
use trackmycoin::infrastructure::google_sheets_client::GoogleSheetsConfig;
use trackmycoin::infrastructure::ledger_client_factory::LedgerClientFactory;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackmycoin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    info!("{} starting", config.app_name);
    debug!("Configuration: {:?}", config);

    match cli.command {
        Command::Process => run_process(config).await,
    }
}

async fn run_process(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();

    let ledger = LedgerClientFactory::create(&config, GoogleSheetsConfig::default(), cancel.clone())?;

    let oracle_config = CoinGeckoConfig {
        api_base: config.coingecko_base_url.clone(),
        api_key: config.coingecko_api_key.clone(),
        rate_limit: config.rate_limit(),
        ..Default::default()
    };
    let oracle = CoinGeckoClient::new_with_config(oracle_config)?.with_cancellation(cancel.clone());

    let settings = EnrichmentSettings {
        spreadsheet_id: config.google_sheet_id.clone(),
        range: config.google_sheet_range.clone(),
    };
    let service = EnrichmentService::new(ledger, Arc::new(oracle), settings)
        .with_cancellation(cancel.clone());

    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received Ctrl+C signal, cancelling run");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
        }
    });

    info!("Spreadsheet ID: {}", config.google_sheet_id);
    match service.process().await {
        Ok(report) => {
            info!(
                "Run finished: {} rows read, {} records, {} parse errors, {}/{} prices filled, {} rows written",
                report.rows_read,
                report.records_decoded,
                report.parse_errors.len(),
                report.prices_updated,
                report.missing_prices,
                report.rows_written
            );
            Ok(())
        }
        Err(e) => {
            error!("Enrichment failed: {}", e);
            Err(e.into())
        }
    }
}
