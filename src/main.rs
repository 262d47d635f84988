// src/main.rs
use anyhow::{bail, Context};
use dotenvy::dotenv;
use pump_sniper::config::AppConfig;
use pump_sniper::connectors::binance::BinanceClient;
use pump_sniper::connectors::paper::PaperGateway;
use pump_sniper::connectors::traits::MarketGateway;
use pump_sniper::engine::{PositionController, ScanScheduler};
use pump_sniper::storage::{PositionStore, SqlitePositionStore};
use pump_sniper::utils::logging::init_logging;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let config = AppConfig::new().context("failed to load configuration")?;
    let _log_guard = init_logging(&config.log_dir)?;

    info!("========================================");
    info!("       PUMP SNIPER - v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!(
        "Mode:   {}",
        if config.live_trading {
            "LIVE TRADING"
        } else {
            "PAPER TRADING"
        }
    );

    // 2. Initialize Components
    let sqlite = SqlitePositionStore::connect(&config.database_url)
        .await
        .context("failed to open position store")?;

    let client: Arc<dyn MarketGateway> =
        Arc::new(BinanceClient::new(&config).context("failed to build exchange client")?);
    let gateway: Arc<dyn MarketGateway> = if config.live_trading {
        client
    } else {
        let ledger = sqlite
            .paper_ledger()
            .await
            .context("failed to open paper order ledger")?;
        Arc::new(PaperGateway::new(client, ledger))
    };

    gateway.ping().await.context("exchange is unreachable")?;

    let symbols = if config.symbols.is_empty() {
        gateway
            .trading_symbols(&config.quote_asset)
            .await
            .context("failed to discover symbols")?
    } else {
        config.symbols.clone()
    };
    if symbols.is_empty() {
        bail!("no symbols to trade for quote asset {}", config.quote_asset);
    }
    info!(count = symbols.len(), quote_asset = %config.quote_asset, "Symbol universe ready");

    let store: Arc<dyn PositionStore> = Arc::new(sqlite.clone());
    for position in store.list_all().await? {
        info!(
            symbol = %position.symbol,
            state = %position.state,
            entry_price = %position.entry_price,
            quantity = %position.quantity,
            "Resuming position"
        );
    }

    // 3. Run Loops
    let controller = Arc::new(PositionController::new(
        gateway,
        store,
        &config.strategy,
    ));
    let scheduler = ScanScheduler::new(
        controller,
        symbols,
        config.buy_interval(),
        config.sell_interval(),
    );
    let (buy_task, sell_task) = scheduler.spawn();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        result = buy_task => {
            error!("Buy loop exited: {:?}", result);
        }
        result = sell_task => {
            error!("Sell loop exited: {:?}", result);
        }
    }

    sqlite.close().await;
    Ok(())
}
