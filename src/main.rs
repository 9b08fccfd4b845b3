use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use rifa_lib::api::BackendClient;
use rifa_lib::config;
use rifa_lib::mcp_handler::{MCPHandler, stdio};
use rifa_lib::store::RaffleStore;
use rifa_lib::use_cases::{MessagingUseCase, OrderUseCase, RaffleUseCase};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Arrancando el administrador de rifas.");

    let backend = Arc::new(BackendClient::new(&config.backend_url));

    // The backend being down is not fatal; start with an empty collection
    // and keep the in-memory state authoritative for the session.
    let raffles = match backend.load().await {
        Ok(raffles) => raffles,
        Err(e) => {
            tracing::warn!("no se pudo cargar el estado inicial: {}", e);
            Vec::new()
        }
    };

    let store = Arc::new(Mutex::new(RaffleStore::new(raffles)));

    let raffle_use_case = RaffleUseCase::new(
        Arc::clone(&store),
        Arc::clone(&backend),
        config.receipt_path.clone(),
    );

    let order_use_case = OrderUseCase::new(Arc::clone(&store), config.receipt_path.clone());

    let messaging_use_case =
        MessagingUseCase::new(Arc::clone(&store), config.country_code.clone());

    let handler = MCPHandler::new(
        Arc::new(raffle_use_case),
        Arc::new(order_use_case),
        Arc::new(messaging_use_case),
    );

    let (reader, writer) = stdio();

    handler.serve(reader, writer).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    Ok(())
}
