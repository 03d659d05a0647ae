//! ibwire - Gateway session monitor
//!
//! Connects to a TWS or IB Gateway process, negotiates the API version and
//! logs server errors and dispatcher events until interrupted.

use ibwire_client::{Client, ClientError, Config, ConnectionState, DispatchEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if IBWIRE_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("IBWIRE_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting ibwire session monitor");
    tracing::info!(
        "  Gateway: {}:{}",
        config.connection.host,
        config.connection.port
    );
    tracing::info!("  Client id: {}", config.connection.client_id);

    let client = Client::new(config.connection.to_connection_config());
    let mut events = client.events();
    let mut errors = client.responses().subscribe_errors();

    if let Err(e) = client.connect().await {
        tracing::error!("Failed to connect: {}", e);
        return Err(e.into());
    }
    tracing::info!(
        "Connected (server version {}, connection time {})",
        client.server_version(),
        client.server_time().unwrap_or_default()
    );

    client.start_dispatcher()?;

    match client.state() {
        ConnectionState::AwaitingExplicitStart => {
            tracing::info!("Session opened with extra authentication, waiting for verification");
        }
        _ => {
            if let Some(t) = config.market_data.market_data_type {
                client.req_market_data_type(t).await?;
                tracing::info!("  Market data type: {}", t);
            }
            match client.current_time().await {
                Ok(time) => tracing::info!("Server clock: {:?}", time.as_datetime()),
                Err(e) => tracing::warn!("Failed to read server clock: {}", e),
            }
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down...");
                break;
            }
            report = errors.recv() => match report {
                Some(err) if err.id >= 0 => {
                    tracing::warn!("Server error {} for request {}: {}", err.code, err.id, err.message);
                }
                Some(err) => tracing::warn!("Server notice {}: {}", err.code, err.message),
                None => {
                    tracing::info!("Error queue closed");
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(DispatchEvent::Terminated { code, reason }) => {
                    tracing::error!("Session terminated ({}): {}", code, reason);
                    break;
                }
                Ok(event) => tracing::info!("Dispatcher event: {:?}", event),
                Err(RecvError::Lagged(n)) => tracing::warn!("Missed {} dispatcher events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    match client.disconnect().await {
        Ok(()) | Err(ClientError::NotConnected) => {}
        Err(e) => tracing::warn!("Disconnect failed: {}", e),
    }
    tracing::info!("Session monitor stopped");
    Ok(())
}
