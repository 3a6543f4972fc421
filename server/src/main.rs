use disaster_server::config::ServerConfig;
use disaster_server::http::router;
use disaster_server::session::Session;
use disaster_server::ws::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        tracing::error!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let session = Session::new(&config);
    let _broadcasts = session.spawn_broadcasts();

    let app = router(AppState {
        world: session.world.clone(),
        gateway: session.gateway.clone(),
        broadcast_tx: session.broadcast_tx.clone(),
        max_message_bytes: config.max_message_bytes,
    });

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Disaster server listening on {}", config.listen_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
