use cobaltdb::{Server, DEFAULT_PORT};
use tracing::{error, info};

fn main() {
    // Initialize logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("CobaltDB starting...");

    let mut server = match Server::bind(DEFAULT_PORT) {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind port {}: {}", DEFAULT_PORT, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        error!("server error: {}", e);
        std::process::exit(1);
    }
}
