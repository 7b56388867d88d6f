// naturequest-server/src/main.rs

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use naturequest_core::Database;

mod error;
mod extract;
mod routes;
mod state;

use state::AppState;

#[derive(Parser, Debug, Clone)]
#[command(name = "naturequest")]
#[command(author, version, about = "NatureQuest - gamified nature exploration backend")]
struct Args {
    /// Address to which the server will bind
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind_addr: String,

    /// Postgres connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://naturequest@localhost:5432/naturequest"
    )]
    db_url: String,

    /// Foursquare Places API key. Leave empty to verify by distance only.
    #[arg(long, env = "FOURSQUARE_API_KEY", default_value = "")]
    foursquare_api_key: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    info!("Connecting to database...");
    let db = Database::new(&args.db_url).await?;
    db.migrate().await?;

    let state = AppState::new(&db, args.foursquare_api_key);

    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = TcpListener::bind(&args.bind_addr).await?;
    info!("Server running on {}", args.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
