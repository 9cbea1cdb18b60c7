mod client;
mod config;
mod form;
mod models;
mod routes;
mod view;

use client::AnalyzeClient;
use config::Config;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let client = AnalyzeClient::new(&config)?;
    tracing::info!(endpoint = %client.endpoint(), "forwarding questions to analysis endpoint");

    let app = routes::router(AppState::new(client), config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
