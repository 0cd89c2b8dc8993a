use std::sync::Arc;

use wordrush::config;
use wordrush::room::Registry;
use wordrush::server::{self, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    config::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "4000".to_string())
        .parse()
        .expect("Invalid PORT");

    let catalog = Arc::new(config::load_catalog());
    let registry = Registry::new();

    let app = server::app(AppState { registry, catalog });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind");

    tracing::info!("Wordrush server running on port {}", port);

    axum::serve(listener, app).await.unwrap();
}
