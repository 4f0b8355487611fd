use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use betting_strategy::core::{MAX_COMBINATIONS, MAX_ENUMERATION};

mod handlers;

use handlers::{health, strategy};

/// Application state shared across handlers
pub struct AppState {
    /// Ranked combinations kept per request
    pub max_combinations: usize,
    /// System subsets a request may enumerate
    pub max_enumeration: u64,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("{}:{}", host, port);

    let max_combinations = std::env::var("MAX_COMBINATIONS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(MAX_COMBINATIONS);

    let max_enumeration = std::env::var("MAX_ENUMERATION")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(MAX_ENUMERATION);

    let app_state = Arc::new(AppState {
        max_combinations,
        max_enumeration,
    });

    info!(
        "Starting Betting Strategy API server at http://{} (keep {} of at most {} combinations)",
        addr, max_combinations, max_enumeration
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(health::health_check))
            .route("/strategy", web::post().to(strategy::process))
    })
    .bind(&addr)?
    .run()
    .await
}
