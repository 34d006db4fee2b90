use std::sync::{Arc, Mutex};

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sportnest::config::AppConfig;
use sportnest::db;
use sportnest::handlers;
use sportnest::services::payments::stripe::StripeProvider;
use sportnest::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if config.payment_secret_key.is_empty() {
        tracing::warn!("PAYMENT_SECRET_KEY not set, card payments will fail verification");
    }
    let payments = StripeProvider::new(
        config.payment_api_url.clone(),
        config.payment_secret_key.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        payments: Box::new(payments),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/turfs", get(handlers::turfs::list_turfs))
        .route("/turfs", post(handlers::turfs::create_turf))
        .route("/turfs/:id", get(handlers::turfs::get_turf))
        .route("/bookings", post(handlers::bookings::create_booking))
        .route(
            "/bookings/slots/:turf_id",
            get(handlers::bookings::booked_slots),
        )
        .route(
            "/bookings/:id/cancel",
            put(handlers::bookings::cancel_booking),
        )
        .route("/bookings/history", get(handlers::bookings::booking_history))
        .route("/user/payments", get(handlers::payments::payment_history))
        .route(
            "/payments/initiate",
            post(handlers::payments::initiate_payment),
        )
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/:id/read",
            put(handlers::notifications::mark_read),
        )
        .route("/webhook/payments", post(handlers::webhook::payment_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
