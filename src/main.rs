use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Extension, Router};
use chrono::Utc;
use dotenv::dotenv;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use pahiramcar_be::routes::auth::auth_router;
use pahiramcar_be::routes::bookings::booking_router;
use pahiramcar_be::routes::cars::car_router;
use pahiramcar_be::routes::notifications::notification_router;
use pahiramcar_be::routes::reservations::reservation_router;
use pahiramcar_be::routes::AppState;
use pahiramcar_be::store::memory::MemoryStore;
use pahiramcar_be::store::postgres::PgStore;
use pahiramcar_be::store::Stores;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let stores = select_stores().await;
    let state = AppState::new(stores);
    spawn_sweeper(&state);

    let app = Router::new()
        .merge(auth_router())
        .merge(car_router())
        .merge(reservation_router())
        .merge(booking_router())
        .merge(notification_router())
        .layer(Extension(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    tracing::info!("listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}

/// Postgres when DATABASE_URL is set; otherwise the demo store,
/// persisted under DATA_DIR when that is given.
async fn select_stores() -> Stores {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = PgPool::connect(&url)
                .await
                .expect("Failed to connect to Postgres");
            tracing::info!("using the Postgres store");
            Arc::new(PgStore::new(pool)).into_stores()
        }
        Err(_) => match std::env::var("DATA_DIR") {
            Ok(dir) => {
                tracing::info!("demo mode, persisting to {dir}");
                Arc::new(MemoryStore::with_persistence(dir.into())).into_stores()
            }
            Err(_) => {
                tracing::info!("demo mode, in-memory only");
                Arc::new(MemoryStore::demo()).into_stores()
            }
        },
    }
}

/// Background expiration sweep. The first tick runs immediately so a
/// restart retires anything that expired while the server was down.
fn spawn_sweeper(state: &AppState) {
    let secs = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(3600);
    if secs == 0 {
        return;
    }
    let lifecycle = state.lifecycle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(secs));
        loop {
            interval.tick().await;
            match lifecycle.sweep_expired_reservations(Utc::now()).await {
                Ok(expired) if expired > 0 => {
                    tracing::info!(expired, "background sweep expired reservations");
                }
                Ok(_) => {}
                Err(err) => tracing::warn!("background sweep failed: {err}"),
            }
        }
    });
}
