use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skill_ledger::{config, db, handlers, state::AppState};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skill_ledger=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let settings = config::load_settings();
  let pool = db::init_db(&settings.database_path).expect("Failed to initialize database");

  let state = AppState::new(pool.clone(), settings.rates.clone());
  let app = handlers::router(state);

  let bind_addr = config::server_bind_addr(settings.port);
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", settings.port);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server failed to start");

  db::close_db(pool);
  tracing::info!("Shut down cleanly");
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("Failed to listen for shutdown signal: {}", e);
  }
  tracing::info!("Shutdown requested");
}
