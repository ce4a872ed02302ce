use airtime2cash::{
    app::App,
    config::{self, database, secrets::Secrets},
    errors::Result,
    reconciler::Reconciler,
    services::{auth::JwtAuthGate, gateway::FlutterwaveGateway, notifier::LogNotifier},
};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Non-secret settings from config.toml, secrets from the environment
    let app_config = Arc::new(config::load_app_configuration()?);
    let secrets = Secrets::from_env()?;
    info!(?secrets, "Secrets loaded");

    // 4. Database and schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database tables ready"))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Collaborators
    let gateway = Arc::new(FlutterwaveGateway::new(
        &app_config.transfers,
        secrets.gateway_secret_key.clone(),
    )?);
    let app = App::new(
        db.clone(),
        Arc::new(JwtAuthGate::new(&secrets.jwt_secret, db.clone())),
        Arc::new(LogNotifier),
        gateway.clone(),
        Arc::clone(&app_config),
        secrets.webhook_hash.clone(),
    );

    // 6. Reconciler until Ctrl-C
    let shutdown = CancellationToken::new();
    let reconciler = Reconciler::new(db, gateway, app_config.reconciler.clone());
    let sweeper = tokio::spawn(reconciler.run(shutdown.clone()));
    info!("airtime2cash wallet service running");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");
    shutdown.cancel();
    app.drain_dispatches().await;
    if let Err(e) = sweeper.await {
        error!("Reconciler task panicked: {e}");
    }
    Ok(())
}
