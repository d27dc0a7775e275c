use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use cloud_auth::auth::TokenCodec;
use cloud_auth::configuration::get_configuration;
use cloud_auth::session::SessionManager;
use cloud_auth::startup::run;
use cloud_auth::store::{PgCredentialStore, RedisSessionStore};
use cloud_auth::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting auth service");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(configuration.database.acquire_timeout_secs))
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    let session_store = RedisSessionStore::connect(&configuration.redis)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to session store: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Session store connection error")
        })?;

    let sessions = Arc::new(SessionManager::new(
        TokenCodec::new(&configuration.jwt),
        Arc::new(PgCredentialStore::new(pool)),
        Arc::new(session_store),
        configuration.security.password_hash_cost,
    ));

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, sessions)?.await
}
