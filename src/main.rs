use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use tokengate::configuration::get_configuration;
use tokengate::registry::PgTokenRegistry;
use tokengate::startup::{run, Backends};
use tokengate::subjects::PgSubjectDirectory;
use tokengate::telemetry::init_telemetry;
use tokengate::triggers::TracingTriggerDispatcher;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

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
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;

    tracing::info!("Database ready");

    let backends = Backends {
        registry: Arc::new(PgTokenRegistry::new(
            pool.clone(),
            configuration.jwt.registry_limit,
        )),
        subjects: Arc::new(PgSubjectDirectory::new(pool)),
        dispatcher: Arc::new(TracingTriggerDispatcher),
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(
        listener,
        configuration.application.base_url.clone(),
        configuration.jwt.clone(),
        backends,
    )?;

    server.await
}
