use booking_reservation::{
    adapters::{
        mock::BookingRepository as InMemoryBookingRepository,
        postgres::PostgresBookingRepository,
    },
    api::{handlers::AppState, router::create_router},
    application::booking::ServiceDependencies,
    config::{AppConfig, StoreKind},
    ports::BookingRepository,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "booking_reservation=debug,tower_http=debug,axum=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Initialize adapters
    let booking_repository: Arc<dyn BookingRepository> = match config.store {
        StoreKind::Postgres => {
            tracing::info!("Database URL: {}", config.database_url);

            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            Arc::new(PostgresBookingRepository::new(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory booking store; data is lost on shutdown");
            Arc::new(InMemoryBookingRepository::new())
        }
    };

    // Create service dependencies
    let service_deps = ServiceDependencies { booking_repository };

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
