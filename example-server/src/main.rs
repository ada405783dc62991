use axum::{extract::State, http::StatusCode, routing::get, Router};
use axum_sandman::{activate, ActivateOptions, Registry, SqliteProvider};
use sqlx::sqlite::SqlitePool;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

mod database;

#[derive(Clone)]
struct ApplicationState {
    pool: SqlitePool,
}

/// Read a boolean switch such as `SANDMAN_BROWSER=false`
fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => !matches!(value.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"),
        Err(_) => default,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("axum_sandman=info".parse()?)
                .add_directive("example_server=info".parse()?),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:example.db?mode=rwc".into());
    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:5000".into());

    let pool = SqlitePool::connect(&database_url).await?;
    database::setup(&pool).await?;

    let options = ActivateOptions {
        admin: env_flag("SANDMAN_ADMIN", true),
        browser: env_flag("SANDMAN_BROWSER", true),
        public_url: format!("http://{}", bind_address),
        ..ActivateOptions::default()
    };

    // Bind before activating so the browser never opens on a dead port
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    let database = SqliteProvider::new(pool.clone());
    let activation = activate(Registry::new(), &database, &options).await?;
    tracing::info!(models = activation.registry().len(), "models registered");

    let application_state = ApplicationState { pool };

    // The admin router is stateless, so it is merged after with_state()
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .with_state(application_state)
        .merge(activation.into_router(database))
        .layer(CorsLayer::permissive());

    tracing::info!("server running at http://{}", bind_address);
    tracing::info!("admin available at {}", options.admin_url());

    axum::serve(listener, app).await?;
    Ok(())
}

async fn root_handler() -> &'static str {
    "Welcome to the axum-sandman example server"
}

async fn health_handler(
    State(state): State<ApplicationState>,
) -> Result<(StatusCode, &'static str), StatusCode> {
    sqlx::query("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok((StatusCode::OK, "Server is healthy"))
}
