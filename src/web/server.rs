//! Axum web server for the analytics API.
//!
//! Every route except `/health` sits behind the API-key middleware.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use crate::catalog::Catalog;
use crate::compile::QueryCompiler;
use crate::config::Settings;
use crate::executor::{PgExecutor, QueryExecutor};
use crate::time;

/// Application state shared across handlers.
pub struct AppState {
    pub compiler: QueryCompiler,
    pub executor: Arc<dyn QueryExecutor>,
    /// Key callers must send in `x-api-key`; `None` disables the check.
    pub api_key: Option<String>,
    /// Source of "today" for rolling windows.
    pub today: fn() -> NaiveDate,
}

impl AppState {
    pub fn new(
        compiler: QueryCompiler,
        executor: Arc<dyn QueryExecutor>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            compiler,
            executor,
            api_key,
            today: time::today,
        }
    }

    /// Pin the date rolling windows are resolved against.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }
}

/// Build the axum router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/analytics/query", post(handlers::run_query))
        .route("/analytics/compare", post(handlers::compare))
        .route("/segments/clients", post(handlers::client_segment))
        .route("/clients/recurring", post(handlers::recurring_clients))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the web server.
pub async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    settings.validate()?;

    let compiler = QueryCompiler::new(Arc::new(Catalog::standard()), settings.compile_options()?);
    let executor = PgExecutor::connect_lazy(settings.database_url()?, settings.pool_options())?;

    match executor.ping().await {
        Ok(()) => info!("database reachable"),
        Err(e) => warn!(error = %e, "database not reachable at startup"),
    }

    let api_key = settings.api_key();
    if api_key.is_none() {
        warn!("no API key configured, requests are not authenticated");
    }

    let state = Arc::new(AppState::new(compiler, Arc::new(executor), api_key));
    let app = router(state);

    let addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        %addr,
        table = %settings.analytics.table,
        dialect = %settings.analytics.dialect,
        "pricing analytics listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
