pub mod cache;
pub mod dispatcher;
pub mod middleware;
pub mod openapi;
pub mod routes;

use axum::Router;
use axum::http::Request;
use cache::ProfileCache;
use ma_core::{Lifecycle, MutualAidError};
use ma_db::schema;
use ma_db::store::DbStore;
use ma_events::bus::NotificationBus;
use middleware::correlation::CorrelationId;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct AppState {
    pub db_path: String,
    pub bus: NotificationBus,
    pub profiles: ProfileCache,
}

impl AppState {
    pub fn new(
        db_path: impl Into<String>,
        notification_capacity: usize,
        profile_ttl: Duration,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            bus: NotificationBus::new(notification_capacity),
            profiles: ProfileCache::new(profile_ttl),
        }
    }
}

pub type ApiLifecycle = Lifecycle<DbStore, NotificationBus>;

/// One connection per request; the lifecycle publishes onto the shared bus.
pub fn build_lifecycle(state: &AppState) -> Result<ApiLifecycle, MutualAidError> {
    let conn = schema::open_and_migrate(&state.db_path)
        .map_err(|err| MutualAidError::internal(err.to_string()))?;
    Ok(Lifecycle::new(DbStore::new(conn), state.bus.clone()))
}

pub fn correlation_id_from_request<B>(request: &Request<B>) -> Option<String> {
    request
        .extensions()
        .get::<CorrelationId>()
        .map(|value| value.0.clone())
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> Result<(), std::io::Error> {
    let dispatcher = dispatcher::spawn(state.clone());
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, db_path = %state.db_path, "listening");
    let result = axum::serve(listener, app(state)).await;
    dispatcher.abort();
    result
}
