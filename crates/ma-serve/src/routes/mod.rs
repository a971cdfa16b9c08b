pub mod conversations;
pub mod error;
pub mod messages;
pub mod notifications;
pub mod offers;
pub mod profiles;
pub mod requests;

use crate::middleware::auth::auth_middleware;
use crate::middleware::correlation::correlation_middleware;
use crate::routes::error::{confirmed, map_error};
use crate::{ApiLifecycle, AppState, build_lifecycle, openapi};
use axum::Router;
use axum::body::Bytes;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use ma_core::types::Confirmation;
use ma_core::{MutualAidError, RequestContext};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    let resources = Router::new()
        .merge(offers::router(state.clone()))
        .merge(requests::router(state.clone()))
        .merge(conversations::router(state.clone()))
        .merge(messages::router(state.clone()))
        .merge(profiles::router(state.clone()))
        .merge(notifications::router(state))
        .route_layer(middleware::from_fn(auth_middleware));

    let api = resources
        .merge(openapi::router())
        .route_layer(middleware::from_fn(correlation_middleware));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs one lifecycle operation on a fresh connection and renders the envelope.
pub(crate) fn respond<T, F>(state: &AppState, ctx: &RequestContext, op: F) -> Response
where
    T: Serialize,
    F: FnOnce(&ApiLifecycle) -> Result<Confirmation<T>, MutualAidError>,
{
    match build_lifecycle(state).and_then(|lifecycle| op(&lifecycle)) {
        Ok(confirmation) => confirmed(confirmation),
        Err(err) => map_error(&err, ctx.correlation_id.clone()).into_response(),
    }
}

/// Bodies on close/cancel are optional; an empty body means all defaults.
pub(crate) fn optional_body<T: DeserializeOwned + Default>(
    bytes: &Bytes,
) -> Result<T, MutualAidError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|err| MutualAidError::invalid_input(format!("invalid request body: {err}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::AppState;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ma_core::types::UserId;
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    pub struct TestApp {
        pub state: AppState,
        _dir: TempDir,
    }

    impl TestApp {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("api.db").to_string_lossy().into_owned();
            ma_db::schema::open_and_migrate(&path).unwrap();
            Self {
                state: AppState::new(path, 64, Duration::from_secs(60)),
                _dir: dir,
            }
        }

        pub fn router(&self) -> Router {
            super::router(self.state.clone())
        }

        pub async fn call(
            &self,
            method: &str,
            uri: &str,
            user: Option<&UserId>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(user) = user {
                builder = builder.header("x-user-id", user.as_str());
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            let response = self.router().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }
    }
}
