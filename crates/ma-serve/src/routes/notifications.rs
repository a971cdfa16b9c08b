use crate::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::{ErrorEnvelope, map_error, ok, query_rejection};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use chrono::Utc;
use ma_core::MutualAidError;
use ma_core::error::NotificationError;
use ma_core::types::NotificationId;
use ma_db::schema;
use ma_events::store::NotificationStore;
use ma_events::types::NotificationRecord;
use serde::Deserialize;
use utoipa::IntoParams;

const MAX_LIMIT: u32 = 200;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationsQuery {
    pub limit: Option<u32>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", post(mark_read))
        .with_state(state)
}

fn with_store<T, E: std::fmt::Display>(
    state: &AppState,
    f: impl FnOnce(&NotificationStore<'_>) -> Result<T, E>,
) -> Result<T, MutualAidError> {
    let conn = schema::open_and_migrate(&state.db_path)
        .map_err(|err| MutualAidError::internal(err.to_string()))?;
    f(&NotificationStore::new(&conn)).map_err(|err| MutualAidError::internal(err.to_string()))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationsQuery),
    responses((status = 200, body = [NotificationRecord]))
)]
pub(crate) async fn list_notifications(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    query: Result<Query<NotificationsQuery>, QueryRejection>,
) -> Response {
    let limit = match query {
        Ok(Query(query)) => query.limit.map(|limit| limit.min(MAX_LIMIT)),
        Err(rejection) => return query_rejection(&rejection, Some(correlation.0)),
    };
    match with_store(&state, |store| store.list(user.0.as_str(), limit)) {
        Ok(records) => ok("Notifications loaded", records),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification ID")),
    responses((status = 200, body = NotificationRecord), (status = 404, body = ErrorEnvelope))
)]
pub(crate) async fn mark_read(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let result = NotificationId::new(id)
        .map_err(MutualAidError::from)
        .and_then(|id| {
            with_store(&state, |store| {
                store.mark_read(id.as_str(), user.0.as_str(), Utc::now())
            })
        })
        .and_then(|record| record.ok_or_else(|| NotificationError::NotFound.into()));
    match result {
        Ok(record) => ok("Notification marked as read", record),
        Err(err) => map_error(&err, Some(correlation.0)).into_response(),
    }
}
