use crate::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::{ErrorEnvelope, map_error};
use crate::routes::respond;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use ma_core::RequestContext;
use ma_core::types::{Confirmation, Conversation, ConversationId};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/conversations/{id}", get(get_conversation))
        .route("/conversations/{id}/close", post(close_conversation))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}",
    params(("id" = String, Path, description = "Conversation ID")),
    responses((status = 200, body = Conversation), (status = 403, body = ErrorEnvelope))
)]
pub(crate) async fn get_conversation(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let ctx = RequestContext::new(user.0, Some(correlation.0));
    let id = match ConversationId::new(id) {
        Ok(id) => id,
        Err(err) => return map_error(&err.into(), ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle
            .offers()
            .get(&ctx, &id)
            .map(|conversation| Confirmation::new("Conversation loaded", conversation))
    })
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/close",
    params(("id" = String, Path, description = "Conversation ID")),
    responses(
        (status = 200, body = Conversation, description = "Conversation closed"),
        (status = 409, body = ErrorEnvelope, description = "Conversation is not accepted")
    )
)]
pub(crate) async fn close_conversation(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let ctx = RequestContext::new(user.0, Some(correlation.0));
    let id = match ConversationId::new(id) {
        Ok(id) => id,
        Err(err) => return map_error(&err.into(), ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| lifecycle.offers().close(&ctx, &id))
}
