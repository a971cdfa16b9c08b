use crate::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::{ErrorEnvelope, json_rejection, map_error, query_rejection};
use crate::routes::respond;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use ma_core::types::{Confirmation, Conversation, ConversationId, ConversationStatus, Message};
use ma_core::{MutualAidError, RequestContext};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_PAGE: u32 = 50;
const MAX_PAGE: u32 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConversationsQuery {
    /// Only conversations in this status, e.g. `pending` offers.
    pub status: Option<ConversationStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessagesQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub content: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/messaging/conversations", get(list_my_conversations))
        .route(
            "/messaging/conversations/{id}/messages",
            get(list_messages).post(send_message),
        )
        .with_state(state)
}

fn context(user: AuthenticatedUser, correlation: CorrelationId) -> RequestContext {
    RequestContext::new(user.0, Some(correlation.0))
}

fn page_size(limit: Option<u32>) -> Result<u32, MutualAidError> {
    match limit {
        Some(0) => Err(MutualAidError::invalid_input("limit must be at least 1")),
        Some(limit) => Ok(limit.min(MAX_PAGE)),
        None => Ok(DEFAULT_PAGE),
    }
}

#[utoipa::path(
    get,
    path = "/api/messaging/conversations",
    params(ConversationsQuery),
    responses((status = 200, body = [Conversation]), (status = 400, body = ErrorEnvelope))
)]
pub(crate) async fn list_my_conversations(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    query: Result<Query<ConversationsQuery>, QueryRejection>,
) -> Response {
    let ctx = context(user, correlation);
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection(&rejection, ctx.correlation_id),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle
            .offers()
            .list_mine(&ctx, query.status)
            .map(|conversations| Confirmation::new("Conversations loaded", conversations))
    })
}

#[utoipa::path(
    get,
    path = "/api/messaging/conversations/{id}/messages",
    params(("id" = String, Path, description = "Conversation ID"), MessagesQuery),
    responses(
        (status = 200, body = [Message], description = "Latest messages, oldest first"),
        (status = 403, body = ErrorEnvelope),
        (status = 404, body = ErrorEnvelope)
    )
)]
pub(crate) async fn list_messages(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> Response {
    let ctx = context(user, correlation);
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection(&rejection, ctx.correlation_id),
    };
    let params = ConversationId::new(id)
        .map_err(MutualAidError::from)
        .and_then(|id| page_size(query.limit).map(|limit| (id, limit)));
    let (id, limit) = match params {
        Ok(params) => params,
        Err(err) => return map_error(&err, ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle
            .messages()
            .list(&ctx, &id, limit)
            .map(|messages| Confirmation::new("Messages loaded", messages))
    })
}

#[utoipa::path(
    post,
    path = "/api/messaging/conversations/{id}/messages",
    params(("id" = String, Path, description = "Conversation ID")),
    request_body = SendMessageBody,
    responses(
        (status = 200, body = Message, description = "Message sent"),
        (status = 400, body = ErrorEnvelope, description = "Empty or longer than 1000 characters"),
        (status = 403, body = ErrorEnvelope),
        (status = 409, body = ErrorEnvelope, description = "Conversation rejected or closed")
    )
)]
pub(crate) async fn send_message(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageBody>, JsonRejection>,
) -> Response {
    let ctx = context(user, correlation);
    let id = match ConversationId::new(id) {
        Ok(id) => id,
        Err(err) => return map_error(&err.into(), ctx.correlation_id).into_response(),
    };
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(&rejection, ctx.correlation_id),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle.messages().send(&ctx, &id, &body.content)
    })
}
