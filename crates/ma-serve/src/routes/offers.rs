use crate::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::{ErrorEnvelope, json_rejection};
use crate::routes::respond;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use axum::routing::post;
use axum::{Extension, Json, Router};
use ma_core::RequestContext;
use ma_core::types::{Conversation, ConversationId};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptOfferBody {
    pub conversation_id: ConversationId,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectOfferBody {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/messaging/accept-offer", post(accept_offer))
        .route("/messaging/reject-offer", post(reject_offer))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/messaging/accept-offer",
    request_body = AcceptOfferBody,
    responses(
        (status = 200, body = Conversation, description = "Offer accepted"),
        (status = 403, body = ErrorEnvelope),
        (status = 409, body = ErrorEnvelope, description = "Offer already handled")
    )
)]
pub(crate) async fn accept_offer(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<AcceptOfferBody>, JsonRejection>,
) -> Response {
    let ctx = RequestContext::new(user.0, Some(correlation.0));
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(&rejection, ctx.correlation_id),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle.offers().accept(&ctx, &body.conversation_id)
    })
}

#[utoipa::path(
    post,
    path = "/api/messaging/reject-offer",
    request_body = RejectOfferBody,
    responses(
        (status = 200, body = Conversation, description = "Offer declined"),
        (status = 400, body = ErrorEnvelope, description = "Reason longer than 500 characters"),
        (status = 403, body = ErrorEnvelope),
        (status = 409, body = ErrorEnvelope, description = "Offer already handled")
    )
)]
pub(crate) async fn reject_offer(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<RejectOfferBody>, JsonRejection>,
) -> Response {
    let ctx = RequestContext::new(user.0, Some(correlation.0));
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection(&rejection, ctx.correlation_id),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle
            .offers()
            .reject(&ctx, &body.conversation_id, body.reason)
    })
}
