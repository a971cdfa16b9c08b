use crate::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::{ErrorEnvelope, json_rejection, map_error};
use crate::routes::{optional_body, respond};
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use ma_core::RequestContext;
use ma_core::types::{
    Confirmation, Conversation, CreateHelpRequestInput, HelpRequest, HelpRequestId,
};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferHelpBody {
    #[serde(default)]
    pub message: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests/{id}", get(get_request))
        .route("/requests/{id}/complete", post(complete_request))
        .route("/requests/{id}/close", post(close_request))
        .route("/requests/{id}/cancel", post(cancel_request))
        .route("/requests/{id}/offers", post(offer_help))
        .route("/requests/{id}/conversations", get(list_conversations))
        .with_state(state)
}

fn context(user: AuthenticatedUser, correlation: CorrelationId) -> RequestContext {
    RequestContext::new(user.0, Some(correlation.0))
}

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateHelpRequestInput,
    responses((status = 200, body = HelpRequest), (status = 400, body = ErrorEnvelope))
)]
pub(crate) async fn create_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateHelpRequestInput>, JsonRejection>,
) -> Response {
    let ctx = context(user, correlation);
    let Json(input) = match payload {
        Ok(input) => input,
        Err(rejection) => return json_rejection(&rejection, ctx.correlation_id),
    };
    respond(&state, &ctx, |lifecycle| lifecycle.requests().create(&ctx, input))
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Help request ID")),
    responses((status = 200, body = HelpRequest), (status = 404, body = ErrorEnvelope))
)]
pub(crate) async fn get_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let ctx = context(user, correlation);
    let id = match HelpRequestId::new(id) {
        Ok(id) => id,
        Err(err) => return map_error(&err.into(), ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle
            .requests()
            .get(&id)
            .map(|request| Confirmation::new("Help request loaded", request))
    })
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/complete",
    params(("id" = String, Path, description = "Help request ID")),
    responses(
        (status = 200, body = HelpRequest, description = "Help request marked as completed"),
        (status = 403, body = ErrorEnvelope),
        (status = 409, body = ErrorEnvelope, description = "Already completed or no longer active")
    )
)]
pub(crate) async fn complete_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let ctx = context(user, correlation);
    let id = match HelpRequestId::new(id) {
        Ok(id) => id,
        Err(err) => return map_error(&err.into(), ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| lifecycle.requests().complete(&ctx, &id))
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/close",
    params(("id" = String, Path, description = "Help request ID")),
    request_body = ReasonBody,
    responses((status = 200, body = HelpRequest), (status = 403, body = ErrorEnvelope))
)]
pub(crate) async fn close_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let ctx = context(user, correlation);
    let parsed = HelpRequestId::new(id)
        .map_err(Into::into)
        .and_then(|id| optional_body::<ReasonBody>(&body).map(|body| (id, body)));
    let (id, body) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => return map_error(&err, ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle.requests().close(&ctx, &id, body.reason)
    })
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/cancel",
    params(("id" = String, Path, description = "Help request ID")),
    request_body = ReasonBody,
    responses((status = 200, body = HelpRequest), (status = 403, body = ErrorEnvelope))
)]
pub(crate) async fn cancel_request(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let ctx = context(user, correlation);
    let parsed = HelpRequestId::new(id)
        .map_err(Into::into)
        .and_then(|id| optional_body::<ReasonBody>(&body).map(|body| (id, body)));
    let (id, body) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => return map_error(&err, ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle.requests().cancel(&ctx, &id, body.reason)
    })
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/offers",
    params(("id" = String, Path, description = "Help request ID")),
    request_body = OfferHelpBody,
    responses(
        (status = 200, body = Conversation, description = "Offer sent"),
        (status = 403, body = ErrorEnvelope, description = "Offering on your own request"),
        (status = 409, body = ErrorEnvelope, description = "Duplicate offer or request no longer open")
    )
)]
pub(crate) async fn offer_help(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let ctx = context(user, correlation);
    let parsed = HelpRequestId::new(id)
        .map_err(Into::into)
        .and_then(|id| optional_body::<OfferHelpBody>(&body).map(|body| (id, body)));
    let (id, body) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => return map_error(&err, ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle.offers().offer_help(&ctx, &id, body.message)
    })
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}/conversations",
    params(("id" = String, Path, description = "Help request ID")),
    responses((status = 200, body = [Conversation]))
)]
pub(crate) async fn list_conversations(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let ctx = context(user, correlation);
    let id = match HelpRequestId::new(id) {
        Ok(id) => id,
        Err(err) => return map_error(&err.into(), ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle
            .offers()
            .list_for_request(&ctx, &id)
            .map(|conversations| Confirmation::new("Conversations loaded", conversations))
    })
}
