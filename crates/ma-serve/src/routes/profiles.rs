use crate::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::correlation::CorrelationId;
use crate::routes::error::{ErrorEnvelope, json_rejection, map_error};
use crate::routes::respond;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use ma_core::RequestContext;
use ma_core::types::{Confirmation, CreateProfileInput, Profile, UserId};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/profiles", post(create_profile))
        .route("/profiles/{id}", get(get_profile))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/profiles",
    request_body = CreateProfileInput,
    responses((status = 200, body = Profile), (status = 409, body = ErrorEnvelope))
)]
pub(crate) async fn create_profile(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateProfileInput>, JsonRejection>,
) -> Response {
    let ctx = RequestContext::new(user.0, Some(correlation.0));
    let Json(input) = match payload {
        Ok(input) => input,
        Err(rejection) => return json_rejection(&rejection, ctx.correlation_id),
    };
    let response = respond(&state, &ctx, |lifecycle| {
        lifecycle.profiles().create(&ctx, input)
    });
    // A cached miss for this user would otherwise hide the new name until it expires.
    state.profiles.invalidate(&ctx.user_id).await;
    response
}

#[utoipa::path(
    get,
    path = "/api/profiles/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses((status = 200, body = Profile), (status = 404, body = ErrorEnvelope))
)]
pub(crate) async fn get_profile(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let ctx = RequestContext::new(user.0, Some(correlation.0));
    let id = match UserId::new(id) {
        Ok(id) => id,
        Err(err) => return map_error(&err.into(), ctx.correlation_id).into_response(),
    };
    respond(&state, &ctx, |lifecycle| {
        lifecycle
            .profiles()
            .get(&id)
            .map(|profile| Confirmation::new("Profile loaded", profile))
    })
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::TestApp;
    use axum::http::StatusCode;
    use ma_core::types::UserId;
    use serde_json::json;

    #[tokio::test]
    async fn caller_creates_their_own_profile_once() {
        let app = TestApp::new();
        let user = UserId::generate();
        let body = json!({ "displayName": "Rosa" });

        let (status, created) = app
            .call("POST", "/api/profiles", Some(&user), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["data"]["id"], user.as_str());

        let (status, again) = app
            .call("POST", "/api/profiles", Some(&user), Some(body))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(again["error"], "Conflict");

        let (status, fetched) = app
            .call(
                "GET",
                &format!("/api/profiles/{}", user.as_str()),
                Some(&UserId::generate()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["displayName"], "Rosa");
    }
}
