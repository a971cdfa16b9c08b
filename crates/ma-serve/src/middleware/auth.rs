use crate::correlation_id_from_request;
use crate::routes::error::map_error;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ma_core::MutualAidError;
use ma_core::types::UserId;

/// The caller as resolved from the `x-user-id` header.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub UserId);

const HEADER_NAME: &str = "x-user-id";

pub async fn auth_middleware(mut request: Request<Body>, next: Next) -> Response {
    let correlation_id = correlation_id_from_request(&request);
    let Some(raw) = request.headers().get(HEADER_NAME) else {
        return map_error(&MutualAidError::Unauthorized, correlation_id).into_response();
    };
    let user_id = match raw.to_str() {
        Ok(value) => UserId::new(value.trim().to_string()).map_err(MutualAidError::from),
        Err(_) => Err(MutualAidError::invalid_input("x-user-id is not valid text")),
    };
    match user_id {
        Ok(user_id) => {
            request.extensions_mut().insert(AuthenticatedUser(user_id));
            next.run(request).await
        }
        Err(err) => map_error(&err, correlation_id).into_response(),
    }
}
