use utoipa::OpenApi;

use crate::routes::error::ErrorEnvelope;
use crate::routes::messages::SendMessageBody;
use crate::routes::offers::{AcceptOfferBody, RejectOfferBody};
use crate::routes::requests::{OfferHelpBody, ReasonBody};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use ma_core::types::{
    Conversation, ConversationId, ConversationStatus, CreateHelpRequestInput, CreateProfileInput,
    HelpRequest, HelpRequestId, HelpRequestStatus, Message, MessageId, NotificationId, Profile,
    UserId,
};
use ma_events::types::{NotificationKind, NotificationRecord};

#[derive(OpenApi)]
#[openapi(
    info(title = "Mutual Aid API"),
    paths(
        crate::routes::offers::accept_offer,
        crate::routes::offers::reject_offer,
        crate::routes::requests::create_request,
        crate::routes::requests::get_request,
        crate::routes::requests::complete_request,
        crate::routes::requests::close_request,
        crate::routes::requests::cancel_request,
        crate::routes::requests::offer_help,
        crate::routes::requests::list_conversations,
        crate::routes::conversations::get_conversation,
        crate::routes::conversations::close_conversation,
        crate::routes::messages::list_my_conversations,
        crate::routes::messages::list_messages,
        crate::routes::messages::send_message,
        crate::routes::profiles::create_profile,
        crate::routes::profiles::get_profile,
        crate::routes::notifications::list_notifications,
        crate::routes::notifications::mark_read
    ),
    components(schemas(
        Conversation,
        HelpRequest,
        Message,
        Profile,
        NotificationRecord,
        CreateHelpRequestInput,
        CreateProfileInput,
        AcceptOfferBody,
        RejectOfferBody,
        ReasonBody,
        OfferHelpBody,
        SendMessageBody,
        ErrorEnvelope,
        ConversationId,
        HelpRequestId,
        MessageId,
        NotificationId,
        UserId,
        ConversationStatus,
        HelpRequestStatus,
        NotificationKind
    ))
)]
struct ApiDoc;

pub fn generate_spec() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .unwrap_or_else(|_| "{}".to_string())
}

pub fn router() -> Router {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::TestApp;
    use axum::http::StatusCode;

    #[test]
    fn document_lists_the_lifecycle_endpoints() {
        let spec: serde_json::Value = serde_json::from_str(&generate_spec()).unwrap();
        let paths = spec["paths"].as_object().unwrap();
        for path in [
            "/api/messaging/accept-offer",
            "/api/messaging/reject-offer",
            "/api/requests/{id}/complete",
            "/api/requests/{id}/close",
            "/api/messaging/conversations",
            "/api/messaging/conversations/{id}/messages",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }

    #[tokio::test]
    async fn document_is_served_without_identity() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/api/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["title"], "Mutual Aid API");
    }
}
