use crate::types::ids::{ConversationId, HelpRequestId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHelpRequestInput {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileInput {
    pub display_name: String,
}

/// Row-level input for inserting a help request; fields are already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHelpRequest {
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
}

/// Row-level input for inserting a pending conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub help_request_id: HelpRequestId,
    pub requester_id: UserId,
    pub helper_id: UserId,
    pub initial_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
}

/// Result of a successful mutation: a message the client can show as-is plus
/// the updated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation<T> {
    pub message: &'static str,
    pub data: T,
}

impl<T> Confirmation<T> {
    pub fn new(message: &'static str, data: T) -> Self {
        Self { message, data }
    }
}
