use crate::types::enums::ConversationStatus;
use crate::types::ids::{ConversationId, HelpRequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub help_request_id: HelpRequestId,
    pub requester_id: UserId,
    pub helper_id: UserId,
    pub status: ConversationStatus,
    pub initial_message: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: &UserId) -> bool {
        &self.requester_id == user_id || &self.helper_id == user_id
    }

    /// The participant on the other side from `user_id`.
    pub fn other_participant(&self, user_id: &UserId) -> &UserId {
        if &self.requester_id == user_id {
            &self.helper_id
        } else {
            &self.requester_id
        }
    }

    /// Messages flow while the offer is open or accepted.
    pub fn accepts_messages(&self) -> bool {
        matches!(
            self.status,
            ConversationStatus::Pending | ConversationStatus::Accepted
        )
    }
}
