use crate::types::enums::{HelpRequestStatus, Party};
use crate::types::ids::{HelpRequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
    pub id: HelpRequestId,
    pub owner_id: UserId,
    pub helper_id: Option<UserId>,
    pub title: String,
    pub description: Option<String>,
    pub status: HelpRequestStatus,
    pub close_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl HelpRequest {
    pub fn party_of(&self, user_id: &UserId) -> Option<Party> {
        if &self.owner_id == user_id {
            Some(Party::Requester)
        } else if self.helper_id.as_ref() == Some(user_id) {
            Some(Party::Helper)
        } else {
            None
        }
    }

    /// The other side of the request from `party`, if there is one.
    pub fn counterparty(&self, party: Party) -> Option<&UserId> {
        match party {
            Party::Requester => self.helper_id.as_ref(),
            Party::Helper => Some(&self.owner_id),
        }
    }
}
