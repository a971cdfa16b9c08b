//! Who may do what. Every lifecycle mutation asks the policy first; the
//! store's conditional updates only guard status, never identity.

use crate::error::{ConversationError, HelpRequestError};
use crate::types::{Conversation, HelpRequest, Party, UserId};

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Accepting or declining an offer belongs to the request owner.
    pub fn respond_to_offer(
        &self,
        user_id: &UserId,
        conversation: &Conversation,
    ) -> Result<(), ConversationError> {
        if &conversation.requester_id == user_id {
            return Ok(());
        }
        Err(ConversationError::Forbidden {
            message: "only the requester can respond to this offer".to_string(),
        })
    }

    pub fn view_conversation(
        &self,
        user_id: &UserId,
        conversation: &Conversation,
    ) -> Result<(), ConversationError> {
        if conversation.is_participant(user_id) {
            return Ok(());
        }
        Err(ConversationError::Forbidden {
            message: "you are not part of this conversation".to_string(),
        })
    }

    pub fn close_conversation(
        &self,
        user_id: &UserId,
        conversation: &Conversation,
    ) -> Result<(), ConversationError> {
        self.view_conversation(user_id, conversation)
    }

    pub fn send_message(
        &self,
        user_id: &UserId,
        conversation: &Conversation,
    ) -> Result<(), ConversationError> {
        self.view_conversation(user_id, conversation)
    }

    pub fn offer_help(
        &self,
        user_id: &UserId,
        request: &HelpRequest,
    ) -> Result<(), ConversationError> {
        if &request.owner_id == user_id {
            return Err(ConversationError::Forbidden {
                message: "you cannot offer help on your own request".to_string(),
            });
        }
        Ok(())
    }

    pub fn complete_request(
        &self,
        user_id: &UserId,
        request: &HelpRequest,
    ) -> Result<Party, HelpRequestError> {
        request
            .party_of(user_id)
            .ok_or_else(|| HelpRequestError::Forbidden {
                message: "only the requester or the assigned helper can complete this request"
                    .to_string(),
            })
    }

    pub fn cancel_request(
        &self,
        user_id: &UserId,
        request: &HelpRequest,
    ) -> Result<Party, HelpRequestError> {
        request
            .party_of(user_id)
            .ok_or_else(|| HelpRequestError::Forbidden {
                message: "only the requester or the assigned helper can cancel this request"
                    .to_string(),
            })
    }

    pub fn close_request(
        &self,
        user_id: &UserId,
        request: &HelpRequest,
    ) -> Result<(), HelpRequestError> {
        if &request.owner_id == user_id {
            return Ok(());
        }
        Err(HelpRequestError::Forbidden {
            message: "only the requester can close this request".to_string(),
        })
    }

    /// Owners see every offer on their request; anyone else only their own.
    pub fn sees_all_offers(&self, user_id: &UserId, request: &HelpRequest) -> bool {
        &request.owner_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ConversationId, ConversationStatus, HelpRequestId, HelpRequestStatus,
    };
    use chrono::Utc;

    fn request(owner: &UserId, helper: Option<&UserId>) -> HelpRequest {
        HelpRequest {
            id: HelpRequestId::generate(),
            owner_id: owner.clone(),
            helper_id: helper.cloned(),
            title: "Move a couch".to_string(),
            description: None,
            status: HelpRequestStatus::InProgress,
            close_reason: None,
            created_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
            closed_at: None,
        }
    }

    fn conversation(requester: &UserId, helper: &UserId) -> Conversation {
        Conversation {
            id: ConversationId::generate(),
            help_request_id: HelpRequestId::generate(),
            requester_id: requester.clone(),
            helper_id: helper.clone(),
            status: ConversationStatus::Pending,
            initial_message: None,
            rejection_reason: None,
            created_at: Utc::now(),
            accepted_at: None,
            rejected_at: None,
            closed_at: None,
        }
    }

    #[test]
    fn only_the_requester_responds_to_offers() {
        let policy = AccessPolicy::new();
        let owner = UserId::generate();
        let helper = UserId::generate();
        let conv = conversation(&owner, &helper);

        assert!(policy.respond_to_offer(&owner, &conv).is_ok());
        assert!(matches!(
            policy.respond_to_offer(&helper, &conv),
            Err(ConversationError::Forbidden { .. })
        ));
        assert!(policy.view_conversation(&helper, &conv).is_ok());
        assert!(policy.send_message(&owner, &conv).is_ok());
        assert!(policy.send_message(&UserId::generate(), &conv).is_err());
        assert!(policy
            .view_conversation(&UserId::generate(), &conv)
            .is_err());
    }

    #[test]
    fn completion_is_open_to_owner_and_assigned_helper_only() {
        let policy = AccessPolicy::new();
        let owner = UserId::generate();
        let helper = UserId::generate();
        let req = request(&owner, Some(&helper));

        assert_eq!(policy.complete_request(&owner, &req).unwrap(), Party::Requester);
        assert_eq!(policy.complete_request(&helper, &req).unwrap(), Party::Helper);
        assert!(matches!(
            policy.complete_request(&UserId::generate(), &req),
            Err(HelpRequestError::Forbidden { .. })
        ));
        assert!(policy.close_request(&helper, &req).is_err());
        assert!(policy.offer_help(&owner, &req).is_err());
    }
}
