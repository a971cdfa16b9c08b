use crate::error::MutualAidError;
use crate::types::{
    Conversation, ConversationId, ConversationStatus, HelpRequestId, NewConversation, UserId,
};
use chrono::{DateTime, Utc};

pub trait ConversationRepository {
    fn create(&self, input: NewConversation) -> Result<Conversation, MutualAidError>;
    fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, MutualAidError>;
    fn list_for_request(
        &self,
        help_request_id: &HelpRequestId,
    ) -> Result<Vec<Conversation>, MutualAidError>;
    /// Every conversation `user_id` takes part in, newest first, optionally
    /// narrowed to one status.
    fn list_for_user(
        &self,
        user_id: &UserId,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, MutualAidError>;
    /// The helper's pending or accepted offer on a request, if any.
    fn find_active(
        &self,
        help_request_id: &HelpRequestId,
        helper_id: &UserId,
    ) -> Result<Option<Conversation>, MutualAidError>;
    fn find_accepted(
        &self,
        help_request_id: &HelpRequestId,
    ) -> Result<Option<Conversation>, MutualAidError>;
    /// Moves the row from `from` to `to` in one conditional update. Returns
    /// `None` when the row was no longer in `from`.
    fn transition(
        &self,
        id: &ConversationId,
        from: ConversationStatus,
        to: ConversationStatus,
        at: DateTime<Utc>,
        rejection_reason: Option<&str>,
    ) -> Result<Option<Conversation>, MutualAidError>;
}
