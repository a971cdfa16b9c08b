use crate::error::MutualAidError;
use crate::types::{ConversationId, Message, NewMessage};

pub trait MessageRepository {
    fn create(&self, input: NewMessage) -> Result<Message, MutualAidError>;
    /// The newest `limit` messages of a conversation, oldest first.
    fn list_for_conversation(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, MutualAidError>;
}
