use crate::conversation_repo::stored_id;
use crate::util::{from_rfc3339, internal, to_rfc3339};
use chrono::Utc;
use ma_core::MutualAidError;
use ma_core::messages::MessageRepository;
use ma_core::types::{ConversationId, Message, MessageId, NewMessage, UserId};
use rusqlite::{Connection, params};

pub struct MessageRepo<'a> {
    conn: &'a Connection,
}

impl<'a> MessageRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl MessageRepository for MessageRepo<'_> {
    fn create(&self, input: NewMessage) -> Result<Message, MutualAidError> {
        let message = Message {
            id: MessageId::generate(),
            conversation_id: input.conversation_id,
            sender_id: input.sender_id,
            content: input.content,
            created_at: Utc::now(),
        };
        self.conn
            .execute(
                "INSERT INTO messages (id, conversation_id, sender_id, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    message.id.as_str(),
                    message.conversation_id.as_str(),
                    message.sender_id.as_str(),
                    message.content,
                    to_rfc3339(&message.created_at),
                ],
            )
            .map_err(internal)?;
        Ok(message)
    }

    fn list_for_conversation(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, MutualAidError> {
        // Insertion order breaks ties between messages stamped in the same instant.
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, conversation_id, sender_id, content, created_at FROM messages WHERE conversation_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )
            .map_err(internal)?;
        let mut rows = stmt
            .query(params![conversation_id.as_str(), i64::from(limit)])
            .map_err(internal)?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next().map_err(internal)? {
            messages.push(map_message_row(row)?);
        }
        messages.reverse();
        Ok(messages)
    }
}

fn map_message_row(row: &rusqlite::Row<'_>) -> Result<Message, MutualAidError> {
    let id: String = row.get(0).map_err(internal)?;
    let conversation_id: String = row.get(1).map_err(internal)?;
    let sender_id: String = row.get(2).map_err(internal)?;
    let content: String = row.get(3).map_err(internal)?;
    let created_at: String = row.get(4).map_err(internal)?;

    Ok(Message {
        id: MessageId::new(id).map_err(stored_id)?,
        conversation_id: ConversationId::new(conversation_id).map_err(stored_id)?,
        sender_id: UserId::new(sender_id).map_err(stored_id)?,
        content,
        created_at: from_rfc3339(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation_repo::ConversationRepo;
    use crate::help_request_repo::HelpRequestRepo;
    use crate::schema::with_test_db;
    use ma_core::conversations::ConversationRepository;
    use ma_core::help_requests::HelpRequestRepository;
    use ma_core::types::{Conversation, NewConversation, NewHelpRequest};

    fn seed_conversation(conn: &Connection) -> Conversation {
        let request = HelpRequestRepo::new(conn)
            .create(NewHelpRequest {
                owner_id: UserId::generate(),
                title: "Fix a bike tyre".to_string(),
                description: None,
            })
            .unwrap();
        ConversationRepo::new(conn)
            .create(NewConversation {
                help_request_id: request.id,
                requester_id: request.owner_id,
                helper_id: UserId::generate(),
                initial_message: None,
            })
            .unwrap()
    }

    fn send(repo: &MessageRepo<'_>, conversation: &Conversation, content: &str) -> Message {
        repo.create(NewMessage {
            conversation_id: conversation.id.clone(),
            sender_id: conversation.helper_id.clone(),
            content: content.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn listing_returns_the_latest_page_oldest_first() {
        let conn = with_test_db().unwrap();
        let repo = MessageRepo::new(&conn);
        let conversation = seed_conversation(&conn);
        let other = seed_conversation(&conn);

        for content in ["first", "second", "third"] {
            send(&repo, &conversation, content);
        }
        send(&repo, &other, "elsewhere");

        let contents = |limit| {
            repo.list_for_conversation(&conversation.id, limit)
                .unwrap()
                .into_iter()
                .map(|message| message.content)
                .collect::<Vec<_>>()
        };
        assert_eq!(contents(10), vec!["first", "second", "third"]);
        assert_eq!(contents(2), vec!["second", "third"]);
    }

    #[test]
    fn messages_need_an_existing_conversation() {
        let conn = with_test_db().unwrap();
        let err = MessageRepo::new(&conn)
            .create(NewMessage {
                conversation_id: ConversationId::generate(),
                sender_id: UserId::generate(),
                content: "hello?".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ma_core::ErrorKind::Internal);
    }
}
