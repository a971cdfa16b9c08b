use crate::util::{decode_enum, from_opt_rfc3339, from_rfc3339, internal, to_rfc3339};
use ma_core::MutualAidError;
use ma_core::conversations::ConversationRepository;
use ma_core::types::{
    Conversation, ConversationId, ConversationStatus, HelpRequestId, NewConversation, UserId,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Params, params};

const COLUMNS: &str = "id, help_request_id, requester_id, helper_id, status, initial_message, rejection_reason, created_at, accepted_at, rejected_at, closed_at";

pub struct ConversationRepo<'a> {
    conn: &'a Connection,
}

impl<'a> ConversationRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query_one<P: Params>(
        &self,
        filter: &str,
        params: P,
    ) -> Result<Option<Conversation>, MutualAidError> {
        let sql = format!("SELECT {COLUMNS} FROM conversations WHERE {filter} LIMIT 1");
        let mut stmt = self.conn.prepare(&sql).map_err(internal)?;
        let mut rows = stmt.query(params).map_err(internal)?;
        let Some(row) = rows.next().map_err(internal)? else {
            return Ok(None);
        };
        map_conversation_row(row).map(Some)
    }
}

impl ConversationRepository for ConversationRepo<'_> {
    fn create(&self, input: NewConversation) -> Result<Conversation, MutualAidError> {
        let conversation = Conversation {
            id: ConversationId::generate(),
            help_request_id: input.help_request_id,
            requester_id: input.requester_id,
            helper_id: input.helper_id,
            status: ConversationStatus::Pending,
            initial_message: input.initial_message,
            rejection_reason: None,
            created_at: Utc::now(),
            accepted_at: None,
            rejected_at: None,
            closed_at: None,
        };
        self.conn
            .execute(
                "INSERT INTO conversations (id, help_request_id, requester_id, helper_id, status, initial_message, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    conversation.id.as_str(),
                    conversation.help_request_id.as_str(),
                    conversation.requester_id.as_str(),
                    conversation.helper_id.as_str(),
                    conversation.status.as_str(),
                    conversation.initial_message,
                    to_rfc3339(&conversation.created_at),
                ],
            )
            .map_err(internal)?;
        Ok(conversation)
    }

    fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, MutualAidError> {
        self.query_one("id = ?1", [id.as_str()])
    }

    fn list_for_request(
        &self,
        help_request_id: &HelpRequestId,
    ) -> Result<Vec<Conversation>, MutualAidError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM conversations WHERE help_request_id = ?1 ORDER BY created_at ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(internal)?;
        let mut rows = stmt.query([help_request_id.as_str()]).map_err(internal)?;
        let mut conversations = Vec::new();
        while let Some(row) = rows.next().map_err(internal)? {
            conversations.push(map_conversation_row(row)?);
        }
        Ok(conversations)
    }

    fn list_for_user(
        &self,
        user_id: &UserId,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, MutualAidError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM conversations WHERE (requester_id = ?1 OR helper_id = ?1) AND (?2 IS NULL OR status = ?2) ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(internal)?;
        let mut rows = stmt
            .query(params![user_id.as_str(), status.map(ConversationStatus::as_str)])
            .map_err(internal)?;
        let mut conversations = Vec::new();
        while let Some(row) = rows.next().map_err(internal)? {
            conversations.push(map_conversation_row(row)?);
        }
        Ok(conversations)
    }

    fn find_active(
        &self,
        help_request_id: &HelpRequestId,
        helper_id: &UserId,
    ) -> Result<Option<Conversation>, MutualAidError> {
        self.query_one(
            "help_request_id = ?1 AND helper_id = ?2 AND status IN ('pending', 'accepted')",
            [help_request_id.as_str(), helper_id.as_str()],
        )
    }

    fn find_accepted(
        &self,
        help_request_id: &HelpRequestId,
    ) -> Result<Option<Conversation>, MutualAidError> {
        self.query_one(
            "help_request_id = ?1 AND status = 'accepted'",
            [help_request_id.as_str()],
        )
    }

    fn transition(
        &self,
        id: &ConversationId,
        from: ConversationStatus,
        to: ConversationStatus,
        at: DateTime<Utc>,
        rejection_reason: Option<&str>,
    ) -> Result<Option<Conversation>, MutualAidError> {
        let stamp = match to {
            ConversationStatus::Accepted => "accepted_at",
            ConversationStatus::Rejected => "rejected_at",
            ConversationStatus::Closed => "closed_at",
            ConversationStatus::Pending => {
                return Err(MutualAidError::internal(
                    "conversations never return to pending",
                ));
            }
        };
        let sql = format!(
            "UPDATE conversations SET status = ?1, {stamp} = ?2, rejection_reason = COALESCE(?3, rejection_reason) WHERE id = ?4 AND status = ?5"
        );
        let changed = self
            .conn
            .execute(
                &sql,
                params![
                    to.as_str(),
                    to_rfc3339(&at),
                    rejection_reason,
                    id.as_str(),
                    from.as_str(),
                ],
            )
            .map_err(internal)?;
        if changed == 0 {
            return Ok(None);
        }
        self.get(id)
    }
}

fn map_conversation_row(row: &rusqlite::Row<'_>) -> Result<Conversation, MutualAidError> {
    let id: String = row.get(0).map_err(internal)?;
    let help_request_id: String = row.get(1).map_err(internal)?;
    let requester_id: String = row.get(2).map_err(internal)?;
    let helper_id: String = row.get(3).map_err(internal)?;
    let status: String = row.get(4).map_err(internal)?;
    let initial_message: Option<String> = row.get(5).map_err(internal)?;
    let rejection_reason: Option<String> = row.get(6).map_err(internal)?;
    let created_at: String = row.get(7).map_err(internal)?;
    let accepted_at: Option<String> = row.get(8).map_err(internal)?;
    let rejected_at: Option<String> = row.get(9).map_err(internal)?;
    let closed_at: Option<String> = row.get(10).map_err(internal)?;

    Ok(Conversation {
        id: ConversationId::new(id).map_err(stored_id)?,
        help_request_id: HelpRequestId::new(help_request_id).map_err(stored_id)?,
        requester_id: UserId::new(requester_id).map_err(stored_id)?,
        helper_id: UserId::new(helper_id).map_err(stored_id)?,
        status: decode_enum(&status)?,
        initial_message,
        rejection_reason,
        created_at: from_rfc3339(&created_at)?,
        accepted_at: from_opt_rfc3339(accepted_at)?,
        rejected_at: from_opt_rfc3339(rejected_at)?,
        closed_at: from_opt_rfc3339(closed_at)?,
    })
}

pub(crate) fn stored_id(err: ma_core::types::IdError) -> MutualAidError {
    MutualAidError::internal(format!("stored id is corrupt: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::help_request_repo::HelpRequestRepo;
    use crate::schema::with_test_db;
    use ma_core::help_requests::HelpRequestRepository;
    use ma_core::types::{HelpRequest, NewHelpRequest};

    fn seed_request(conn: &Connection, owner: &UserId) -> HelpRequest {
        HelpRequestRepo::new(conn)
            .create(NewHelpRequest {
                owner_id: owner.clone(),
                title: "Pick up prescriptions".to_string(),
                description: None,
            })
            .unwrap()
    }

    fn offer(repo: &ConversationRepo<'_>, request: &HelpRequest, helper: &UserId) -> Conversation {
        repo.create(NewConversation {
            help_request_id: request.id.clone(),
            requester_id: request.owner_id.clone(),
            helper_id: helper.clone(),
            initial_message: Some("I can drive".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn transition_only_applies_from_the_expected_status() {
        let conn = with_test_db().unwrap();
        let repo = ConversationRepo::new(&conn);
        let request = seed_request(&conn, &UserId::generate());
        let conversation = offer(&repo, &request, &UserId::generate());

        let accepted = repo
            .transition(
                &conversation.id,
                ConversationStatus::Pending,
                ConversationStatus::Accepted,
                Utc::now(),
                None,
            )
            .unwrap()
            .unwrap();
        assert_eq!(accepted.status, ConversationStatus::Accepted);
        assert!(accepted.accepted_at.is_some());

        let stale = repo
            .transition(
                &conversation.id,
                ConversationStatus::Pending,
                ConversationStatus::Rejected,
                Utc::now(),
                Some("too late"),
            )
            .unwrap();
        assert!(stale.is_none());

        let stored = repo.get(&conversation.id).unwrap().unwrap();
        assert_eq!(stored.status, ConversationStatus::Accepted);
        assert_eq!(stored.rejection_reason, None);
        assert_eq!(stored.rejected_at, None);
    }

    #[test]
    fn rejection_records_reason_and_frees_the_helper_slot() {
        let conn = with_test_db().unwrap();
        let repo = ConversationRepo::new(&conn);
        let request = seed_request(&conn, &UserId::generate());
        let helper = UserId::generate();
        let conversation = offer(&repo, &request, &helper);

        assert!(repo.find_active(&request.id, &helper).unwrap().is_some());
        let rejected = repo
            .transition(
                &conversation.id,
                ConversationStatus::Pending,
                ConversationStatus::Rejected,
                Utc::now(),
                Some("found someone nearby"),
            )
            .unwrap()
            .unwrap();
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("found someone nearby")
        );
        assert!(repo.find_active(&request.id, &helper).unwrap().is_none());

        // A fresh offer from the same helper is allowed once the old one is closed out.
        offer(&repo, &request, &helper);
        assert_eq!(repo.list_for_request(&request.id).unwrap().len(), 2);
    }

    #[test]
    fn user_listing_covers_both_sides_and_filters_by_status() {
        let conn = with_test_db().unwrap();
        let repo = ConversationRepo::new(&conn);
        let neighbour = UserId::generate();
        let own_request = seed_request(&conn, &neighbour);
        let other_request = seed_request(&conn, &UserId::generate());

        let incoming = offer(&repo, &own_request, &UserId::generate());
        let outgoing = offer(&repo, &other_request, &neighbour);
        repo.transition(
            &outgoing.id,
            ConversationStatus::Pending,
            ConversationStatus::Accepted,
            Utc::now(),
            None,
        )
        .unwrap()
        .unwrap();

        let all = repo.list_for_user(&neighbour, None).unwrap();
        assert_eq!(all.len(), 2);
        let pending = repo
            .list_for_user(&neighbour, Some(ConversationStatus::Pending))
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, incoming.id);
        let accepted = repo
            .list_for_user(&neighbour, Some(ConversationStatus::Accepted))
            .unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, outgoing.id);
        assert!(repo.list_for_user(&UserId::generate(), None).unwrap().is_empty());
    }

    #[test]
    fn duplicate_live_offers_violate_the_index() {
        let conn = with_test_db().unwrap();
        let repo = ConversationRepo::new(&conn);
        let request = seed_request(&conn, &UserId::generate());
        let helper = UserId::generate();
        offer(&repo, &request, &helper);

        let err = repo
            .create(NewConversation {
                help_request_id: request.id.clone(),
                requester_id: request.owner_id.clone(),
                helper_id: helper,
                initial_message: None,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ma_core::ErrorKind::Internal);
    }
}
