use crate::conversation_repo::stored_id;
use crate::util::{decode_enum, from_opt_rfc3339, from_rfc3339, internal, to_rfc3339};
use chrono::{DateTime, Utc};
use ma_core::MutualAidError;
use ma_core::help_requests::HelpRequestRepository;
use ma_core::types::{HelpRequest, HelpRequestId, HelpRequestStatus, NewHelpRequest, UserId};
use rusqlite::{Connection, params};

const COLUMNS: &str = "id, owner_id, helper_id, title, description, status, close_reason, created_at, completed_at, cancelled_at, closed_at";
const ACTIVE: &str = "status IN ('open', 'in_progress')";

pub struct HelpRequestRepo<'a> {
    conn: &'a Connection,
}

impl<'a> HelpRequestRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl HelpRequestRepository for HelpRequestRepo<'_> {
    fn create(&self, input: NewHelpRequest) -> Result<HelpRequest, MutualAidError> {
        let request = HelpRequest {
            id: HelpRequestId::generate(),
            owner_id: input.owner_id,
            helper_id: None,
            title: input.title,
            description: input.description,
            status: HelpRequestStatus::Open,
            close_reason: None,
            created_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
            closed_at: None,
        };
        self.conn
            .execute(
                "INSERT INTO help_requests (id, owner_id, title, description, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    request.id.as_str(),
                    request.owner_id.as_str(),
                    request.title,
                    request.description,
                    request.status.as_str(),
                    to_rfc3339(&request.created_at),
                ],
            )
            .map_err(internal)?;
        Ok(request)
    }

    fn get(&self, id: &HelpRequestId) -> Result<Option<HelpRequest>, MutualAidError> {
        let sql = format!("SELECT {COLUMNS} FROM help_requests WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(internal)?;
        let mut rows = stmt.query([id.as_str()]).map_err(internal)?;
        let Some(row) = rows.next().map_err(internal)? else {
            return Ok(None);
        };
        map_help_request_row(row).map(Some)
    }

    fn mark_in_progress(&self, id: &HelpRequestId) -> Result<(), MutualAidError> {
        self.conn
            .execute(
                "UPDATE help_requests SET status = 'in_progress' WHERE id = ?1 AND status = 'open'",
                [id.as_str()],
            )
            .map_err(internal)?;
        Ok(())
    }

    fn assign_helper(
        &self,
        id: &HelpRequestId,
        helper_id: &UserId,
    ) -> Result<Option<HelpRequest>, MutualAidError> {
        let sql = format!(
            "UPDATE help_requests SET helper_id = ?1, status = 'in_progress' WHERE id = ?2 AND helper_id IS NULL AND {ACTIVE}"
        );
        let changed = self
            .conn
            .execute(&sql, [helper_id.as_str(), id.as_str()])
            .map_err(internal)?;
        if changed == 0 {
            return Ok(None);
        }
        self.get(id)
    }

    fn finish(
        &self,
        id: &HelpRequestId,
        to: HelpRequestStatus,
        at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> Result<Option<HelpRequest>, MutualAidError> {
        let stamp = match to {
            HelpRequestStatus::Completed => "completed_at",
            HelpRequestStatus::Cancelled => "cancelled_at",
            HelpRequestStatus::Closed => "closed_at",
            HelpRequestStatus::Open | HelpRequestStatus::InProgress => {
                return Err(MutualAidError::internal(format!(
                    "{to} is not a terminal status"
                )));
            }
        };
        let sql = format!(
            "UPDATE help_requests SET status = ?1, {stamp} = ?2, close_reason = COALESCE(?3, close_reason) WHERE id = ?4 AND {ACTIVE}"
        );
        let changed = self
            .conn
            .execute(
                &sql,
                params![to.as_str(), to_rfc3339(&at), reason, id.as_str()],
            )
            .map_err(internal)?;
        if changed == 0 {
            return Ok(None);
        }
        self.get(id)
    }
}

fn map_help_request_row(row: &rusqlite::Row<'_>) -> Result<HelpRequest, MutualAidError> {
    let id: String = row.get(0).map_err(internal)?;
    let owner_id: String = row.get(1).map_err(internal)?;
    let helper_id: Option<String> = row.get(2).map_err(internal)?;
    let title: String = row.get(3).map_err(internal)?;
    let description: Option<String> = row.get(4).map_err(internal)?;
    let status: String = row.get(5).map_err(internal)?;
    let close_reason: Option<String> = row.get(6).map_err(internal)?;
    let created_at: String = row.get(7).map_err(internal)?;
    let completed_at: Option<String> = row.get(8).map_err(internal)?;
    let cancelled_at: Option<String> = row.get(9).map_err(internal)?;
    let closed_at: Option<String> = row.get(10).map_err(internal)?;

    let helper_id = match helper_id {
        Some(value) => Some(UserId::new(value).map_err(stored_id)?),
        None => None,
    };

    Ok(HelpRequest {
        id: HelpRequestId::new(id).map_err(stored_id)?,
        owner_id: UserId::new(owner_id).map_err(stored_id)?,
        helper_id,
        title,
        description,
        status: decode_enum(&status)?,
        close_reason,
        created_at: from_rfc3339(&created_at)?,
        completed_at: from_opt_rfc3339(completed_at)?,
        cancelled_at: from_opt_rfc3339(cancelled_at)?,
        closed_at: from_opt_rfc3339(closed_at)?,
    })
}
