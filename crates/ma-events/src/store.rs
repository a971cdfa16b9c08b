use crate::types::{NotificationKind, NotificationRecord};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result, params};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    recipient_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    help_request_id TEXT NOT NULL,
    conversation_id TEXT,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    read_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_notifications_recipient
    ON notifications (recipient_id, created_at);
";

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
}

pub struct NotificationStore<'a> {
    conn: &'a Connection,
}

impl<'a> NotificationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn append(&self, record: &NotificationRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notifications (id, recipient_id, kind, help_request_id, conversation_id, title, body, created_at, read_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.recipient_id,
                record.kind.as_str(),
                record.help_request_id,
                record.conversation_id,
                record.title,
                record.body,
                record.created_at.to_rfc3339(),
                record.read_at.map(|value| value.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn list(&self, recipient_id: &str, limit: Option<u32>) -> Result<Vec<NotificationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recipient_id, kind, help_request_id, conversation_id, title, body, created_at, read_at FROM notifications WHERE recipient_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let limit = limit.map_or(-1, i64::from);
        let rows = stmt.query_map(params![recipient_id, limit], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Returns the record after marking it read, or `None` when the recipient
    /// has no notification with that id.
    pub fn mark_read(
        &self,
        id: &str,
        recipient_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<NotificationRecord>> {
        self.conn.execute(
            "UPDATE notifications SET read_at = ?1 WHERE id = ?2 AND recipient_id = ?3 AND read_at IS NULL",
            params![at.to_rfc3339(), id, recipient_id],
        )?;
        self.conn
            .query_row(
                "SELECT id, recipient_id, kind, help_request_id, conversation_id, title, body, created_at, read_at FROM notifications WHERE id = ?1 AND recipient_id = ?2",
                params![id, recipient_id],
                row_to_record,
            )
            .optional()
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<NotificationRecord> {
    let kind: String = row.get(2)?;
    let created_at: String = row.get(7)?;
    let read_at: Option<String> = row.get(8)?;
    Ok(NotificationRecord {
        id: row.get(0)?,
        recipient_id: row.get(1)?,
        kind: NotificationKind::parse(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown notification kind: {kind}").into(),
            )
        })?,
        help_request_id: row.get(3)?,
        conversation_id: row.get(4)?,
        title: row.get(5)?,
        body: row.get(6)?,
        created_at: parse_timestamp(7, &created_at)?,
        read_at: read_at
            .map(|value| parse_timestamp(8, &value))
            .transpose()?,
    })
}

fn parse_timestamp(index: usize, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })
}
