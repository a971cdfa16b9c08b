use crate::conversation_repo::stored_id;
use crate::util::{from_rfc3339, internal, to_rfc3339};
use chrono::Utc;
use ma_core::MutualAidError;
use ma_core::profiles::ProfileRepository;
use ma_core::types::{Profile, UserId};
use rusqlite::{Connection, params};

pub struct ProfileRepo<'a> {
    conn: &'a Connection,
}

impl<'a> ProfileRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ProfileRepository for ProfileRepo<'_> {
    fn create(&self, id: &UserId, display_name: &str) -> Result<Profile, MutualAidError> {
        let profile = Profile {
            id: id.clone(),
            display_name: display_name.to_string(),
            created_at: Utc::now(),
        };
        self.conn
            .execute(
                "INSERT INTO profiles (id, display_name, created_at) VALUES (?1, ?2, ?3)",
                params![
                    profile.id.as_str(),
                    profile.display_name,
                    to_rfc3339(&profile.created_at)
                ],
            )
            .map_err(internal)?;
        Ok(profile)
    }

    fn get(&self, id: &UserId) -> Result<Option<Profile>, MutualAidError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, display_name, created_at FROM profiles WHERE id = ?1")
            .map_err(internal)?;
        let mut rows = stmt.query([id.as_str()]).map_err(internal)?;
        let Some(row) = rows.next().map_err(internal)? else {
            return Ok(None);
        };
        let id: String = row.get(0).map_err(internal)?;
        let display_name: String = row.get(1).map_err(internal)?;
        let created_at: String = row.get(2).map_err(internal)?;
        Ok(Some(Profile {
            id: UserId::new(id).map_err(stored_id)?,
            display_name,
            created_at: from_rfc3339(&created_at)?,
        }))
    }
}
