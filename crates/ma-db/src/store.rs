use ma_core::MutualAidError;
use ma_core::store::Store;
use rusqlite::Connection;

use crate::conversation_repo::ConversationRepo;
use crate::help_request_repo::HelpRequestRepo;
use crate::message_repo::MessageRepo;
use crate::profile_repo::ProfileRepo;
use crate::util::internal;

pub struct DbStore {
    conn: Connection,
}

impl DbStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Rollback failures are logged; the error that caused the rollback is
    /// the one callers see.
    fn rollback(&self) {
        if self.conn.is_autocommit() {
            return;
        }
        if let Err(err) = self.conn.execute_batch("ROLLBACK") {
            tracing::error!(error = %err, "rollback failed");
        }
    }
}

impl Store for DbStore {
    type Conversations<'a>
        = ConversationRepo<'a>
    where
        Self: 'a;
    type HelpRequests<'a>
        = HelpRequestRepo<'a>
    where
        Self: 'a;
    type Profiles<'a>
        = ProfileRepo<'a>
    where
        Self: 'a;
    type Messages<'a>
        = MessageRepo<'a>
    where
        Self: 'a;

    fn conversations(&self) -> Self::Conversations<'_> {
        ConversationRepo::new(&self.conn)
    }

    fn help_requests(&self) -> Self::HelpRequests<'_> {
        HelpRequestRepo::new(&self.conn)
    }

    fn profiles(&self) -> Self::Profiles<'_> {
        ProfileRepo::new(&self.conn)
    }

    fn messages(&self) -> Self::Messages<'_> {
        MessageRepo::new(&self.conn)
    }

    /// `BEGIN IMMEDIATE` takes the write lock up front, so two writers racing
    /// on one row serialize instead of both reading the same pre-image.
    fn with_tx<F, T>(&self, f: F) -> Result<T, MutualAidError>
    where
        F: FnOnce(&Self) -> Result<T, MutualAidError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE").map_err(internal)?;
        match f(self) {
            Ok(value) => {
                // A failed COMMIT can leave the transaction open.
                if let Err(err) = self.conn.execute_batch("COMMIT") {
                    self.rollback();
                    return Err(internal(err));
                }
                Ok(value)
            }
            Err(err) => {
                self.rollback();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;
    use ma_core::ErrorKind;
    use ma_core::messages::MessageRepository;
    use ma_core::profiles::ProfileRepository;
    use ma_core::types::{ConversationId, NewMessage, UserId};

    #[test]
    fn failed_closure_rolls_back_its_writes() {
        let store = DbStore::new(with_test_db().unwrap());
        let id = UserId::generate();

        let result: Result<(), MutualAidError> = store.with_tx(|store| {
            store.profiles().create(&id, "Rolled Back")?;
            Err(MutualAidError::invalid_input("stop"))
        });
        assert!(result.is_err());
        assert!(store.profiles().get(&id).unwrap().is_none());

        store
            .with_tx(|store| store.profiles().create(&id, "Kept"))
            .unwrap();
        assert_eq!(store.profiles().get(&id).unwrap().unwrap().display_name, "Kept");
    }

    #[test]
    fn failed_commit_is_rolled_back_and_reported() {
        let store = DbStore::new(with_test_db().unwrap());

        let err = store
            .with_tx(|store| {
                store
                    .connection()
                    .execute_batch("PRAGMA defer_foreign_keys = ON")
                    .map_err(internal)?;
                store.messages().create(NewMessage {
                    conversation_id: ConversationId::generate(),
                    sender_id: UserId::generate(),
                    content: "orphan".to_string(),
                })
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(store.connection().is_autocommit());

        let id = UserId::generate();
        store
            .with_tx(|store| store.profiles().create(&id, "After"))
            .unwrap();
        assert!(store.profiles().get(&id).unwrap().is_some());
    }

    #[test]
    fn closure_error_is_kept_when_the_transaction_already_ended() {
        let store = DbStore::new(with_test_db().unwrap());

        let err = store
            .with_tx(|store| -> Result<(), MutualAidError> {
                store
                    .connection()
                    .execute_batch("ROLLBACK")
                    .map_err(internal)?;
                Err(MutualAidError::invalid_input("reason too long"))
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(store.connection().is_autocommit());
    }
}
