use crate::AppState;
use chrono::Utc;
use ma_core::MutualAidError;
use ma_core::profiles::ProfileRepository;
use ma_core::store::Store;
use ma_core::types::{NotificationId, UserId};
use ma_db::schema;
use ma_db::store::DbStore;
use ma_events::bus::DispatchError;
use ma_events::store::NotificationStore;
use ma_events::types::{Notification, NotificationRecord};
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

const UNKNOWN_ACTOR: &str = "Someone";

/// Subscribes before spawning so nothing published after this call is missed.
pub fn spawn(state: AppState) -> JoinHandle<()> {
    let receiver = state.bus.subscribe();
    tokio::spawn(run(state, receiver))
}

pub async fn run(state: AppState, mut receiver: Receiver<Notification>) {
    loop {
        match receiver.recv().await {
            Ok(notification) => {
                let recipient_id = notification.recipient_id.clone();
                let correlation_id = notification.correlation_id.clone();
                match deliver(&state, notification).await {
                    Ok(record) => tracing::info!(
                        notification_id = %record.id,
                        recipient_id = %recipient_id,
                        kind = record.kind.as_str(),
                        correlation_id = ?correlation_id,
                        "notification stored"
                    ),
                    Err(err) => tracing::warn!(
                        recipient_id = %recipient_id,
                        correlation_id = ?correlation_id,
                        error = %err,
                        "notification dropped"
                    ),
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "notification dispatcher lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Renders a notification with the actor's display name and stores it for
/// the recipient.
pub async fn deliver(
    state: &AppState,
    notification: Notification,
) -> Result<NotificationRecord, DispatchError> {
    let actor_name = match UserId::new(notification.actor_id.clone()) {
        Ok(actor) => {
            let db_path = state.db_path.clone();
            state
                .profiles
                .get_or_fetch(&actor, || lookup_display_name(&db_path, &actor))
                .await
                .map_err(store_error)?
        }
        Err(_) => None,
    };
    let (title, body) =
        notification.render(actor_name.as_deref().unwrap_or(UNKNOWN_ACTOR));

    let record = NotificationRecord {
        id: NotificationId::generate().to_string(),
        recipient_id: notification.recipient_id,
        kind: notification.kind,
        help_request_id: notification.help_request_id,
        conversation_id: notification.conversation_id,
        title,
        body,
        created_at: Utc::now(),
        read_at: None,
    };
    let conn = schema::open_and_migrate(&state.db_path).map_err(store_error)?;
    NotificationStore::new(&conn)
        .append(&record)
        .map_err(store_error)?;
    Ok(record)
}

fn lookup_display_name(db_path: &str, user_id: &UserId) -> Result<Option<String>, MutualAidError> {
    let conn = schema::open(db_path).map_err(|err| MutualAidError::internal(err.to_string()))?;
    let store = DbStore::new(conn);
    Ok(store
        .profiles()
        .get(user_id)?
        .map(|profile| profile.display_name))
}

fn store_error(err: impl std::fmt::Display) -> DispatchError {
    DispatchError::Store {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::TestApp;
    use ma_core::types::CreateProfileInput;
    use ma_core::{Lifecycle, RequestContext};
    use ma_events::types::NotificationKind;
    use std::time::Duration;

    fn accepted_by(actor: &UserId, recipient: &UserId) -> Notification {
        Notification {
            kind: NotificationKind::OfferAccepted,
            recipient_id: recipient.to_string(),
            actor_id: actor.to_string(),
            help_request_id: "req_01J9ZQ4V3N8M2K7P6R5T4W3X2Y".to_string(),
            conversation_id: None,
            request_title: "Soup delivery".to_string(),
            reason: None,
            preview: None,
            correlation_id: Some("corr_test".to_string()),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn worker_renders_with_the_actor_name_and_persists() {
        let app = TestApp::new();
        let owner = UserId::generate();
        let helper = UserId::generate();
        {
            let store = DbStore::new(schema::open(&app.state.db_path).unwrap());
            let lifecycle = Lifecycle::new(store, app.state.bus.clone());
            lifecycle
                .profiles()
                .create(
                    &RequestContext::new(owner.clone(), None),
                    CreateProfileInput {
                        display_name: "Marta".to_string(),
                    },
                )
                .unwrap();
        }

        let worker = spawn(app.state.clone());
        app.state.bus.publish(accepted_by(&owner, &helper)).unwrap();

        let mut stored = Vec::new();
        for _ in 0..50 {
            let conn = schema::open(&app.state.db_path).unwrap();
            stored = NotificationStore::new(&conn)
                .list(helper.as_str(), None)
                .unwrap();
            if !stored.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        worker.abort();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Marta accepted your help offer");
        assert_eq!(stored[0].body, "You're now helping with: Soup delivery");
    }
}
