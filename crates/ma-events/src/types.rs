use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A lifecycle side effect addressed to one user, before it is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient_id: String,
    pub actor_id: String,
    pub help_request_id: String,
    pub conversation_id: Option<String>,
    pub request_title: String,
    pub reason: Option<String>,
    /// Message text for `MessageReceived`; shortened when rendered.
    #[serde(default)]
    pub preview: Option<String>,
    pub correlation_id: Option<String>,
    pub at: DateTime<Utc>,
}

/// A rendered notification as stored for the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub help_request_id: String,
    pub conversation_id: Option<String>,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub enum NotificationKind {
    OfferReceived,
    OfferAccepted,
    OfferRejected,
    RequestCompleted,
    RequestCancelled,
    MessageReceived,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OfferReceived => "OfferReceived",
            Self::OfferAccepted => "OfferAccepted",
            Self::OfferRejected => "OfferRejected",
            Self::RequestCompleted => "RequestCompleted",
            Self::RequestCancelled => "RequestCancelled",
            Self::MessageReceived => "MessageReceived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OfferReceived" => Some(Self::OfferReceived),
            "OfferAccepted" => Some(Self::OfferAccepted),
            "OfferRejected" => Some(Self::OfferRejected),
            "RequestCompleted" => Some(Self::RequestCompleted),
            "RequestCancelled" => Some(Self::RequestCancelled),
            "MessageReceived" => Some(Self::MessageReceived),
            _ => None,
        }
    }
}

impl Notification {
    /// Renders the title and body shown to the recipient. `actor_name` is the
    /// display name of whoever caused the notification.
    pub fn render(&self, actor_name: &str) -> (String, String) {
        let title = &self.request_title;
        match self.kind {
            NotificationKind::OfferReceived => (
                format!("{actor_name} wants to help!"),
                format!(
                    "{actor_name} has offered to help with \"{title}\". Open your messages to accept or decline."
                ),
            ),
            NotificationKind::OfferAccepted => (
                format!("{actor_name} accepted your help offer"),
                format!("You're now helping with: {title}"),
            ),
            NotificationKind::OfferRejected => (
                format!("{actor_name} declined your help offer"),
                match &self.reason {
                    Some(reason) => format!("Your offer for \"{title}\" was declined: {reason}"),
                    None => format!("Your offer for \"{title}\" was declined"),
                },
            ),
            NotificationKind::RequestCompleted => (
                "Help request completed".to_string(),
                format!("\"{title}\" was marked as completed by {actor_name}"),
            ),
            NotificationKind::RequestCancelled => (
                "Help request cancelled".to_string(),
                match &self.reason {
                    Some(reason) => format!("\"{title}\" was cancelled by {actor_name}: {reason}"),
                    None => format!("\"{title}\" was cancelled by {actor_name}"),
                },
            ),
            NotificationKind::MessageReceived => (
                format!("New message from {actor_name}"),
                shorten(self.preview.as_deref().unwrap_or_default()),
            ),
        }
    }
}

const PREVIEW_CHARS: usize = 100;

fn shorten(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(kind: NotificationKind, reason: Option<&str>) -> Notification {
        Notification {
            kind,
            recipient_id: "usr_a".to_string(),
            actor_id: "usr_b".to_string(),
            help_request_id: "req_a".to_string(),
            conversation_id: None,
            request_title: "Groceries".to_string(),
            reason: reason.map(str::to_string),
            preview: None,
            correlation_id: None,
            at: Utc::now(),
        }
    }

    #[test]
    fn rejected_offer_includes_reason_when_present() {
        let (title, body) =
            notification(NotificationKind::OfferRejected, Some("found someone")).render("Ana");
        assert_eq!(title, "Ana declined your help offer");
        assert!(body.ends_with("declined: found someone"));

        let (_, body) = notification(NotificationKind::OfferRejected, None).render("Ana");
        assert_eq!(body, "Your offer for \"Groceries\" was declined");
    }

    #[test]
    fn message_preview_is_cut_at_a_hundred_characters() {
        let mut short = notification(NotificationKind::MessageReceived, None);
        short.preview = Some("See you at six".to_string());
        assert_eq!(
            short.render("Bea"),
            ("New message from Bea".to_string(), "See you at six".to_string())
        );

        let mut long = notification(NotificationKind::MessageReceived, None);
        long.preview = Some("é".repeat(150));
        let (_, body) = long.render("Bea");
        assert_eq!(body, format!("{}...", "é".repeat(100)));
        assert_eq!(
            NotificationKind::parse(NotificationKind::MessageReceived.as_str()),
            Some(NotificationKind::MessageReceived)
        );
    }
}
