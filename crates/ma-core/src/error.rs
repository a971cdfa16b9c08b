use crate::types::enums::{ConversationStatus, HelpRequestStatus};
use crate::types::ids::IdError;
use thiserror::Error;

/// The failure taxonomy every boundary reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidState,
    AlreadyCompleted,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "InvalidInput",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "NotFound",
            Self::InvalidState => "InvalidState",
            Self::AlreadyCompleted => "AlreadyCompleted",
            Self::Conflict => "Conflict",
            Self::Internal => "Internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("conversation not found")]
    NotFound,
    #[error("not allowed: {message}")]
    Forbidden { message: String },
    #[error("offer already handled: conversation is {from}, cannot become {to}")]
    InvalidTransition {
        from: ConversationStatus,
        to: ConversationStatus,
    },
    #[error("invalid state: {message}")]
    InvalidState { message: String },
    #[error("conflict: {message}")]
    Conflict { message: String },
}

#[derive(Debug, Error)]
pub enum HelpRequestError {
    #[error("help request not found")]
    NotFound,
    #[error("not allowed: {message}")]
    Forbidden { message: String },
    #[error("help request is already completed")]
    AlreadyCompleted,
    #[error("help request is {status} and can no longer change")]
    Finished { status: HelpRequestStatus },
    #[error("invalid state: {message}")]
    InvalidState { message: String },
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile not found")]
    NotFound,
    #[error("profile already exists")]
    AlreadyExists,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum MutualAidError {
    #[error(transparent)]
    Conversation(#[from] ConversationError),
    #[error(transparent)]
    HelpRequest(#[from] HelpRequestError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("authentication required")]
    Unauthorized,
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl MutualAidError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conversation(err) => match err {
                ConversationError::NotFound => ErrorKind::NotFound,
                ConversationError::Forbidden { .. } => ErrorKind::Forbidden,
                ConversationError::InvalidTransition { .. }
                | ConversationError::InvalidState { .. } => ErrorKind::InvalidState,
                ConversationError::Conflict { .. } => ErrorKind::Conflict,
            },
            Self::HelpRequest(err) => match err {
                HelpRequestError::NotFound => ErrorKind::NotFound,
                HelpRequestError::Forbidden { .. } => ErrorKind::Forbidden,
                HelpRequestError::AlreadyCompleted => ErrorKind::AlreadyCompleted,
                HelpRequestError::Finished { .. } | HelpRequestError::InvalidState { .. } => {
                    ErrorKind::InvalidState
                }
            },
            Self::Profile(err) => match err {
                ProfileError::NotFound => ErrorKind::NotFound,
                ProfileError::AlreadyExists => ErrorKind::Conflict,
            },
            Self::Notification(NotificationError::NotFound) => ErrorKind::NotFound,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

impl From<IdError> for MutualAidError {
    fn from(value: IdError) -> Self {
        Self::invalid_input(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_distinguish_not_allowed_handled_and_missing() {
        let forbidden = MutualAidError::from(ConversationError::Forbidden {
            message: "only the requester can accept this offer".to_string(),
        });
        let handled = MutualAidError::from(ConversationError::InvalidTransition {
            from: ConversationStatus::Accepted,
            to: ConversationStatus::Rejected,
        });
        let missing = MutualAidError::from(ConversationError::NotFound);

        assert_eq!(forbidden.kind(), ErrorKind::Forbidden);
        assert!(forbidden.to_string().starts_with("not allowed"));
        assert_eq!(handled.kind(), ErrorKind::InvalidState);
        assert_eq!(
            handled.to_string(),
            "offer already handled: conversation is accepted, cannot become rejected"
        );
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(missing.to_string(), "conversation not found");
    }

    #[test]
    fn completion_errors_map_to_their_kinds() {
        assert_eq!(
            MutualAidError::from(HelpRequestError::AlreadyCompleted).kind(),
            ErrorKind::AlreadyCompleted
        );
        assert_eq!(
            MutualAidError::from(HelpRequestError::Finished {
                status: HelpRequestStatus::Cancelled
            })
            .kind(),
            ErrorKind::InvalidState
        );
    }
}
