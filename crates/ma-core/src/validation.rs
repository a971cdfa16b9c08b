use crate::error::{ConversationError, HelpRequestError, MutualAidError};
use crate::types::{ConversationStatus, HelpRequestStatus};

pub const MAX_REASON_CHARS: usize = 500;
pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const MAX_DISPLAY_NAME_CHARS: usize = 80;

pub fn validate_conversation_transition(
    from: ConversationStatus,
    to: ConversationStatus,
) -> Result<(), ConversationError> {
    use ConversationStatus::{Accepted, Closed, Pending, Rejected};

    let valid = matches!(
        (from, to),
        (Pending, Accepted) | (Pending, Rejected) | (Accepted, Closed)
    );

    if valid {
        Ok(())
    } else {
        Err(ConversationError::InvalidTransition { from, to })
    }
}

/// Checks that a help request may still reach a terminal status.
pub fn validate_request_finish(from: HelpRequestStatus) -> Result<(), HelpRequestError> {
    match from {
        HelpRequestStatus::Open | HelpRequestStatus::InProgress => Ok(()),
        HelpRequestStatus::Completed => Err(HelpRequestError::AlreadyCompleted),
        status @ (HelpRequestStatus::Cancelled | HelpRequestStatus::Closed) => {
            Err(HelpRequestError::Finished { status })
        }
    }
}

/// Trims an optional reason; blank becomes `None`. Length is counted in chars.
pub fn normalize_reason(reason: Option<String>) -> Result<Option<String>, MutualAidError> {
    optional_text("reason", reason, MAX_REASON_CHARS)
}

pub fn normalize_message(message: Option<String>) -> Result<Option<String>, MutualAidError> {
    optional_text("message", message, MAX_MESSAGE_CHARS)
}

/// Message bodies are required; the offer's opening message is not.
pub fn normalize_content(content: &str) -> Result<String, MutualAidError> {
    required_text("message", content, MAX_MESSAGE_CHARS)
}

pub fn normalize_description(
    description: Option<String>,
) -> Result<Option<String>, MutualAidError> {
    optional_text("description", description, MAX_DESCRIPTION_CHARS)
}

pub fn normalize_title(title: &str) -> Result<String, MutualAidError> {
    required_text("title", title, MAX_TITLE_CHARS)
}

pub fn normalize_display_name(name: &str) -> Result<String, MutualAidError> {
    required_text("display name", name, MAX_DISPLAY_NAME_CHARS)
}

fn optional_text(
    field: &str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, MutualAidError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    check_length(field, trimmed, max)?;
    Ok(Some(trimmed.to_string()))
}

fn required_text(field: &str, value: &str, max: usize) -> Result<String, MutualAidError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MutualAidError::invalid_input(format!(
            "{field} must not be empty"
        )));
    }
    check_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), MutualAidError> {
    if value.chars().count() > max {
        return Err(MutualAidError::invalid_input(format!(
            "{field} must be {max} characters or less"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn only_forward_conversation_edges_are_legal() {
        use ConversationStatus::{Accepted, Closed, Pending, Rejected};
        let all = [Pending, Accepted, Rejected, Closed];
        for from in all {
            for to in all {
                let expected = matches!(
                    (from, to),
                    (Pending, Accepted) | (Pending, Rejected) | (Accepted, Closed)
                );
                assert_eq!(
                    validate_conversation_transition(from, to).is_ok(),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn finishing_a_completed_request_reports_already_completed() {
        assert!(validate_request_finish(HelpRequestStatus::Open).is_ok());
        assert!(validate_request_finish(HelpRequestStatus::InProgress).is_ok());
        assert!(matches!(
            validate_request_finish(HelpRequestStatus::Completed),
            Err(HelpRequestError::AlreadyCompleted)
        ));
        assert!(matches!(
            validate_request_finish(HelpRequestStatus::Closed),
            Err(HelpRequestError::Finished {
                status: HelpRequestStatus::Closed
            })
        ));
    }

    #[test]
    fn reason_is_trimmed_and_capped_by_characters() {
        assert_eq!(normalize_reason(None).unwrap(), None);
        assert_eq!(normalize_reason(Some("   ".to_string())).unwrap(), None);
        assert_eq!(
            normalize_reason(Some("  busy week \n".to_string())).unwrap(),
            Some("busy week".to_string())
        );

        // 500 multi-byte characters is still within the cap.
        let at_cap = "é".repeat(MAX_REASON_CHARS);
        assert!(normalize_reason(Some(at_cap)).is_ok());

        let over = "a".repeat(MAX_REASON_CHARS + 1);
        let err = normalize_reason(Some(over)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            err.to_string(),
            "invalid input: reason must be 500 characters or less"
        );
    }

    #[test]
    fn message_content_is_required_and_capped() {
        assert_eq!(normalize_content("  on my way ").unwrap(), "on my way");
        assert_eq!(
            normalize_content(" \n ").unwrap_err().to_string(),
            "invalid input: message must not be empty"
        );
        assert!(normalize_content(&"é".repeat(MAX_MESSAGE_CHARS)).is_ok());
        assert_eq!(
            normalize_content(&"a".repeat(MAX_MESSAGE_CHARS + 1))
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(normalize_title(" Ride ").unwrap(), "Ride");
        assert_eq!(
            normalize_display_name("  ").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
