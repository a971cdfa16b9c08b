use chrono::{DateTime, Utc};
use ma_core::MutualAidError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("json decode failed: {message}")]
    JsonDecode { message: String },
    #[error("invalid timestamp: {value}")]
    InvalidTimestamp { value: String },
}

impl From<DbError> for MutualAidError {
    fn from(value: DbError) -> Self {
        MutualAidError::internal(value.to_string())
    }
}

/// Storage failures never carry domain meaning; they surface as `Internal`.
pub fn internal(err: rusqlite::Error) -> MutualAidError {
    MutualAidError::internal(err.to_string())
}

pub fn to_rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub fn from_rfc3339(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DbError::InvalidTimestamp {
            value: value.to_string(),
        })
}

pub fn from_opt_rfc3339(value: Option<String>) -> Result<Option<DateTime<Utc>>, DbError> {
    value.as_deref().map(from_rfc3339).transpose()
}

pub fn decode_enum<T: DeserializeOwned>(value: &str) -> Result<T, DbError> {
    let json = Value::String(value.to_string());
    serde_json::from_value(json).map_err(|err| DbError::JsonDecode {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ma_core::ErrorKind;
    use ma_core::types::HelpRequestStatus;

    #[test]
    fn enums_are_read_back_from_their_wire_names() {
        assert_eq!(
            decode_enum::<HelpRequestStatus>("in_progress").unwrap(),
            HelpRequestStatus::InProgress
        );
        assert!(decode_enum::<HelpRequestStatus>("InProgress").is_err());
    }

    #[test]
    fn bad_timestamps_become_internal_errors() {
        let err: MutualAidError = from_rfc3339("yesterday").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
