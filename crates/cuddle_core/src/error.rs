use thiserror::Error;

use crate::section::SectionKey;

/// Failures reported by a [`crate::notifications::NotificationStore`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("notifications are not authorized")]
    NotAuthorized,

    #[error("invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("trigger cannot be scheduled: {0}")]
    InvalidTrigger(String),

    #[error("notification store unavailable: {0}")]
    Unavailable(String),
}

/// Caller-side misuse of the section table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SectionError {
    #[error("rows in section {0:?} cannot be removed")]
    NotEditable(SectionKey),

    #[error("row {row} is out of bounds for section {key:?}")]
    RowOutOfBounds { key: SectionKey, row: usize },

    #[error("{provider:?} provider cannot be installed under {key:?}")]
    KeyMismatch { key: SectionKey, provider: SectionKey },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {var}")]
    InvalidValue { var: &'static str, value: String },

    #[error("{var} must be greater than zero")]
    MustBePositive { var: &'static str },
}
