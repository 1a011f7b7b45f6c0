//! Errors surfaced by the core services

use crate::infrastructure::traits::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    /// Recipient or group is invalid, the caller itself, or not befriended.
    #[error("invalid target")]
    InvalidTarget,
    #[error("content is empty")]
    EmptyContent,
    /// View-once media was already opened; it must not be rendered again.
    #[error("content already opened")]
    AlreadyViewed,
    #[error("not authorized")]
    NotAuthorized,
    /// Also returned for expired content.
    #[error("not found")]
    NotFound,
    #[error("ttl must be at least one hour")]
    InvalidTtl,
    #[error("text messages are not view-once")]
    NotViewOnce,
    /// Transient storage failure. The caller may retry.
    #[error("storage unavailable")]
    Storage(#[from] RepositoryError),
}

impl ContentError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ContentError::Storage(_))
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            ContentError::InvalidTarget => "invalid_target",
            ContentError::EmptyContent => "empty_content",
            ContentError::AlreadyViewed => "already_viewed",
            ContentError::NotAuthorized => "not_authorized",
            ContentError::NotFound => "not_found",
            ContentError::InvalidTtl => "invalid_ttl",
            ContentError::NotViewOnce => "not_view_once",
            ContentError::Storage(_) => "storage_unavailable",
        }
    }
}

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("unsupported content type `{0}`")]
    UnsupportedType(String),
    #[error("upload is empty")]
    Empty,
    #[error("upload of {size} bytes exceeds the limit of {max} bytes")]
    TooLarge { size: usize, max: usize },
    #[error("object store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
