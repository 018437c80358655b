use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    NoAssetsAvailable,
    FetchFailed,
    DeleteFailed,
}

/// Serializable failure signal handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFault {
    pub kind: ErrorKind,
    pub message: String,
}

impl ReviewFault {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("photo library access denied")]
    PermissionDenied,
    #[error("no assets available in the gallery")]
    NoAssetsAvailable,
    #[error("image fetch failed: {0}")]
    FetchFailed(String),
    #[error("deletion failed: {0}")]
    DeleteFailed(String),
}

impl ReviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied => ErrorKind::PermissionDenied,
            Self::NoAssetsAvailable => ErrorKind::NoAssetsAvailable,
            Self::FetchFailed(_) => ErrorKind::FetchFailed,
            Self::DeleteFailed(_) => ErrorKind::DeleteFailed,
        }
    }
}

impl From<&ReviewError> for ReviewFault {
    fn from(value: &ReviewError) -> Self {
        Self {
            kind: value.kind(),
            message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_carries_kind_and_message() {
        let err = ReviewError::DeleteFailed("asset is locked".into());
        let fault = ReviewFault::from(&err);
        assert_eq!(fault.kind, ErrorKind::DeleteFailed);
        assert_eq!(fault.message, "deletion failed: asset is locked");
    }
}
