use thiserror::Error;

/// Rejection raised before any comment reaches storage. The message is meant
/// to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Comment cannot be empty")]
    EmptyText,
    #[error("invalid parent id: {0}")]
    InvalidParentId(String),
    #[error("invalid comment id: {0}")]
    InvalidId(String),
    #[error("{field} must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}
