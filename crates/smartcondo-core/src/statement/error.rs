use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatementError {
    #[error("Administrator privileges are required to view account statements")]
    Unauthorized,

    #[error("Could not load account statement: {0}")]
    Fetch(String),

    #[error("{0}")]
    Action(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl StatementError {
    /// Authorization failures leave the screen unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StatementError::Unauthorized)
    }
}
