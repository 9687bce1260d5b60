use thiserror::Error;

pub type BvfsResult<T> = Result<T, BvfsError>;

/// Error taxonomy shared by every blobvault crate.
///
/// "Not found" is deliberately not an error: lookups (`get_node`, `exists`)
/// return an explicit absent value so callers can distinguish "doesn't exist"
/// from "operation invalid".
#[derive(Debug, Error)]
pub enum BvfsError {
    /// Node name is empty or contains a forbidden character.
    /// Raised before any tree state is mutated.
    #[error("invalid node name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A path operation targets a missing path, or a segment that should be
    /// a directory is actually a file.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Passphrase-hash mismatch on restore, or AEAD tag verification failure
    /// on chunk decrypt. Always fatal for the operation in progress.
    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    /// A chunk fetch or store exhausted its retry budget. Fatal for the
    /// enclosing stream.
    #[error("transfer failure: {0}")]
    TransferFailure(String),

    /// Malformed wire data: manifest rows, export header lines, hex fields.
    #[error("format error: {0}")]
    Format(String),

    /// Storage collaborator reported an error for a single store/fetch call.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BvfsError {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}
