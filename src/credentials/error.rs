use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to read credential store {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid base64 auth token: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Decoded auth token has no ':' separating identity and secret")]
    MissingDelimiter,

    #[error("Credential store has no registry entry with an auth token")]
    NoAuthEntries,

    #[error("Invalid auth envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

impl CredentialError {
    /// Whether no image can be pulled until an operator fixes the credential store.
    ///
    /// Missing delimiters and empty stores only skip the current image; the store
    /// is re-read on the next attempt.
    pub fn is_fatal(&self) -> bool {
        match self {
            CredentialError::Read { .. }
            | CredentialError::InvalidBase64(_)
            | CredentialError::Envelope(_) => true,
            CredentialError::MissingDelimiter | CredentialError::NoAuthEntries => false,
        }
    }
}
