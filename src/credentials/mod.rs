//! Registry credential resolution
//!
//! Reads the mounted credential store on every call and turns its auth token
//! into the envelope handed to the registry client. Nothing is cached.

pub mod envelope;
pub mod error;
pub mod store;

use std::path::{Path, PathBuf};
use tracing::debug;

pub use envelope::AuthEnvelope;
pub use error::CredentialError;
pub use store::CredentialStore;

#[derive(Debug, Clone)]
pub struct CredentialResolver {
    path: PathBuf,
}

impl CredentialResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the credential store and derive a fresh auth envelope
    pub async fn resolve(&self) -> Result<AuthEnvelope, CredentialError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CredentialError::Read {
                path: self.path.clone(),
                source,
            })?;

        let token = CredentialStore::parse(&contents).token()?;
        let envelope = AuthEnvelope::from_token(&token)?;
        let header = envelope.encode()?;

        // Identity and secret are the same string here, so neither is logged
        debug!(
            "Resolved registry auth from {} ({} byte header)",
            self.path.display(),
            header.len()
        );

        Ok(envelope)
    }
}
