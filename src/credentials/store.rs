//! Credential store parsing
//!
//! The mounted store is either a Docker `config.json` style document
//! (`{"auths": {"<registry>": {"auth": "<base64>"}}}`) or a bare base64 auth
//! token. Anything that does not deserialize as the former is treated as the
//! latter.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::envelope::AuthToken;
use super::error::CredentialError;

/// Docker config.json subset: registry host -> auth entry
#[derive(Debug, Clone, Deserialize)]
pub struct DockerConfig {
    pub auths: BTreeMap<String, AuthEntry>,
}

/// Authentication entry in a Docker config; fields other than `auth` are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthEntry {
    /// Base64-encoded "identity:secret"
    #[serde(default)]
    pub auth: Option<String>,
}

#[derive(Debug, Clone)]
pub enum CredentialStore {
    Structured(DockerConfig),
    RawToken(String),
}

impl CredentialStore {
    pub fn parse(contents: &str) -> Self {
        match serde_json::from_str::<DockerConfig>(contents) {
            Ok(config) => CredentialStore::Structured(config),
            Err(e) => {
                debug!("Credential store is not a Docker config ({}), using raw token", e);
                CredentialStore::RawToken(contents.trim().to_string())
            }
        }
    }

    /// Select the auth token to use.
    ///
    /// For a structured store, entries without an `auth` value are skipped and the
    /// registry that sorts last by host name wins.
    pub fn token(&self) -> Result<AuthToken, CredentialError> {
        match self {
            CredentialStore::RawToken(token) => Ok(AuthToken::new(token.clone())),
            CredentialStore::Structured(config) => {
                let candidates: Vec<(&String, &str)> = config
                    .auths
                    .iter()
                    .filter_map(|(registry, entry)| {
                        entry
                            .auth
                            .as_deref()
                            .map(str::trim)
                            .filter(|auth| !auth.is_empty())
                            .map(|auth| (registry, auth))
                    })
                    .collect();

                let (registry, auth) = candidates
                    .last()
                    .copied()
                    .ok_or(CredentialError::NoAuthEntries)?;

                if candidates.len() > 1 {
                    warn!(
                        "Credential store has {} registries with auth tokens, using '{}'",
                        candidates.len(),
                        registry
                    );
                }

                Ok(AuthToken::new(auth.to_string()))
            }
        }
    }
}
