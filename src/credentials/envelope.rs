use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE as BASE64_URL};
use base64::Engine;
use bollard::auth::DockerCredentials;
use serde::Deserialize;

use super::error::CredentialError;

/// Opaque base64 token decoding to "identity:secret"
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the token into an `(identity, secret)` pair.
    ///
    /// Both halves are the text before the first ':'. Registry robot tokens use a
    /// single string for both fields, so the part after the colon is discarded.
    /// Bytes that are not UTF-8 are replaced rather than rejected.
    pub fn decode(&self) -> Result<(String, String), CredentialError> {
        let decoded = BASE64.decode(self.0.trim())?;
        let decoded = String::from_utf8_lossy(&decoded);

        let (identity, _) = decoded
            .split_once(':')
            .ok_or(CredentialError::MissingDelimiter)?;

        Ok((identity.to_string(), identity.to_string()))
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Registry authentication passed along with a pull request
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AuthEnvelope {
    pub username: String,
    pub password: String,
}

impl AuthEnvelope {
    pub fn from_token(token: &AuthToken) -> Result<Self, CredentialError> {
        let (username, password) = token.decode()?;
        Ok(Self { username, password })
    }

    /// The `X-Registry-Auth` header value bollard sends for these credentials:
    /// URL-safe base64 of the serialized `DockerCredentials`
    pub fn encode(&self) -> Result<String, CredentialError> {
        let json = serde_json::to_vec(&self.to_docker_credentials())?;
        Ok(BASE64_URL.encode(json))
    }

    #[cfg(test)]
    pub fn decode(encoded: &str) -> Result<Self, CredentialError> {
        let json = BASE64_URL.decode(encoded.trim())?;
        Ok(serde_json::from_slice(&json)?)
    }

    pub fn to_docker_credentials(&self) -> DockerCredentials {
        DockerCredentials {
            username: Some(self.username.clone()),
            password: Some(self.password.clone()),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for AuthEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The username doubles as the secret for robot tokens
        f.debug_struct("AuthEnvelope")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}
