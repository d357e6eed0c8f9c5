use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};

/// Why a request token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("unauthorized access")]
    InvalidToken,
}

/// Checks request tokens against a shared secret.
///
/// Only the SHA-256 digest of the secret is kept; candidate tokens are
/// compared digest to digest.
#[derive(Clone)]
pub struct TokenAuthenticator {
    secret_digest: Option<[u8; 32]>,
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl TokenAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            secret_digest: Some(digest(secret)),
        }
    }

    /// Accepts every request, token or not.
    pub fn disabled() -> Self {
        Self { secret_digest: None }
    }

    /// Read the secret from `path`. A trailing line break is not part of it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let secret = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read secret key file: {}", path.display()))?;

        let secret = secret.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if secret.is_empty() {
            warn!("Secret key file {} is empty", path.display());
        }

        debug!("Loaded secret key from {}", path.display());
        Ok(Self::new(secret))
    }

    pub fn is_enabled(&self) -> bool {
        self.secret_digest.is_some()
    }

    pub fn verify(&self, token: Option<&str>) -> Result<(), AuthError> {
        let Some(expected) = &self.secret_digest else {
            return Ok(());
        };

        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AuthError::MissingToken),
        };

        if digest(token) == *expected {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(value.as_bytes()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_token() {
        let auth = TokenAuthenticator::new("s3cret");
        assert_eq!(auth.verify(Some("s3cret")), Ok(()));
    }

    #[test]
    fn test_missing_and_invalid_tokens() {
        let auth = TokenAuthenticator::new("s3cret");
        assert_eq!(auth.verify(None), Err(AuthError::MissingToken));
        assert_eq!(auth.verify(Some("")), Err(AuthError::MissingToken));
        assert_eq!(auth.verify(Some("S3CRET")), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_disabled_accepts_anything() {
        let auth = TokenAuthenticator::disabled();
        assert!(!auth.is_enabled());
        assert_eq!(auth.verify(None), Ok(()));
    }

    #[test]
    fn test_from_file_trims_line_break() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        std::fs::write(&path, "abc123\n").unwrap();

        let auth = TokenAuthenticator::from_file(&path).unwrap();
        assert_eq!(auth.verify(Some("abc123")), Ok(()));
        assert_eq!(auth.verify(Some("abc123\n")), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_missing_secret_file() {
        assert!(TokenAuthenticator::from_file("no/such/secret.key").is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", TokenAuthenticator::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
