//! Hashing System - SHA-256 Digests for Generation Inputs
//!
//! Every generation attempt is keyed by a deterministic 256-bit digest of its
//! `HashInput`. The digest backend is chosen once by the host and injected
//! into a `DigestEngine`; all backends produce byte-identical output.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::sha256;

/// Length of a digest in lowercase hex characters.
pub const DIGEST_HEX_LEN: usize = 64;

const SALT_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("Digest must be 64 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("Digest contains non-hex character {0:?}")]
    InvalidCharacter(char),
}

/// Inputs to one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashInput {
    pub name: String,
    pub category: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub salt: String,
}

impl HashInput {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        timestamp: i64,
        salt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            timestamp,
            salt: salt.into(),
        }
    }

    /// Serialized form fed to the digest: `name|category|timestamp|salt`.
    /// The name is trimmed and lower-cased so cosmetic variants collide.
    pub fn message(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.name.trim().to_lowercase(),
            self.category,
            self.timestamp,
            self.salt
        )
    }
}

/// Build a `HashInput` stamped with the current time.
///
/// A caller-supplied salt enables reproducible regeneration; otherwise a
/// fresh random token is drawn.
pub fn generate_hash_input(name: &str, category: &str, existing_salt: Option<&str>) -> HashInput {
    let salt = match existing_salt {
        Some(salt) => salt.to_string(),
        None => random_salt(),
    };
    HashInput::new(name, category, Utc::now().timestamp_millis(), salt)
}

/// Random salt token (16 lowercase hex characters).
pub fn random_salt() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(SALT_LEN);
    token
}

/// A 256-bit digest as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse an externally supplied hex digest. Uppercase is accepted and
    /// normalized.
    pub fn from_hex(hex: &str) -> Result<Self, DigestError> {
        if hex.len() != DIGEST_HEX_LEN {
            return Err(DigestError::InvalidLength(hex.len()));
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(DigestError::InvalidCharacter(bad));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Digest {
    type Error = DigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Digest::from_hex(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

/// Capability interface for a 256-bit digest primitive.
pub trait DigestBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn digest_bytes(&self, message: &[u8]) -> [u8; 32];
}

/// Platform primitive backed by the `sha2` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSha256;

impl DigestBackend for NativeSha256 {
    fn name(&self) -> &'static str {
        "native"
    }

    fn digest_bytes(&self, message: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(message);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}

/// Pure Rust fallback for hosts without the native primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableSha256;

impl DigestBackend for PortableSha256 {
    fn name(&self) -> &'static str {
        "portable"
    }

    fn digest_bytes(&self, message: &[u8]) -> [u8; 32] {
        sha256::sha256(message)
    }
}

/// Which backend the host selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestBackendKind {
    #[default]
    Native,
    Portable,
}

impl DigestBackendKind {
    pub fn backend(self) -> Box<dyn DigestBackend> {
        match self {
            DigestBackendKind::Native => Box::new(NativeSha256),
            DigestBackendKind::Portable => Box::new(PortableSha256),
        }
    }
}

/// Digest function bound to one backend for its whole lifetime.
pub struct DigestEngine {
    backend: Box<dyn DigestBackend>,
}

impl DigestEngine {
    pub fn new(backend: Box<dyn DigestBackend>) -> Self {
        Self { backend }
    }

    pub fn native() -> Self {
        Self::new(Box::new(NativeSha256))
    }

    pub fn portable() -> Self {
        Self::new(Box::new(PortableSha256))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Digest any string, including the empty string.
    pub fn digest(&self, message: &str) -> Digest {
        Digest::from_bytes(self.backend.digest_bytes(message.as_bytes()))
    }

    pub fn digest_input(&self, input: &HashInput) -> Digest {
        self.digest(&input.message())
    }
}

impl Default for DigestEngine {
    fn default() -> Self {
        Self::native()
    }
}

impl fmt::Debug for DigestEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestEngine")
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Digest via the native primitive.
pub fn digest(message: &str) -> Digest {
    DigestEngine::native().digest(message)
}

/// Digest via the portable fallback. Identical output to [`digest`].
pub fn digest_sync(message: &str) -> Digest {
    DigestEngine::portable().digest(message)
}
