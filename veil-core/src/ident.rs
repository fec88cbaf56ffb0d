//! Identifier codec and the server's pre-shared identity.
//!
//! Clients authenticate by presenting a 16-byte identifier whose canonical
//! textual form (36 characters, hyphenated 8-4-4-4-12 lowercase hex) must
//! equal the identity configured for this process.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

/// Length of a raw binary identifier.
pub const IDENTIFIER_LEN: usize = 16;

/// Errors from constructing a [`ServerIdentity`] out of configured text.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identifier {0:?} is not a valid hyphenated identifier")]
    Unparseable(String),
}

/// The single pre-shared identifier clients must present.
///
/// Set once at process start and passed by reference to every session;
/// never regenerated within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity(String);

impl ServerIdentity {
    /// Generate a fresh random identity for this process.
    pub fn random() -> Self {
        Self(Uuid::new_v4().as_hyphenated().to_string())
    }

    /// The canonical lowercase hyphenated form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact string comparison against a decoded client identifier.
    ///
    /// The handshake authenticates on equality alone; it does not consult
    /// [`is_canonical_v4`].
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl FromStr for ServerIdentity {
    type Err = IdentityError;

    /// Accepts only the 36-character hyphenated form (case-insensitive,
    /// normalized to lowercase). Simple, braced, and urn renderings are
    /// rejected so a misconfigured identifier fails loudly at startup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 36 {
            return Err(IdentityError::Unparseable(s.to_string()));
        }
        let uuid =
            Uuid::try_parse(trimmed).map_err(|_| IdentityError::Unparseable(s.to_string()))?;
        Ok(Self(uuid.as_hyphenated().to_string()))
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render a raw binary identifier in canonical form.
///
/// Returns `None` unless `bytes` is exactly [`IDENTIFIER_LEN`] long.
pub fn encode(bytes: &[u8]) -> Option<String> {
    Uuid::from_slice(bytes)
        .ok()
        .map(|u| u.as_hyphenated().to_string())
}

static CANONICAL_V4: OnceLock<Regex> = OnceLock::new();

/// Strict format check for a version-4 identifier: hex digits are
/// case-insensitive, the version nibble must be `4` and the variant nibble
/// one of `8`, `9`, `a`, `b`.
///
/// This is a standalone utility (the `/debug` endpoint reports it); the
/// authentication path uses [`ServerIdentity::matches`], not this check.
pub fn is_canonical_v4(text: &str) -> bool {
    let re = CANONICAL_V4.get_or_init(|| {
        Regex::new(
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-4[0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$",
        )
        .expect("canonical identifier pattern compiles")
    });
    re.is_match(text)
}
