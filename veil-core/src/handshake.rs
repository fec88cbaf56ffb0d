//! Handshake frame parsing and the per-connection authentication state
//! machine.
//!
//! The first binary frame of a connection carries a one-byte protocol version
//! followed by a 16-byte identifier. The identifier is rendered in canonical
//! form and compared against the server identity with exact string equality.
//! A match is acknowledged with a two-byte reply: the echoed version and a
//! zero addon-length byte.
//!
//! Fragmentary frames and mismatches are tolerated rather than fatal: some
//! clients send several candidate frames before the real handshake, so the
//! machine stays receptive until a configurable number of failed attempts
//! has been spent.

use thiserror::Error;
use tracing::{debug, warn};

use crate::ident::{self, ServerIdentity, IDENTIFIER_LEN};

/// Minimum usable handshake frame: the version byte plus the identifier.
pub const MIN_FRAME_LEN: usize = 1 + IDENTIFIER_LEN;

/// Default bound on failed attempts before the session is closed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Why a frame could not be parsed as a handshake.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short for a handshake: {len} bytes")]
    TooShort { len: usize },
}

/// A parsed handshake preamble.
#[derive(Debug, PartialEq, Eq)]
pub struct HandshakeFrame<'a> {
    /// Protocol version, echoed verbatim in the acknowledgment.
    pub version: u8,
    /// Canonical form of the 16-byte identifier at offset 1.
    pub identifier: String,
    /// Whatever followed the preamble (request head and initial payload).
    pub rest: &'a [u8],
}

/// Parse the fixed-layout preamble out of one binary frame.
pub fn parse_frame(data: &[u8]) -> Result<HandshakeFrame<'_>, FrameError> {
    let Some(identifier) = data
        .get(1..MIN_FRAME_LEN)
        .and_then(ident::encode)
    else {
        return Err(FrameError::TooShort { len: data.len() });
    };

    Ok(HandshakeFrame {
        version: data[0],
        identifier,
        rest: &data[MIN_FRAME_LEN..],
    })
}

/// The acknowledgment frame: echoed version, then a zero addon-length byte.
pub fn ack(version: u8) -> [u8; 2] {
    [version, 0x00]
}

/// Result of feeding one inbound frame to the state machine.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The frame carried no usable handshake; nothing changed.
    Ignored,
    /// The identifier matched. Reply with [`ack`]`(version)` and hand the
    /// trailing bytes to the relay. Terminal for the handshake concern.
    Matched { version: u8, payload: Vec<u8> },
    /// Wrong identifier; the session stays open for another attempt.
    Mismatched { observed: String },
    /// The retry bound was spent; the caller should close the session.
    AttemptsExhausted { observed: String },
}

/// Per-connection handshake state.
///
/// One instance per session. Not shared: the transport delivers frames for a
/// session one at a time, so no synchronization is needed here.
#[derive(Debug)]
pub struct Handshake {
    identity: ServerIdentity,
    max_attempts: u32,
    attempts: u32,
    matched: bool,
    last_observed: Option<String>,
}

impl Handshake {
    /// Create a machine bound to the given identity.
    ///
    /// `max_attempts` of zero means unbounded retries.
    pub fn new(identity: ServerIdentity, max_attempts: u32) -> Self {
        Self {
            identity,
            max_attempts,
            attempts: 0,
            matched: false,
            last_observed: None,
        }
    }

    /// The identifier last observed on this connection, for diagnostics.
    pub fn client_id(&self) -> &str {
        self.last_observed.as_deref().unwrap_or("unknown")
    }

    /// Whether a match has already been acknowledged.
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// Feed one inbound binary frame to the machine.
    pub fn on_frame(&mut self, data: &[u8]) -> Outcome {
        if self.matched {
            // Frames after a match are relay payload, not handshakes.
            return Outcome::Ignored;
        }

        let frame = match parse_frame(data) {
            Ok(frame) => frame,
            Err(FrameError::TooShort { len }) => {
                debug!(len, "ignoring fragmentary frame");
                return Outcome::Ignored;
            }
        };

        self.last_observed = Some(frame.identifier.clone());

        if self.identity.matches(&frame.identifier) {
            self.matched = true;
            return Outcome::Matched {
                version: frame.version,
                payload: frame.rest.to_vec(),
            };
        }

        self.attempts += 1;
        if self.max_attempts != 0 && self.attempts >= self.max_attempts {
            warn!(
                observed = %frame.identifier,
                attempts = self.attempts,
                "handshake attempts exhausted"
            );
            return Outcome::AttemptsExhausted {
                observed: frame.identifier,
            };
        }

        debug!(observed = %frame.identifier, "identifier mismatch");
        Outcome::Mismatched {
            observed: frame.identifier,
        }
    }
}
