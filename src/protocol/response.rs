//! Reply Encoding
//!
//! Outcome replies echo the request's prefix and suffix so a client can
//! correlate them: `prefix||suffix||true` or `prefix||suffix||false`.

use super::FIELD_SEPARATOR;

// == Reply ==
/// A decoded outcome reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub prefix: String,
    pub suffix: String,
    pub success: bool,
}

impl Reply {
    /// Creates an outcome reply for `(prefix, suffix)`.
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>, success: bool) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            success,
        }
    }

    /// Key a client uses to match this reply to its request.
    pub fn correlation_id(&self) -> String {
        correlation_id(&self.prefix, &self.suffix)
    }

    /// Parses an outcome reply. Returns `None` for anything else, such as a
    /// list dump.
    pub fn decode(datagram: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(datagram).ok()?;
        let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
        match fields.as_slice() {
            [prefix, suffix, flag] => Some(Self::new(*prefix, *suffix, flag.parse().ok()?)),
            _ => None,
        }
    }
}

/// Builds the `prefix||suffix` correlation key.
pub fn correlation_id(prefix: &str, suffix: &str) -> String {
    format!("{prefix}{FIELD_SEPARATOR}{suffix}")
}

// == Encode ==
/// Renders an outcome reply datagram.
pub fn encode_outcome(prefix: &str, suffix: &str, success: bool) -> Vec<u8> {
    format!("{prefix}{FIELD_SEPARATOR}{suffix}{FIELD_SEPARATOR}{success}").into_bytes()
}
