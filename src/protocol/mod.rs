//! Protocol Module
//!
//! ASCII, `||`-delimited request/response format carried one PDU per datagram.
//!
//! # Requests
//! - `xxx` - dump every live key
//! - `prefix||suffix||maxCount` - insert/refresh (`> 0`) or delete (`< 0`)
//! - `prefix||suffix||ttlSeconds||maxCount` - insert/refresh with a TTL
//!
//! # Replies
//! - `prefix||suffix||true|false`

mod request;
mod response;

pub use request::{decode, DecodeError, Request};
pub use response::{correlation_id, encode_outcome, Reply};

// == Public Constants ==
/// Separator between fields of a request or reply
pub const FIELD_SEPARATOR: &str = "||";

/// Separator between lines of a datagram
pub const LINE_SEPARATOR: &str = "\r\n";

/// Request line asking for a dump of live keys
pub const LIST_COMMAND: &str = "xxx";

/// Smallest TTL a request may ask for, in seconds
pub const MIN_TTL_SECS: u64 = 300;

/// Largest TTL a request may ask for, in seconds
pub const MAX_TTL_SECS: u64 = 900;

/// TTL used when a requested TTL is missing or out of range, in seconds
pub const DEFAULT_TTL_SECS: u64 = 300;

// == Integer Parsing ==
/// Parses an optionally signed decimal integer, or returns `fallback`.
///
/// Accepts a single leading `+` or `-` followed by ASCII digits only.
/// Whitespace, empty input and overflow all yield `fallback`.
pub fn parse_int_or(s: &str, fallback: i64) -> i64 {
    s.parse().unwrap_or(fallback)
}

/// Parses an integer and keeps it only if it lies in `min..=max`.
pub fn parse_int_in_range(s: &str, fallback: i64, min: i64, max: i64) -> i64 {
    match s.parse::<i64>() {
        Ok(n) if (min..=max).contains(&n) => n,
        _ => fallback,
    }
}

/// TTL seconds from a request or config field, limited to
/// [`MIN_TTL_SECS`]..=[`MAX_TTL_SECS`] with [`DEFAULT_TTL_SECS`] otherwise.
pub fn parse_ttl_secs(s: &str) -> u64 {
    let secs = parse_int_in_range(
        s,
        DEFAULT_TTL_SECS as i64,
        MIN_TTL_SECS as i64,
        MAX_TTL_SECS as i64,
    );
    secs as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_or_accepts_signs() {
        assert_eq!(parse_int_or("42", 0), 42);
        assert_eq!(parse_int_or("+42", 0), 42);
        assert_eq!(parse_int_or("-42", 0), -42);
        assert_eq!(parse_int_or("007", 0), 7);
    }

    #[test]
    fn test_parse_int_or_fallback() {
        for s in ["", "+", "-", " 1", "1 ", "1.0", "0x10", "--1", "99999999999999999999"] {
            assert_eq!(parse_int_or(s, -7), -7, "{s:?}");
        }
    }

    #[test]
    fn test_parse_int_in_range() {
        assert_eq!(parse_int_in_range("5", 1, 0, 10), 5);
        assert_eq!(parse_int_in_range("0", 1, 0, 10), 0);
        assert_eq!(parse_int_in_range("10", 1, 0, 10), 10);
        assert_eq!(parse_int_in_range("11", 1, 0, 10), 1);
        assert_eq!(parse_int_in_range("-1", 1, 0, 10), 1);
        assert_eq!(parse_int_in_range("x", 1, 0, 10), 1);
    }

    #[test]
    fn test_parse_ttl_secs() {
        assert_eq!(parse_ttl_secs("300"), 300);
        assert_eq!(parse_ttl_secs("450"), 450);
        assert_eq!(parse_ttl_secs("900"), 900);
        assert_eq!(parse_ttl_secs("299"), DEFAULT_TTL_SECS);
        assert_eq!(parse_ttl_secs("901"), DEFAULT_TTL_SECS);
        assert_eq!(parse_ttl_secs("10"), DEFAULT_TTL_SECS);
        assert_eq!(parse_ttl_secs(""), DEFAULT_TTL_SECS);
    }
}
