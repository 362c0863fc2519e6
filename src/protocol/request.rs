//! Request Decoding
//!
//! Turns one datagram into a [`Request`]. Only the first non-empty line of the
//! datagram is considered; lines are separated by `\r\n`.

use std::time::Duration;

use thiserror::Error;

use super::{parse_int_or, parse_ttl_secs, FIELD_SEPARATOR, LINE_SEPARATOR, LIST_COMMAND};

// == Request ==
/// A decoded PDU. Borrows its fields from the datagram buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// `xxx`: dump every live key
    List,
    /// Insert or refresh `(prefix, suffix)`, admitting at most `max_count`
    /// suffixes under `prefix`. `ttl` is `None` for the three-field form.
    Upsert {
        prefix: &'a str,
        suffix: &'a str,
        ttl: Option<Duration>,
        max_count: usize,
    },
    /// Remove `(prefix, suffix)`
    Delete { prefix: &'a str, suffix: &'a str },
    /// Well-formed but carrying a zero count. Answered with `false`.
    InvalidCount {
        prefix: &'a str,
        suffix: &'a str,
        max_count: i64,
    },
}

impl<'a> Request<'a> {
    /// The `(prefix, suffix)` pair a reply must echo, if any.
    pub fn correlation(&self) -> Option<(&'a str, &'a str)> {
        match *self {
            Request::List => None,
            Request::Upsert { prefix, suffix, .. }
            | Request::Delete { prefix, suffix }
            | Request::InvalidCount { prefix, suffix, .. } => Some((prefix, suffix)),
        }
    }
}

// == Decode Error ==
/// Why a datagram could not be decoded. Never leaves the worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("datagram is not valid UTF-8")]
    NotUtf8,

    #[error("datagram carries no request line")]
    Empty,

    #[error("expected 3 or 4 fields, found {0}")]
    FieldCount(usize),
}

// == Decode ==
/// Decodes a request datagram.
///
/// # Forms
/// - `xxx` lists live keys
/// - `prefix||suffix||maxCount`: positive inserts with the default TTL,
///   negative deletes, zero is invalid
/// - `prefix||suffix||ttlSeconds||maxCount`: inserts or refreshes with a TTL
///   in [300, 900] seconds (300 when unparsable or out of range); zero is
///   invalid, a negative count only refreshes
pub fn decode(pdu: &[u8]) -> Result<Request<'_>, DecodeError> {
    let text = std::str::from_utf8(pdu).map_err(|_| DecodeError::NotUtf8)?;
    let line = text
        .split(LINE_SEPARATOR)
        .find(|line| !line.is_empty())
        .ok_or(DecodeError::Empty)?;

    if line == LIST_COMMAND {
        return Ok(Request::List);
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    match fields[..] {
        [prefix, suffix, count] => {
            let max_count = parse_int_or(count, 0);
            Ok(match max_count {
                n if n > 0 => Request::Upsert {
                    prefix,
                    suffix,
                    ttl: None,
                    max_count: to_count(n),
                },
                n if n < 0 => Request::Delete { prefix, suffix },
                _ => Request::InvalidCount {
                    prefix,
                    suffix,
                    max_count,
                },
            })
        }
        [prefix, suffix, ttl, count] => {
            let max_count = parse_int_or(count, 0);
            if max_count == 0 {
                return Ok(Request::InvalidCount {
                    prefix,
                    suffix,
                    max_count,
                });
            }
            // A negative cap admits nothing new but still refreshes
            Ok(Request::Upsert {
                prefix,
                suffix,
                ttl: Some(Duration::from_secs(parse_ttl_secs(ttl))),
                max_count: to_count(max_count),
            })
        }
        _ => Err(DecodeError::FieldCount(fields.len())),
    }
}

fn to_count(n: i64) -> usize {
    if n <= 0 {
        return 0;
    }
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_list() {
        assert_eq!(decode(b"xxx"), Ok(Request::List));
        assert_eq!(decode(b"xxx\r\n"), Ok(Request::List));
        assert_eq!(decode(b"\r\nxxx\r\ntrailing"), Ok(Request::List));
    }

    #[test]
    fn test_list_must_be_exact() {
        assert_eq!(decode(b"xxxx"), Err(DecodeError::FieldCount(1)));
        assert_eq!(decode(b" xxx"), Err(DecodeError::FieldCount(1)));
    }

    #[test]
    fn test_decode_three_field_insert() {
        assert_eq!(
            decode(b"abc||def||5"),
            Ok(Request::Upsert {
                prefix: "abc",
                suffix: "def",
                ttl: None,
                max_count: 5,
            })
        );
        assert_eq!(
            decode(b"abc||def||+5\r\n"),
            Ok(Request::Upsert {
                prefix: "abc",
                suffix: "def",
                ttl: None,
                max_count: 5,
            })
        );
    }

    #[test]
    fn test_decode_three_field_delete() {
        assert_eq!(
            decode(b"abc||def||-1"),
            Ok(Request::Delete {
                prefix: "abc",
                suffix: "def"
            })
        );
    }

    #[test]
    fn test_decode_zero_or_garbage_count() {
        let pdus: [&[u8]; 4] = [b"abc||def||0", b"abc||def||five", b"abc||def||", b"abc||def||5 "];
        for pdu in pdus {
            assert!(
                matches!(decode(pdu), Ok(Request::InvalidCount { max_count: 0, .. })),
                "{:?}",
                String::from_utf8_lossy(pdu)
            );
        }
    }

    #[test]
    fn test_decode_four_field_ttl_in_range() {
        assert_eq!(
            decode(b"abc||def||600||5"),
            Ok(Request::Upsert {
                prefix: "abc",
                suffix: "def",
                ttl: Some(Duration::from_secs(600)),
                max_count: 5,
            })
        );
    }

    #[test]
    fn test_decode_four_field_ttl_clamped() {
        for ttl in ["10", "901", "abc", "", "-300"] {
            let pdu = format!("abc||def||{ttl}||5");
            let request = decode(pdu.as_bytes()).unwrap();
            assert_eq!(
                request,
                Request::Upsert {
                    prefix: "abc",
                    suffix: "def",
                    ttl: Some(Duration::from_secs(300)),
                    max_count: 5,
                },
                "ttl {ttl:?}"
            );
        }
    }

    #[test]
    fn test_decode_four_field_zero_count() {
        assert!(matches!(
            decode(b"abc||def||600||0"),
            Ok(Request::InvalidCount { max_count: 0, .. })
        ));
        assert!(matches!(
            decode(b"abc||def||600||zero"),
            Ok(Request::InvalidCount { max_count: 0, .. })
        ));
    }

    #[test]
    fn test_decode_four_field_negative_count_is_refresh_only() {
        assert_eq!(
            decode(b"abc||def||600||-1"),
            Ok(Request::Upsert {
                prefix: "abc",
                suffix: "def",
                ttl: Some(Duration::from_secs(600)),
                max_count: 0,
            })
        );
    }

    #[test]
    fn test_decode_bad_field_count() {
        assert_eq!(decode(b"abc"), Err(DecodeError::FieldCount(1)));
        assert_eq!(decode(b"abc||def"), Err(DecodeError::FieldCount(2)));
        assert_eq!(decode(b"a||b||c||d||e"), Err(DecodeError::FieldCount(5)));
    }

    #[test]
    fn test_decode_empty_and_binary() {
        assert_eq!(decode(b""), Err(DecodeError::Empty));
        assert_eq!(decode(b"\r\n\r\n"), Err(DecodeError::Empty));
        assert_eq!(decode(&[0xff, 0xfe, 0x7c]), Err(DecodeError::NotUtf8));
    }

    #[test]
    fn test_correlation() {
        assert_eq!(Request::List.correlation(), None);
        let request = decode(b"abc||def||-1").unwrap();
        assert_eq!(request.correlation(), Some(("abc", "def")));
    }
}
