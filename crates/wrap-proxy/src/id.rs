//! Client-facing identifier codec.
//!
//! Every id handed to a client names a pair `(upstream index, native id)`.
//! With a single upstream the wire form is the native id itself, so
//! non-multiplexed deployments stay byte-compatible. With more than one the
//! wire form is `<index>::<native id>`; only the first `::` is a delimiter,
//! the native id may contain further separators.

use std::fmt;

use crate::userdata::UserData;

/// Reserved delimiter between the upstream index and the native id.
pub const SEPARATOR: &str = "::";

/// An id scoped to one upstream of a [`UserData`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    pub upstream_index: usize,
    pub native_id: String,
}

/// Reasons a client-facing id cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("malformed id: {id:?}")]
    Malformed { id: String },

    #[error("upstream index {index} out of range (configured upstreams: {count})")]
    UpstreamIndexOutOfRange { index: usize, count: usize },
}

impl CompositeId {
    pub fn new(upstream_index: usize, native_id: impl Into<String>) -> Self {
        Self {
            upstream_index,
            native_id: native_id.into(),
        }
    }
}

impl fmt::Display for CompositeId {
    /// Always the multiplexed form; use [`encode`] for the wire form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.upstream_index, self.native_id)
    }
}

/// Decode a client-facing id against the requester's configuration.
pub fn decode(id: &str, user_data: &UserData) -> Result<CompositeId, IdError> {
    let count = user_data.upstreams().len();
    if count == 1 {
        return Ok(CompositeId::new(0, id));
    }

    let (index, native_id) = id.split_once(SEPARATOR).ok_or_else(|| IdError::Malformed {
        id: id.to_string(),
    })?;
    let index = parse_index(index).ok_or_else(|| IdError::Malformed {
        id: id.to_string(),
    })?;
    if index >= count {
        return Err(IdError::UpstreamIndexOutOfRange { index, count });
    }

    Ok(CompositeId::new(index, native_id))
}

/// Encode `id` into its client-facing form for `user_data`.
pub fn encode(id: &CompositeId, user_data: &UserData) -> String {
    if user_data.upstreams().len() == 1 {
        id.native_id.clone()
    } else {
        id.to_string()
    }
}

/// Parse a canonical decimal index: digits only, no sign, no leading zero.
///
/// `usize::from_str` would also accept `+1` and `01`, which would decode to
/// an id that encodes back to a different string.
fn parse_index(token: &str) -> Option<usize> {
    let canonical = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    if !canonical {
        return None;
    }
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::userdata::UpstreamConfig;

    fn user_data(count: usize) -> UserData {
        let upstreams = (0..count)
            .map(|i| UpstreamConfig::new(format!("https://{i}.example")).unwrap())
            .collect();
        UserData::new(upstreams).unwrap()
    }

    #[test]
    fn test_single_upstream_is_transparent() {
        let ud = user_data(1);
        for id in ["trending", "1::trending", "a::b::c", "::", "0::"] {
            assert_eq!(decode(id, &ud).unwrap(), CompositeId::new(0, id));
        }
    }

    #[test]
    fn test_single_upstream_encode_has_no_prefix() {
        let ud = user_data(1);
        assert_eq!(encode(&CompositeId::new(0, "top"), &ud), "top");
    }

    #[test]
    fn test_only_first_separator_splits() {
        let ud = user_data(2);
        assert_eq!(decode("1::a::b", &ud).unwrap(), CompositeId::new(1, "a::b"));
    }

    #[test]
    fn test_index_at_count_is_out_of_range() {
        let ud = user_data(2);
        assert_eq!(
            decode("2::x", &ud),
            Err(IdError::UpstreamIndexOutOfRange { index: 2, count: 2 })
        );
    }

    #[test]
    fn test_malformed_ids_rejected() {
        let ud = user_data(2);
        for id in ["abc::x", "novalue", "::x", "-1::x", "+1::x", "01::x", " 1::x", "1:x"] {
            assert!(
                matches!(decode(id, &ud), Err(IdError::Malformed { .. })),
                "expected {id:?} to be malformed"
            );
        }
    }

    #[test]
    fn test_overflowing_index_is_malformed() {
        let ud = user_data(3);
        let id = "99999999999999999999999999::x";
        assert!(matches!(decode(id, &ud), Err(IdError::Malformed { .. })));
    }

    #[test]
    fn test_empty_native_id_is_passed_through() {
        let ud = user_data(2);
        assert_eq!(decode("0::", &ud).unwrap(), CompositeId::new(0, ""));
    }

    #[test]
    fn test_round_trip_from_composite() {
        for count in 1..=3 {
            let ud = user_data(count);
            for index in 0..count {
                for native in ["trending", "a::b", "", "tt0111161:1:2", "0::x"] {
                    let id = CompositeId::new(index, native);
                    assert_eq!(decode(&encode(&id, &ud), &ud).unwrap(), id);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_from_wire() {
        let ud = user_data(11);
        for wire in ["0::x", "10::a::b", "3::", "7::tt1:2:3"] {
            let id = decode(wire, &ud).unwrap();
            assert_eq!(encode(&id, &ud), wire);
        }
    }
}
