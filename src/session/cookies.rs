//! Cookie blob codec.
//!
//! The session file stores cookies as base64-encoded JSON so the file stays
//! a flat key/value document.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::{Result, S1Error};

/// Cookie name to value mapping.
pub type CookieMap = BTreeMap<String, String>;

/// Encode a cookie map into an opaque blob.
pub fn encode_cookies(cookies: &CookieMap) -> Result<String> {
    let json = serde_json::to_string(cookies)?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Decode a blob produced by [`encode_cookies`].
///
/// An empty blob decodes to an empty map.
pub fn decode_cookies(blob: &str) -> Result<CookieMap> {
    let blob = blob.trim();
    if blob.is_empty() {
        return Ok(CookieMap::new());
    }
    let bytes = STANDARD
        .decode(blob)
        .map_err(|e| S1Error::Serialization(format!("invalid cookie blob: {e}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Parse a `Cookie` request header value (`a=1; b=2`) into a map.
pub fn parse_cookie_header(header: &str) -> CookieMap {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> CookieMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_round_trip() {
        let cookies = map(&[
            ("B7Y9_2132_auth", "abc%2Fdef+ghi"),
            ("B7Y9_2132_saltkey", "x1Y2z3"),
            ("empty", ""),
            ("sym", "a=b;c"),
        ]);
        let blob = encode_cookies(&cookies).unwrap();
        assert_eq!(decode_cookies(&blob).unwrap(), cookies);
    }

    #[test]
    fn test_empty_round_trip() {
        let blob = encode_cookies(&CookieMap::new()).unwrap();
        assert!(decode_cookies(&blob).unwrap().is_empty());
        assert!(decode_cookies("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_cookies("not base64 !!"),
            Err(S1Error::Serialization(_))
        ));
        // valid base64, invalid JSON
        let blob = STANDARD.encode(b"[1,2");
        assert!(decode_cookies(&blob).is_err());
    }

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("a=1; b=two; c=x=y; =skip; d");
        assert_eq!(cookies, map(&[("a", "1"), ("b", "two"), ("c", "x=y")]));
    }
}
