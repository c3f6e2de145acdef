//! Validated GPG key identifiers.
//!
//! Input such as `"0x1234 5678"` or `"9761:F81B:..."` is normalized to bare
//! upper-case hex of one of the four lengths key servers understand.

use serde::Serialize;
use std::fmt;

/// Hex length of a key identifier, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum KeyLength {
    /// 32-bit short key ID (8 hex chars).
    Short,
    /// 64-bit long key ID (16 hex chars).
    Long,
    /// Version 3 fingerprint (32 hex chars).
    FingerprintV3,
    /// Version 4 fingerprint (40 hex chars).
    FingerprintV4,
}

impl KeyLength {
    pub fn hex_len(self) -> usize {
        match self {
            KeyLength::Short => 8,
            KeyLength::Long => 16,
            KeyLength::FingerprintV3 => 32,
            KeyLength::FingerprintV4 => 40,
        }
    }

    pub fn bits(self) -> usize {
        self.hex_len() * 4
    }

    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            8 => Some(KeyLength::Short),
            16 => Some(KeyLength::Long),
            32 => Some(KeyLength::FingerprintV3),
            40 => Some(KeyLength::FingerprintV4),
            _ => None,
        }
    }
}

/// Why a key identifier was rejected as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidKeyReason {
    NotHexadecimal,
    UnsupportedLength(usize),
}

impl fmt::Display for InvalidKeyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidKeyReason::NotHexadecimal => write!(f, "key is not hexadecimal"),
            InvalidKeyReason::UnsupportedLength(len) => {
                write!(f, "key length {} is not a supported length", len)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("given key is not valid: {reason}")]
    Invalid { key: String, reason: InvalidKeyReason },
    /// Short and long key IDs can be forged by brute force and must be opted into.
    #[error("{}-bit keys are not supported{}", .length.bits(), insecure_hint(.length))]
    Insecure { key: String, length: KeyLength },
}

fn insecure_hint(length: &KeyLength) -> &'static str {
    if *length == KeyLength::Short {
        ". See also https://evil32.com/"
    } else {
        ""
    }
}

/// A normalized key identifier: upper-case hex, 8, 16, 32 or 40 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KeyId(String);

impl KeyId {
    /// Accept a key from the caller. Requires at least a v3 fingerprint.
    pub fn new(raw: &str) -> Result<Self, KeyError> {
        Self::with_min_length(raw, KeyLength::FingerprintV3)
    }

    /// Normalize `raw` and reject it if weaker than `min_length`.
    pub fn with_min_length(raw: &str, min_length: KeyLength) -> Result<Self, KeyError> {
        let mut key: String = raw
            .chars()
            .filter(|c| !is_separator(*c))
            .collect::<String>()
            .to_uppercase();
        if let Some(rest) = key.strip_prefix("0X") {
            key = rest.to_string();
        }
        if !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KeyError::Invalid {
                key,
                reason: InvalidKeyReason::NotHexadecimal,
            });
        }
        if key.len() % 2 == 1 && key.starts_with('0') {
            // Key IDs are whole bytes; an odd leading zero is padding.
            key.remove(0);
        }
        let length = match KeyLength::from_hex_len(key.len()) {
            Some(length) => length,
            None => {
                let len = key.len();
                return Err(KeyError::Invalid {
                    key,
                    reason: InvalidKeyReason::UnsupportedLength(len),
                });
            }
        };
        if length < min_length {
            return Err(KeyError::Insecure { key, length });
        }
        Ok(KeyId(key))
    }

    /// Re-validate for a key-server query, which accepts down to short IDs.
    pub fn clean(&self) -> Result<Self, KeyError> {
        Self::with_min_length(&self.0, KeyLength::Short)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn length(&self) -> KeyLength {
        // Construction guarantees one of the four lengths.
        KeyLength::from_hex_len(self.0.len()).unwrap_or(KeyLength::Short)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whitespace and punctuation are dropped. Symbols such as `+` or `$` are
/// kept so that they fail the hex check.
fn is_separator(c: char) -> bool {
    if c.is_whitespace() {
        return true;
    }
    if c.is_ascii() {
        return is_ascii_separator(c);
    }
    is_unicode_punctuation(c)
}

fn is_ascii_separator(c: char) -> bool {
    c.is_ascii_punctuation() && !"$+<=>^`|~".contains(c)
}

/// Non-ASCII punctuation: Latin-1 marks, dashes and quotes, supplemental
/// and CJK punctuation, and fullwidth forms of the ASCII separators.
/// Math and currency symbols inside these blocks are not punctuation.
fn is_unicode_punctuation(c: char) -> bool {
    match c {
        '\u{FF01}'..='\u{FF5E}' => {
            char::from_u32(c as u32 - 0xFEE0).is_some_and(is_ascii_separator)
        }
        '\u{00A1}' | '\u{00A7}' | '\u{00AB}' | '\u{00B6}' | '\u{00B7}' | '\u{00BB}'
        | '\u{00BF}' => true,
        '\u{2010}'..='\u{2027}'
        | '\u{2030}'..='\u{2043}'
        | '\u{2045}'..='\u{2051}'
        | '\u{2053}'..='\u{205E}' => true,
        '\u{2E00}'..='\u{2E2E}'
        | '\u{2E30}'..='\u{2E4F}'
        | '\u{3001}'..='\u{3003}'
        | '\u{3008}'..='\u{3011}'
        | '\u{3014}'..='\u{301F}' => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V4: &str = "9761F81B887051F4E85D9A1DA151848BADB89F74";

    #[test]
    fn spaced_prefixed_short_id() {
        let key = KeyId::with_min_length("0x1234 5678", KeyLength::Short).unwrap();
        assert_eq!(key.as_str(), "12345678");
        assert_eq!(key.length(), KeyLength::Short);
    }

    #[test]
    fn short_id_is_insecure_by_default() {
        let err = KeyId::new("0x1234 5678").unwrap_err();
        assert_eq!(
            err,
            KeyError::Insecure {
                key: "12345678".to_string(),
                length: KeyLength::Short,
            }
        );
        let msg = err.to_string();
        assert!(msg.starts_with("32-bit keys are not supported"));
        assert!(msg.contains("evil32.com"));
    }

    #[test]
    fn long_id_is_insecure_without_evil32_hint() {
        let err = KeyId::new("A151848BADB89F74").unwrap_err();
        assert!(matches!(err, KeyError::Insecure { length: KeyLength::Long, .. }));
        assert_eq!(err.to_string(), "64-bit keys are not supported");
        assert!(KeyId::with_min_length("A151848BADB89F74", KeyLength::Long).is_ok());
    }

    #[test]
    fn not_hex_regardless_of_length() {
        let err = KeyId::new("not-hex!!").unwrap_err();
        assert!(matches!(
            err,
            KeyError::Invalid {
                reason: InvalidKeyReason::NotHexadecimal,
                ..
            }
        ));
        assert!(matches!(
            KeyId::with_min_length(&"Z".repeat(40), KeyLength::Short),
            Err(KeyError::Invalid {
                reason: InvalidKeyReason::NotHexadecimal,
                ..
            })
        ));
    }

    #[test]
    fn symbols_are_not_stripped() {
        assert!(matches!(
            KeyId::with_min_length("1234+5678", KeyLength::Short),
            Err(KeyError::Invalid {
                reason: InvalidKeyReason::NotHexadecimal,
                ..
            })
        ));
    }

    #[test]
    fn unsupported_length() {
        let err = KeyId::with_min_length("123456", KeyLength::Short).unwrap_err();
        assert_eq!(
            err,
            KeyError::Invalid {
                key: "123456".to_string(),
                reason: InvalidKeyReason::UnsupportedLength(6),
            }
        );
        assert!(KeyId::new("").is_err());
    }

    #[test]
    fn fingerprint_with_colons_and_lowercase() {
        let raw = "9761:f81b:8870:51f4:e85d  9a1d:a151:848b:adb8:9f74";
        let key = KeyId::new(raw).unwrap();
        assert_eq!(key.as_str(), V4);
        assert_eq!(key.length(), KeyLength::FingerprintV4);
    }

    #[test]
    fn unicode_punctuation_is_dropped() {
        let key = KeyId::with_min_length("1234\u{2013}5678", KeyLength::Short).unwrap();
        assert_eq!(key.as_str(), "12345678");
        let raw = "\u{00AB}DEAD\u{FF1A}BEEF\u{00BB}";
        let key = KeyId::with_min_length(raw, KeyLength::Short).unwrap();
        assert_eq!(key.as_str(), "DEADBEEF");
        let raw = "\u{300C}1234\u{3001}5678\u{300D}";
        let key = KeyId::with_min_length(raw, KeyLength::Short).unwrap();
        assert_eq!(key.as_str(), "12345678");
    }

    #[test]
    fn unicode_symbols_fail_hex_check() {
        for raw in ["1234\u{20AC}5678", "1234\u{2044}5678", "1234\u{FF0B}5678"] {
            assert!(matches!(
                KeyId::with_min_length(raw, KeyLength::Short),
                Err(KeyError::Invalid {
                    reason: InvalidKeyReason::NotHexadecimal,
                    ..
                })
            ));
        }
    }

    #[test]
    fn odd_leading_zero_is_dropped() {
        let key = KeyId::with_min_length("012345678", KeyLength::Short).unwrap();
        assert_eq!(key.as_str(), "12345678");
        let err = KeyId::with_min_length("123456789", KeyLength::Short).unwrap_err();
        assert!(matches!(
            err,
            KeyError::Invalid {
                reason: InvalidKeyReason::UnsupportedLength(9),
                ..
            }
        ));
    }

    #[test]
    fn v3_fingerprint_is_minimum_default() {
        let v3 = "0123456789ABCDEF0123456789ABCDEF";
        assert_eq!(KeyId::new(v3).unwrap().length(), KeyLength::FingerprintV3);
    }

    #[test]
    fn clean_accepts_short_ids() {
        let key = KeyId::with_min_length("deadbeef", KeyLength::Short).unwrap();
        assert_eq!(key.clean().unwrap(), key);
        let fp = KeyId::new(V4).unwrap();
        assert_eq!(fp.clean().unwrap().as_str(), V4);
    }

    #[test]
    fn key_lengths_are_ordered() {
        assert!(KeyLength::Short < KeyLength::Long);
        assert!(KeyLength::Long < KeyLength::FingerprintV3);
        assert!(KeyLength::FingerprintV3 < KeyLength::FingerprintV4);
    }
}
