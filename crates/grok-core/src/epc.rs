//! # EPC Decoding
//!
//! Turns the hex EPC reported by the reader into the text inserted into the
//! editor.
//!
//! ```text
//! "414243"   ascii ──► "ABC"
//! "41420000" ascii ──► "AB"       (stops at the first null byte)
//! "41FF43"   ascii ──► "41FF43"   (byte >= 0x80, hex fallback)
//! "00"       ascii ──► ""         (leading null byte)
//! "4142"     hex   ──► "4142"
//! ```
//!
//! A null byte always ends decoding with whatever was accumulated, even if
//! that is nothing. Running off the end with nothing accumulated yields the
//! uppercased hex.

/// Decoder for EPC tag identifiers.
pub struct EpcCodec;

/// Outcome of walking the byte pairs.
enum Walk {
    /// Decoding ended, either at a null byte or at the end of input.
    Text(String, bool),
    /// A byte outside ASCII, or a pair that is not hex.
    Fallback,
}

impl EpcCodec {
    /// Decodes `hex` for display. Never fails.
    ///
    /// ## Example
    /// ```rust
    /// use grok_core::epc::EpcCodec;
    ///
    /// assert_eq!(EpcCodec::decode("414243", true), "ABC");
    /// assert_eq!(EpcCodec::decode("41ff43", true), "41FF43");
    /// assert_eq!(EpcCodec::decode("4142", false), "4142");
    /// ```
    pub fn decode(hex: &str, ascii_mode: bool) -> String {
        if hex.is_empty() {
            return String::new();
        }
        if !ascii_mode {
            return hex.to_ascii_uppercase();
        }

        match Self::walk(hex) {
            Walk::Text(text, terminated) => {
                if !text.is_empty() || terminated {
                    text
                } else {
                    hex.to_ascii_uppercase()
                }
            }
            Walk::Fallback => hex.to_ascii_uppercase(),
        }
    }

    fn walk(hex: &str) -> Walk {
        let bytes = hex.as_bytes();
        let mut text = String::with_capacity(bytes.len() / 2);

        // chunks_exact drops a trailing unpaired character
        for pair in bytes.chunks_exact(2) {
            let byte = match Self::parse_pair(pair) {
                Some(byte) => byte,
                None => return Walk::Fallback,
            };
            if byte == 0 {
                return Walk::Text(text, true);
            }
            if byte >= 0x80 {
                return Walk::Fallback;
            }
            text.push(char::from(byte));
        }

        Walk::Text(text, false)
    }

    fn parse_pair(pair: &[u8]) -> Option<u8> {
        let high = (pair[0] as char).to_digit(16)?;
        let low = (pair[1] as char).to_digit(16)?;
        Some((high * 16 + low) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii() {
        assert_eq!(EpcCodec::decode("414243", true), "ABC");
        assert_eq!(EpcCodec::decode("48656C6C6F", true), "Hello");
    }

    #[test]
    fn test_decode_stops_at_null() {
        assert_eq!(EpcCodec::decode("00", true), "");
        assert_eq!(EpcCodec::decode("4142000000000000", true), "AB");
        assert_eq!(EpcCodec::decode("410043", true), "A");
    }

    #[test]
    fn test_decode_high_byte_falls_back_to_hex() {
        assert_eq!(EpcCodec::decode("41FF43", true), "41FF43");
        assert_eq!(EpcCodec::decode("e2801160", true), "E2801160");
    }

    #[test]
    fn test_decode_hex_mode() {
        assert_eq!(EpcCodec::decode("4142", false), "4142");
        assert_eq!(EpcCodec::decode("abcdef", false), "ABCDEF");
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(EpcCodec::decode("", true), "");
        assert_eq!(EpcCodec::decode("", false), "");
    }

    #[test]
    fn test_decode_odd_length_ignores_trailing_char() {
        assert_eq!(EpcCodec::decode("41424", true), "AB");
        // lone nibble: nothing decoded, fall back to hex
        assert_eq!(EpcCodec::decode("4", true), "4");
    }

    #[test]
    fn test_decode_invalid_hex_falls_back() {
        assert_eq!(EpcCodec::decode("41ZZ43", true), "41ZZ43");
        assert_eq!(EpcCodec::decode("zz", true), "ZZ");
    }

    #[test]
    fn test_decode_control_chars_pass_through() {
        assert_eq!(EpcCodec::decode("410A42", true), "A\nB");
    }
}
