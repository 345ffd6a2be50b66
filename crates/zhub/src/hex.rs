use alloc::string::String;
use alloc::vec::Vec;

// Prefix marking a hexadecimal network value.
const HEX_PREFIX: [&str; 2] = ["0x", "0X"];

/// Removes a leading `0x` or `0X` marker, if any.
#[must_use]
pub fn strip_prefix(text: &str) -> &str {
    HEX_PREFIX
        .iter()
        .find_map(|prefix| text.strip_prefix(prefix))
        .unwrap_or(text)
}

/// Checks whether the text is made **only** of hexadecimal digits.
///
/// An empty text is not considered hexadecimal.
#[must_use]
pub fn is_hex(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_hexdigit())
}

/// Parses a 16-bit code written as `0xXXXX` or `XXXX`.
#[must_use]
pub fn parse_u16(text: &str) -> Option<u16> {
    let digits = strip_prefix(text.trim());
    if !is_hex(digits) {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

/// Parses an 8-bit code written as `0xXX` or `XX`.
#[must_use]
pub fn parse_u8(text: &str) -> Option<u8> {
    let digits = strip_prefix(text.trim());
    if !is_hex(digits) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Reverses the byte order of a hex string.
///
/// The string is decoded into bytes, one per pair of digits, and the bytes
/// are encoded again in reverse order, so `"3412"` becomes `"1234"`.
/// The result is always written with upper-case digits.
///
/// Returns [`None`] if the text is empty, not hexadecimal or has an odd
/// length.
#[must_use]
pub fn reverse_bytes(text: &str) -> Option<String> {
    let mut bytes = to_bytes(text).filter(|bytes| !bytes.is_empty())?;
    bytes.reverse();
    Some(::hex::encode_upper(bytes))
}

/// Converts a hex string into its bytes, in the same order.
///
/// An empty text produces no bytes.
///
/// Returns [`None`] if the text is not hexadecimal or has an odd length.
#[must_use]
pub fn to_bytes(text: &str) -> Option<Vec<u8>> {
    ::hex::decode(text).ok()
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::{is_hex, parse_u8, parse_u16, reverse_bytes, strip_prefix, to_bytes};

    #[test]
    fn prefix() {
        assert_eq!(strip_prefix("0x000D6F"), "000D6F");
        assert_eq!(strip_prefix("0X000D6F"), "000D6F");
        assert_eq!(strip_prefix("000D6F"), "000D6F");
        assert_eq!(strip_prefix(""), "");
    }

    #[test]
    fn hex_digits() {
        assert!(is_hex("00ffAB"));
        assert!(!is_hex(""));
        assert!(!is_hex("0x12"));
        assert!(!is_hex("12 4"));
        assert!(!is_hex("ñ1"));
    }

    #[test]
    fn parse_codes() {
        assert_eq!(parse_u16("0x0402"), Some(0x0402));
        assert_eq!(parse_u16("0006"), Some(0x0006));
        assert_eq!(parse_u16("0x"), None);
        assert_eq!(parse_u16("0x10000"), None);
        assert_eq!(parse_u8("0x0A"), Some(0x0A));
        assert_eq!(parse_u8("0x0100"), None);
        assert_eq!(parse_u8("zz"), None);
    }

    #[test]
    fn reverse() {
        assert_eq!(reverse_bytes("3412").as_deref(), Some("1234"));
        assert_eq!(reverse_bytes("01").as_deref(), Some("01"));
        assert_eq!(reverse_bytes("AABBCCDD").as_deref(), Some("DDCCBBAA"));
        assert_eq!(reverse_bytes("123"), None);
        assert_eq!(reverse_bytes(""), None);
        assert_eq!(reverse_bytes("12G4"), None);
    }

    #[test]
    fn reverse_twice_restores() {
        for text in ["00", "0102", "DEADBEEF", "53414D53554E470000"] {
            let reversed = reverse_bytes(text).unwrap();
            assert_eq!(reverse_bytes(&reversed).as_deref(), Some(text));
        }

        // Lower-case digits come back upper-case.
        let reversed = reverse_bytes("a1b2c3").unwrap();
        assert_eq!(reversed, "C3B2A1");
        assert_eq!(reverse_bytes(&reversed).as_deref(), Some("A1B2C3"));
    }

    #[test]
    fn bytes() {
        assert_eq!(to_bytes("00ff7A"), Some(vec![0x00, 0xFF, 0x7A]));
        assert_eq!(to_bytes(""), Some(vec![]));
        assert_eq!(to_bytes("0"), None);
        assert_eq!(to_bytes("xy"), None);
        assert_eq!(to_bytes("0x12"), None);
    }
}
