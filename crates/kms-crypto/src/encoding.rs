//! Base64url (no padding) helpers for JOSE segments and JWK members.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Encode bytes as unpadded base64url.
pub fn b64_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url. Padded or standard-alphabet input is rejected.
pub fn b64_decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(b64_encode(b"\xfb\xff"), "-_8");
        assert_eq!(b64_decode("-_8").unwrap(), b"\xfb\xff");
    }

    #[test]
    fn test_rejects_padding_and_standard_alphabet() {
        assert!(b64_decode("-_8=").is_err());
        assert!(b64_decode("+/8").is_err());
    }

    #[test]
    fn test_empty() {
        assert_eq!(b64_encode(b""), "");
        assert!(b64_decode("").unwrap().is_empty());
    }
}
