//! Transport encoding for binary payloads.
//!
//! Bytes cross the text channel as standard padded base64, never as "maybe a
//! string" guesses. Identifiers use unpadded base64url like the rest of the
//! Arweave ecosystem.

use crate::domain::error::{RelayError, RelayResult};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

/// Encode arbitrary bytes for the push channel.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode bytes received from the browser.
pub fn decode(text: &str) -> RelayResult<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| RelayError::Encoding(e.to_string()))
}

/// Encode bytes as unpadded base64url.
pub fn encode_url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, RngCore, SeedableRng};

    #[test]
    fn test_random_buffers_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut buffers: Vec<Vec<u8>> = vec![vec![0u8; 10_000], vec![0xFF; 10_000], Vec::new()];
        for _ in 0..997 {
            let len = rng.gen_range(0..=10_000);
            let mut buf = vec![0u8; len];
            rng.fill_bytes(&mut buf);
            buffers.push(buf);
        }

        for buf in &buffers {
            assert_eq!(&decode(&encode(buf)).unwrap(), buf);
        }
    }

    #[test]
    fn test_invalid_utf8_bytes_survive() {
        // lone continuation bytes and an overlong NUL
        let bytes = [0x80, 0xBF, 0xC0, 0x80, 0xFE, 0xFF, 0x00];
        let encoded = encode(&bytes);
        assert_eq!(encoded, "gL/AgP7/AA==");
        assert_eq!(decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(encode(&[1, 2, 3]), "AQID");
        assert_eq!(decode("AQID").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(decode("not base64!"), Err(RelayError::Encoding(_))));
    }

    #[test]
    fn test_url_alphabet_has_no_padding() {
        let encoded = encode_url(&[0xfb, 0xff]);
        assert_eq!(encoded, "-_8");
    }
}
