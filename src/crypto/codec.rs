//! Cleartext payload codec
//!
//! Oracle callbacks carry their cleartext as concatenated 32-byte big-endian
//! words, one per schema slot. Values in this system are all `uint32`, so the
//! leading 28 bytes of every word must be zero.

/// Width of one encoded cleartext word
pub const WORD_LEN: usize = 32;

/// Error decoding a cleartext payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("expected {expected} words ({} bytes), got {actual} bytes", .expected * WORD_LEN)]
    LengthMismatch { expected: usize, actual: usize },

    #[error("word {index} does not fit in uint32")]
    ValueOverflow { index: usize },
}

/// Encode values as 32-byte big-endian words.
pub fn encode_words(values: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * WORD_LEN);
    for value in values {
        let mut word = [0u8; WORD_LEN];
        word[WORD_LEN - 4..].copy_from_slice(&value.to_be_bytes());
        out.extend_from_slice(&word);
    }
    out
}

/// Decode exactly `expected` uint32 words.
pub fn decode_words(payload: &[u8], expected: usize) -> Result<Vec<u32>, PayloadError> {
    if payload.len() != expected * WORD_LEN || expected == 0 {
        return Err(PayloadError::LengthMismatch {
            expected,
            actual: payload.len(),
        });
    }

    payload
        .chunks_exact(WORD_LEN)
        .enumerate()
        .map(|(index, word)| {
            let (high, low) = word.split_at(WORD_LEN - 4);
            if high.iter().any(|b| *b != 0) {
                return Err(PayloadError::ValueOverflow { index });
            }
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(low);
            Ok(u32::from_be_bytes(bytes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_layout() {
        let encoded = encode_words(&[1, 0x01020304]);
        assert_eq!(encoded.len(), 64);
        assert_eq!(encoded[31], 1);
        assert_eq!(&encoded[60..64], &[1, 2, 3, 4]);
        assert!(encoded[32..60].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let encoded = encode_words(&[90, 85, 80]);
        assert_eq!(
            decode_words(&encoded, 4),
            Err(PayloadError::LengthMismatch {
                expected: 4,
                actual: 96
            })
        );
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut encoded = encode_words(&[1, 2]);
        encoded.push(0);
        assert!(matches!(
            decode_words(&encoded, 2),
            Err(PayloadError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_wide_word() {
        let mut encoded = encode_words(&[1, 2]);
        encoded[32] = 0x80;
        assert_eq!(
            decode_words(&encoded, 2),
            Err(PayloadError::ValueOverflow { index: 1 })
        );
    }

    #[test]
    fn test_decode_rejects_empty_schema() {
        assert!(decode_words(&[], 0).is_err());
    }
}
