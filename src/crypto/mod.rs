use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

// ============================================================================
// Field-Level Encryption
// ============================================================================
//
// Sensitive scalar fields (tax id, document number) are sealed with
// AES-256-GCM before they reach the database. Each call uses a fresh random
// 96-bit nonce, so encrypting the same value twice never produces the same
// ciphertext. The stored form is base64(nonce || ciphertext || tag).
//
// ============================================================================

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key must be exactly {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("ciphertext is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("ciphertext shorter than one nonce")]
    TooShort,

    #[error("ciphertext failed authentication")]
    Authentication,

    #[error("decrypted payload is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("failed to seal plaintext")]
    Seal,
}

/// AES-256-GCM cipher for sensitive customer fields.
///
/// Safe to share across request workers; the key is fixed at construction
/// and no mutable state is held.
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Build a cipher from a 256-bit key. Any other key length is rejected.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength(key.len()));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        Ok(Self { cipher })
    }

    /// Encrypt a field value. An empty string passes through unchanged so
    /// that absence of a value is never persisted as a fixed ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Seal)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&sealed);

        Ok(BASE64.encode(payload))
    }

    /// Decrypt a stored field value. Inverts [`FieldCipher::encrypt`],
    /// including the empty-string pass-through.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        if encoded.is_empty() {
            return Ok(String::new());
        }

        let payload = BASE64.decode(encoded)?;
        if payload.len() < NONCE_LEN {
            return Err(CryptoError::TooShort);
        }

        let (nonce, sealed) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Authentication)?;

        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> FieldCipher {
        FieldCipher::new(b"0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn test_round_trip() {
        let cipher = test_cipher();
        for plaintext in ["123-45-6789", "P1234567", "a", "üñíçødé"] {
            let sealed = cipher.encrypt(plaintext).unwrap();
            assert_ne!(sealed, plaintext);
            assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_empty_string_passes_through() {
        let cipher = test_cipher();
        assert_eq!(cipher.encrypt("").unwrap(), "");
        assert_eq!(cipher.decrypt("").unwrap(), "");
    }

    #[test]
    fn test_nonce_freshness() {
        let cipher = test_cipher();
        let first = cipher.encrypt("123-45-6789").unwrap();
        let second = cipher.encrypt("123-45-6789").unwrap();
        assert_ne!(first, second);
        assert_eq!(cipher.decrypt(&first).unwrap(), "123-45-6789");
        assert_eq!(cipher.decrypt(&second).unwrap(), "123-45-6789");
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let cipher = test_cipher();
        let other = FieldCipher::new(b"ffffffffffffffffffffffffffffffff").unwrap();
        let sealed = cipher.encrypt("123-45-6789").unwrap();
        assert!(matches!(
            other.decrypt(&sealed),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt("123-45-6789").unwrap();
        let mut payload = BASE64.decode(&sealed).unwrap();
        let last = payload.len() - 1;
        payload[last] ^= 0x01;
        let tampered = BASE64.encode(payload);
        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        assert!(matches!(
            FieldCipher::new(b"short"),
            Err(CryptoError::InvalidKeyLength(5))
        ));
        assert!(matches!(
            FieldCipher::new(&[0u8; 33]),
            Err(CryptoError::InvalidKeyLength(33))
        ));
    }

    #[test]
    fn test_malformed_encoding_rejected() {
        let cipher = test_cipher();
        assert!(matches!(
            cipher.decrypt("not base64!!!"),
            Err(CryptoError::Decode(_))
        ));
        let short = BASE64.encode([0u8; 4]);
        assert!(matches!(cipher.decrypt(&short), Err(CryptoError::TooShort)));
    }
}
