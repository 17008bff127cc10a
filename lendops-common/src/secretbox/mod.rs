use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

#[derive(Debug)]
pub enum SecretBoxError {
    InvalidKey,
    InvalidCiphertext,
}

impl std::error::Error for SecretBoxError {}

impl fmt::Display for SecretBoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretBoxError::InvalidKey => write!(
                f,
                "SecretBoxError: Key must be {KEY_LEN} raw bytes or {} hex characters",
                KEY_LEN * 2,
            ),
            SecretBoxError::InvalidCiphertext => {
                write!(f, "SecretBoxError: Ciphertext is invalid")
            }
        }
    }
}

/// Authenticated encryption for MFA seeds at rest. Ciphertexts are laid out
/// as `nonce || body`, where the body carries the authentication tag.
#[derive(Clone)]
pub struct SecretBox {
    cipher: Aes256Gcm,
}

impl SecretBox {
    /// Accepts exactly 32 raw bytes, or 64 hex characters decoding to 32
    /// bytes. Anything else is rejected so the process can refuse to start.
    pub fn from_secret(secret: &[u8]) -> Result<Self, SecretBoxError> {
        let key_bytes: [u8; KEY_LEN] = if secret.len() == KEY_LEN {
            secret.try_into().map_err(|_| SecretBoxError::InvalidKey)?
        } else if secret.len() == KEY_LEN * 2 {
            let decoded = hex::decode(secret).map_err(|_| SecretBoxError::InvalidKey)?;
            decoded
                .as_slice()
                .try_into()
                .map_err(|_| SecretBoxError::InvalidKey)?
        } else {
            return Err(SecretBoxError::InvalidKey);
        };

        Ok(Self {
            cipher: Aes256Gcm::new((&key_bytes).into()),
        })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let nonce: [u8; NONCE_LEN] = OsRng.gen();

        let body = self
            .cipher
            .encrypt((&nonce).into(), plaintext)
            .expect("Failed to encrypt seed");

        let mut out = Vec::with_capacity(NONCE_LEN + body.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&body);
        out
    }

    /// Rejects truncated, tampered, or wrong-key inputs without revealing
    /// which condition failed.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, SecretBoxError> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(SecretBoxError::InvalidCiphertext);
        }

        let nonce: [u8; NONCE_LEN] = ciphertext[..NONCE_LEN]
            .try_into()
            .map_err(|_| SecretBoxError::InvalidCiphertext)?;

        self.cipher
            .decrypt((&nonce).into(), &ciphertext[NONCE_LEN..])
            .map_err(|_| SecretBoxError::InvalidCiphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW_KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn test_box() -> SecretBox {
        SecretBox::from_secret(RAW_KEY).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let sb = test_box();
        let seed = b"JBSWY3DPEHPK3PXP";

        let ciphertext = sb.encrypt(seed);
        assert_eq!(sb.decrypt(&ciphertext).unwrap(), seed);
    }

    #[test]
    fn test_tampered_final_byte_rejected() {
        let sb = test_box();

        let mut ciphertext = sb.encrypt(b"JBSWY3DPEHPK3PXP");
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        assert!(matches!(
            sb.decrypt(&ciphertext),
            Err(SecretBoxError::InvalidCiphertext)
        ));
    }

    #[test]
    fn test_every_byte_tamper_rejected() {
        let sb = test_box();
        let ciphertext = sb.encrypt(b"seed-material");

        for i in 0..ciphertext.len() {
            let mut tampered = ciphertext.clone();
            tampered[i] ^= 0x80;
            assert!(sb.decrypt(&tampered).is_err(), "byte {i} tamper accepted");
        }
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let sb = test_box();
        let ciphertext = sb.encrypt(b"JBSWY3DPEHPK3PXP");

        assert!(sb.decrypt(&ciphertext[..NONCE_LEN + TAG_LEN - 1]).is_err());
        assert!(sb.decrypt(&[]).is_err());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let sb = test_box();
        let other = SecretBox::from_secret(b"ffffffffffffffffffffffffffffffff").unwrap();

        let ciphertext = sb.encrypt(b"JBSWY3DPEHPK3PXP");
        assert!(other.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn test_hex_key_equals_raw_key() {
        let hex_key = hex::encode(RAW_KEY);
        let from_hex = SecretBox::from_secret(hex_key.as_bytes()).unwrap();

        let ciphertext = test_box().encrypt(b"shared");
        assert_eq!(from_hex.decrypt(&ciphertext).unwrap(), b"shared");
    }

    #[test]
    fn test_bad_key_lengths_rejected() {
        assert!(SecretBox::from_secret(b"").is_err());
        assert!(SecretBox::from_secret(b"short").is_err());
        assert!(SecretBox::from_secret(&[0u8; 31]).is_err());
        assert!(SecretBox::from_secret(&[0u8; 33]).is_err());
        // 64 bytes that are not hex
        assert!(SecretBox::from_secret(&[b'z'; 64]).is_err());
    }
}
