use sha2::{Digest, Sha256};

use crate::threadrand::SecureRng;

pub const RECOVERY_CODE_COUNT: usize = 8;
pub const RECOVERY_CODE_LEN: usize = 10;
const SALT_LEN: usize = 16;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates a fresh batch of human-typeable recovery codes. The ambiguous
/// characters 0, O, 1, and I are left out of the alphabet.
pub fn generate_codes() -> Vec<String> {
    (0..RECOVERY_CODE_COUNT)
        .map(|_| {
            (0..RECOVERY_CODE_LEN)
                .map(|_| {
                    let idx = (SecureRng::next_u32() as usize) % CODE_ALPHABET.len();
                    CODE_ALPHABET[idx] as char
                })
                .collect()
        })
        .collect()
}

/// Stored form is `hex(salt) + "$" + hex(sha256(salt || code))`.
pub fn hash_code(code: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    SecureRng::fill(&mut salt);

    hash_code_with_salt(code, &salt)
}

fn hash_code_with_salt(code: &str, salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(code.as_bytes());

    format!("{}${}", hex::encode(salt), hex::encode(hasher.finalize()))
}

pub fn code_matches(code: &str, stored: &str) -> bool {
    let Some((salt_hex, _)) = stored.split_once('$') else {
        return false;
    };

    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };

    are_equal(hash_code_with_salt(code, &salt).as_bytes(), stored.as_bytes())
}

fn are_equal(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let mut acc = 0u8;
    for (l, r) in left.iter().zip(right.iter()) {
        acc |= l ^ r;
    }

    acc == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_match() {
        let stored = hash_code("ABCD234567");

        assert!(code_matches("ABCD234567", &stored));
        assert!(!code_matches("ABCD234568", &stored));
        assert!(!code_matches("", &stored));
    }

    #[test]
    fn test_same_code_hashes_differently() {
        assert_ne!(hash_code("ABCD234567"), hash_code("ABCD234567"));
    }

    #[test]
    fn test_generated_codes_are_well_formed() {
        let codes = generate_codes();

        assert_eq!(codes.len(), RECOVERY_CODE_COUNT);
        for code in &codes {
            assert_eq!(code.len(), RECOVERY_CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_match_rejects_mangled_stored_form() {
        assert!(!code_matches("ABCD234567", "no-dollar-sign"));
        assert!(!code_matches("ABCD234567", "zz$deadbeef"));
    }
}
