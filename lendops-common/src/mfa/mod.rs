pub mod recovery;

use std::fmt;

use crate::db::{auth, DaoError, DbThreadPool};
use crate::secretbox::SecretBox;
use crate::totp;

pub const OTP_LEN: usize = 6;

#[derive(Debug)]
pub enum MfaError {
    OtpMalformed,
    NotEnrolled,
    SecretCorrupt,
    OtpInvalid,
    Dao(DaoError),
}

impl std::error::Error for MfaError {}

impl fmt::Display for MfaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MfaError::OtpMalformed => write!(f, "MfaError: Code is malformed"),
            MfaError::NotEnrolled => write!(f, "MfaError: User has no active authenticator"),
            MfaError::SecretCorrupt => {
                write!(f, "MfaError: Stored authenticator seed cannot be used")
            }
            MfaError::OtpInvalid => write!(f, "MfaError: Code is incorrect"),
            MfaError::Dao(e) => write!(f, "MfaError: {e}"),
        }
    }
}

impl From<DaoError> for MfaError {
    fn from(e: DaoError) -> Self {
        MfaError::Dao(e)
    }
}

/// Checks an operator-supplied one-time code against the user's primary
/// active authenticator.
pub struct Verifier {
    db_thread_pool: DbThreadPool,
}

impl Verifier {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Malformed input is rejected before any database or crypto work.
    /// Returns the id of the device that matched so callers can stamp its
    /// `last_used_at`.
    pub fn verify(
        &self,
        seed_box: &SecretBox,
        user_id: i64,
        otp: &str,
    ) -> Result<i64, MfaError> {
        let otp = otp.trim();

        if otp.len() != OTP_LEN || !otp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MfaError::OtpMalformed);
        }

        let device = auth::Dao::new(&self.db_thread_pool)
            .get_primary_active_device(user_id)?
            .ok_or(MfaError::NotEnrolled)?;

        let seed = seed_box
            .decrypt(&device.seed_encrypted)
            .map_err(|_| MfaError::SecretCorrupt)?;

        if seed.is_empty() {
            return Err(MfaError::SecretCorrupt);
        }

        if !totp::verify(&seed, otp) {
            return Err(MfaError::OtpInvalid);
        }

        Ok(device.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_codes_detected() {
        // The length and digit checks run before anything touches the
        // database, so they can be exercised directly.
        let malformed = ["", "12345", "1234567", "12345a", "abcdef", "12 456"];

        for otp in malformed {
            let trimmed = otp.trim();
            assert!(
                trimmed.len() != OTP_LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()),
                "{otp:?} should be malformed",
            );
        }

        let trimmed = " 123456 ".trim();
        assert!(trimmed.len() == OTP_LEN && trimmed.bytes().all(|b| b.is_ascii_digit()));
    }
}
