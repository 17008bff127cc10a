use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Eq, PartialEq)]
pub enum TokenError {
    TokenInvalid,
    TokenExpired,
    TokenMissing,
}

impl std::error::Error for TokenError {}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::TokenInvalid => write!(f, "TokenError: Token is invalid"),
            TokenError::TokenExpired => write!(f, "TokenError: Token is expired"),
            TokenError::TokenMissing => write!(f, "TokenError: Token is missing"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub uid: i64,
    pub exp: u64,
}

/// Bearer token for an operator session. The wire form is
/// `base64url(claims_json + "|" + hex_signature)` where the signature is
/// HMAC-SHA256 over the claims JSON.
pub struct SessionToken {}

impl SessionToken {
    pub fn sign_and_encode(
        user_id: i64,
        lifetime: Duration,
        signing_key: &[u8; 64],
    ) -> String {
        let expiration = SystemTime::now() + lifetime;
        let claims = SessionClaims {
            uid: user_id,
            exp: expiration
                .duration_since(UNIX_EPOCH)
                .expect("Session expiration should be after the epoch")
                .as_secs(),
        };

        let mut json_of_claims =
            serde_json::to_vec(&claims).expect("Session claims should be serializable");

        let mut mac: Hmac<Sha256> = Hmac::new(signing_key.into());
        mac.update(&json_of_claims);
        let hash = hex::encode(mac.finalize().into_bytes());

        json_of_claims.push(b'|');
        json_of_claims.extend_from_slice(hash.as_bytes());

        URL_SAFE_NO_PAD.encode(json_of_claims)
    }

    pub fn verify(token: &str, signing_key: &[u8; 64]) -> Result<SessionClaims, TokenError> {
        let decoded = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::TokenInvalid)?;

        let split_pos = decoded
            .iter()
            .rposition(|&b| b == b'|')
            .ok_or(TokenError::TokenInvalid)?;

        let (claims_json, signature) = decoded.split_at(split_pos);
        let signature = &signature[1..];
        let signature = hex::decode(signature).map_err(|_| TokenError::TokenInvalid)?;

        let mut mac: Hmac<Sha256> = Hmac::new(signing_key.into());
        mac.update(claims_json);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::TokenInvalid)?;

        let claims = serde_json::from_slice::<SessionClaims>(claims_json)
            .map_err(|_| TokenError::TokenInvalid)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Current time should be after the epoch")
            .as_secs();

        if claims.exp <= now {
            return Err(TokenError::TokenExpired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 64] = [7; 64];

    #[test]
    fn test_sign_and_verify() {
        let token = SessionToken::sign_and_encode(42, Duration::from_secs(3600), &KEY);
        let claims = SessionToken::verify(&token, &KEY).unwrap();

        assert_eq!(claims.uid, 42);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = SessionToken::sign_and_encode(42, Duration::from_secs(3600), &KEY);
        let other_key = [8u8; 64];

        assert_eq!(
            SessionToken::verify(&token, &other_key),
            Err(TokenError::TokenInvalid),
        );
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let token = SessionToken::sign_and_encode(42, Duration::from_secs(3600), &KEY);
        let mut decoded = URL_SAFE_NO_PAD.decode(&token).unwrap();

        // Change the uid digit in the claims JSON
        let pos = decoded.iter().position(|&b| b == b'4').unwrap();
        decoded[pos] = b'5';
        let tampered = URL_SAFE_NO_PAD.encode(decoded);

        assert_eq!(
            SessionToken::verify(&tampered, &KEY),
            Err(TokenError::TokenInvalid),
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = SessionToken::sign_and_encode(42, Duration::from_secs(0), &KEY);

        assert_eq!(
            SessionToken::verify(&token, &KEY),
            Err(TokenError::TokenExpired),
        );
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(
            SessionToken::verify("not-a-token", &KEY),
            Err(TokenError::TokenInvalid),
        );
        assert_eq!(
            SessionToken::verify("", &KEY),
            Err(TokenError::TokenInvalid),
        );
    }
}
