use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub const PERIOD_SECS: u64 = 30;
pub const DIGITS: u32 = 6;
pub const SKEW_STEPS: i64 = 1;

#[derive(Debug, Eq, PartialEq)]
pub enum TotpError {
    InvalidSeed,
}

impl std::error::Error for TotpError {}

impl fmt::Display for TotpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotpError::InvalidSeed => write!(f, "TotpError: Seed is not valid base32"),
        }
    }
}

/// RFC 4648 base32 (no padding required, case-insensitive). Seeds from
/// provisioning apps come in this alphabet and nothing else.
pub fn decode_base32(encoded: &str) -> Result<Vec<u8>, TotpError> {
    let mut out = Vec::with_capacity(encoded.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for c in encoded.bytes() {
        if c == b'=' {
            break;
        }

        let value = match c {
            b'A'..=b'Z' => c - b'A',
            b'a'..=b'z' => c - b'a',
            b'2'..=b'7' => c - b'2' + 26,
            _ => return Err(TotpError::InvalidSeed),
        };

        buffer = (buffer << 5) | u32::from(value);
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }

    if out.is_empty() {
        return Err(TotpError::InvalidSeed);
    }

    Ok(out)
}

const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Unpadded encoding for provisioning URLs.
pub fn encode_base32(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;

        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }

    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}

/// RFC 4226 HOTP with dynamic truncation.
fn hotp(seed: &[u8], counter: u64) -> u32 {
    let mut mac = Hmac::<Sha1>::new_from_slice(seed)
        .expect("HMAC should accept a key of any length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((u32::from(digest[offset]) & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    binary % 10u32.pow(DIGITS)
}

fn code_at_step(seed: &[u8], step: i64) -> String {
    if step < 0 {
        // Before the epoch there are no valid steps
        return String::new();
    }

    format!("{:01$}", hotp(seed, step as u64), DIGITS as usize)
}

pub fn code_at(seed: &[u8], time: SystemTime) -> String {
    code_at_step(seed, step_for(time))
}

fn step_for(time: SystemTime) -> i64 {
    let since_epoch = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    (since_epoch / PERIOD_SECS) as i64
}

/// Checks `otp` against the current step and one step on either side. The
/// comparison is constant-time in the code bytes.
pub fn verify_at(seed: &[u8], otp: &str, time: SystemTime) -> bool {
    let current = step_for(time);

    for step in (current - SKEW_STEPS)..=(current + SKEW_STEPS) {
        let expected = code_at_step(seed, step);

        if !expected.is_empty() && are_equal(otp.as_bytes(), expected.as_bytes()) {
            return true;
        }
    }

    false
}

pub fn verify(seed: &[u8], otp: &str) -> bool {
    verify_at(seed, otp, SystemTime::now())
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
    use std::time::Duration;

    // RFC 4226 appendix D seed, "12345678901234567890"
    const RFC_SEED: &[u8] = b"12345678901234567890";

    #[test]
    fn test_rfc4226_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];

        for (counter, code) in expected.iter().enumerate() {
            assert_eq!(
                code_at_step(RFC_SEED, counter as i64),
                *code,
                "counter {counter}",
            );
        }
    }

    #[test]
    fn test_decode_base32() {
        assert_eq!(
            decode_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap(),
            RFC_SEED,
        );
        assert_eq!(decode_base32("JBSWY3DP").unwrap(), b"Hello!");
        assert_eq!(decode_base32("jbswy3dp").unwrap(), b"Hello!");
        assert_eq!(decode_base32("MZXW6===").unwrap(), b"foo");
    }

    #[test]
    fn test_encode_base32() {
        assert_eq!(
            encode_base32(RFC_SEED),
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
        );
        assert_eq!(encode_base32(b"Hello!"), "JBSWY3DP");
        assert_eq!(encode_base32(b"foo"), "MZXW6");
        assert_eq!(encode_base32(b""), "");
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let seed = b"\x00\x01\x02\xfe\xff unusual bytes";
        assert_eq!(decode_base32(&encode_base32(seed)).unwrap(), seed);
    }

    #[test]
    fn test_decode_base32_rejects_garbage() {
        assert!(decode_base32("").is_err());
        assert!(decode_base32("01189998").is_err());
        assert!(decode_base32("JBSWY3D!").is_err());
    }

    #[test]
    fn test_code_is_stable_within_a_period() {
        let t = UNIX_EPOCH + Duration::from_secs(59);
        let t2 = UNIX_EPOCH + Duration::from_secs(30);

        assert_eq!(code_at(RFC_SEED, t), code_at(RFC_SEED, t2));
    }

    #[test]
    fn test_verify_accepts_adjacent_steps() {
        let now = UNIX_EPOCH + Duration::from_secs(1_111_111_111);

        let previous = code_at(RFC_SEED, now - Duration::from_secs(PERIOD_SECS));
        let current = code_at(RFC_SEED, now);
        let next = code_at(RFC_SEED, now + Duration::from_secs(PERIOD_SECS));

        assert!(verify_at(RFC_SEED, &previous, now));
        assert!(verify_at(RFC_SEED, &current, now));
        assert!(verify_at(RFC_SEED, &next, now));
    }

    #[test]
    fn test_verify_rejects_distant_steps() {
        let now = UNIX_EPOCH + Duration::from_secs(1_111_111_111);

        let stale = code_at(RFC_SEED, now - Duration::from_secs(2 * PERIOD_SECS));
        let future = code_at(RFC_SEED, now + Duration::from_secs(2 * PERIOD_SECS));

        assert!(!verify_at(RFC_SEED, &stale, now));
        assert!(!verify_at(RFC_SEED, &future, now));
    }

    #[test]
    fn test_verify_rejects_wrong_code() {
        let now = UNIX_EPOCH + Duration::from_secs(1_111_111_111);
        let current = code_at(RFC_SEED, now);

        let mut wrong = current.into_bytes();
        wrong[5] = if wrong[5] == b'0' { b'1' } else { b'0' };
        let wrong = String::from_utf8(wrong).unwrap();

        assert!(!verify_at(RFC_SEED, &wrong, now));
    }
}
