pub enum Validity {
    Valid,
    Invalid(&'static str),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match &self {
            Validity::Valid => true,
            Validity::Invalid(_) => false,
        }
    }
}

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 64;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 72;

pub fn validate_username(username: &str) -> Validity {
    if username.len() < USERNAME_MIN_LEN {
        return Validity::Invalid("Username is too short");
    }

    if username.len() > USERNAME_MAX_LEN {
        return Validity::Invalid("Username is too long");
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        return Validity::Invalid("Username contains invalid characters");
    }

    Validity::Valid
}

// The upper bound matches the input limit of the underlying hash
pub fn validate_password(password: &str) -> Validity {
    if password.len() < PASSWORD_MIN_LEN {
        return Validity::Invalid("Password is too short");
    }

    if password.len() > PASSWORD_MAX_LEN {
        return Validity::Invalid("Password is too long");
    }

    Validity::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("abc").is_valid());
        assert!(validate_username("ops.teller_01").is_valid());
        assert!(validate_username(&"a".repeat(64)).is_valid());

        assert!(!validate_username("ab").is_valid());
        assert!(!validate_username(&"a".repeat(65)).is_valid());
        assert!(!validate_username("has space").is_valid());
        assert!(!validate_username("semi;colon").is_valid());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("8chars!!").is_valid());
        assert!(validate_password(&"p".repeat(72)).is_valid());

        assert!(!validate_password("short").is_valid());
        assert!(!validate_password(&"p".repeat(73)).is_valid());
    }
}
