//! Password hashing and reset-token generation.

use rand::{distributions::Alphanumeric, Rng};

use crate::Result;

pub fn hash(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

pub fn verify(password: &str, hashed: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hashed)?)
}

/// Random token for password-reset links. Alphanumeric so it survives URLs
/// without encoding.
pub fn reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_and_rejects_wrong_password() {
        // Minimum cost keeps the test fast.
        let hashed = hash("s3cret", 4).unwrap();
        assert!(verify("s3cret", &hashed).unwrap());
        assert!(!verify("wrong", &hashed).unwrap());
    }

    #[test]
    fn reset_tokens_are_long_and_unique() {
        let a = reset_token();
        let b = reset_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
