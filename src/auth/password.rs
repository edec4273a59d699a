use bcrypt::{hash, verify};

/// `cost` comes from `BCRYPT_COST`; tests run with the minimum of 4.
pub fn hash_password(password: &str, cost: u32) -> Result<String, anyhow::Error> {
    hash(password, cost).map_err(|e| anyhow::anyhow!("Password hashing error: {:?}", e))
}

/// A malformed stored hash counts as a mismatch rather than an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, anyhow::Error> {
    Ok(verify(password, hash).unwrap_or_else(|e| {
        log::warn!("Stored password hash could not be checked: {}", e);
        false
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_hashed_password() {
        let hashed = hash_password("correct horse", 4).unwrap();
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("battery staple", &hashed).unwrap());
    }

    #[test]
    fn garbage_hash_is_a_mismatch_not_an_error() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash").unwrap());
    }
}
