//! Argon2id password hasher.
//!
//! Uses OWASP-recommended Argon2id parameters:
//! m=19456 (19 MiB), t=2, p=1.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHasher};
use discepto_application::PasswordHasher as PasswordHasherPort;
use discepto_core::{AppError, AppResult};

/// Argon2id implementation of the password hashing port.
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    /// Creates a hasher with the recommended parameters.
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(19456, 2, 1, None).unwrap_or_else(|_| Params::default());
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, argon2::Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasherPort for Argon2PasswordHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|error| AppError::Internal(format!("failed to hash password: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use argon2::{PasswordHash, PasswordVerifier};
    use discepto_application::PasswordHasher as PasswordHasherPort;
    use discepto_core::AppResult;

    use super::Argon2PasswordHasher;

    #[test]
    fn hashes_are_salted_argon2id_phc_strings() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let first = hasher.hash_password("Correct-horse-1")?;
        let second = hasher.hash_password("Correct-horse-1")?;

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn hash_verifies_only_the_original_password() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash_password("Correct-horse-1")?;
        let parsed = PasswordHash::new(&hash);
        let Ok(parsed) = parsed else {
            panic!("hash should parse as a PHC string");
        };

        let argon2 = argon2::Argon2::default();
        assert!(argon2.verify_password(b"Correct-horse-1", &parsed).is_ok());
        assert!(argon2.verify_password(b"wrong-horse-1", &parsed).is_err());
        Ok(())
    }
}
