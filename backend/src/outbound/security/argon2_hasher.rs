//! Argon2id password hashing producing PHC strings.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    Error as PhcError, PasswordHash as PhcHash, PasswordHasher, PasswordVerifier, SaltString,
};

use crate::domain::PasswordHash;
use crate::domain::ports::{CredentialHasher, CredentialHasherError};

/// [`CredentialHasher`] backed by Argon2id with the crate defaults.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon: Argon2<'static>,
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<PasswordHash, CredentialHasherError> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = self
            .argon
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| CredentialHasherError::hash(err.to_string()))?;
        Ok(PasswordHash::from_encoded(phc.to_string()))
    }

    fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, CredentialHasherError> {
        let parsed = PhcHash::new(hash.as_str())
            .map_err(|err| CredentialHasherError::malformed(err.to_string()))?;
        match self.argon.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PhcError::Password) => Ok(false),
            Err(err) => Err(CredentialHasherError::hash(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn hashes_verify_only_the_original_password() {
        let hasher = Argon2Hasher::default();
        let hash = hasher.hash("pass1234").expect("hash");
        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("pass1234", &hash).expect("verify"));
        assert!(!hasher.verify("pass12345", &hash).expect("verify"));
    }

    #[rstest]
    fn salts_differ_between_hashes() {
        let hasher = Argon2Hasher::default();
        let first = hasher.hash("pass1234").expect("hash");
        let second = hasher.hash("pass1234").expect("hash");
        assert_ne!(first, second);
    }

    #[rstest]
    fn malformed_hashes_are_reported() {
        let hasher = Argon2Hasher::default();
        let err = hasher
            .verify("pass1234", &PasswordHash::from_encoded("not-a-phc-string"))
            .expect_err("malformed");
        assert!(matches!(err, CredentialHasherError::Malformed { .. }));
    }
}
