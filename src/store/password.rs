//! Salted password hashing

use sha2::{Digest, Sha256};

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a password with a fresh random salt, returning `(salt, hash)`
pub fn hash_password(password: &str) -> (String, String) {
    let salt = hex::encode(rand::random::<[u8; 16]>());
    let hash = digest(&salt, password);
    (salt, hash)
}

pub fn verify_password(password: &str, salt: &str, hash: &str) -> bool {
    digest(salt, password) == hash
}
