//! Salted password digests, stored as `<salt>$<digest>` in hex.

use sha2::Digest;
use sha2::Sha256;

const SALT_LEN: usize = 16;

/// Hashes `password` with a fresh random salt.
pub fn hash(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::random();
    format!("{}${}", hex::encode(salt), digest(&salt, password))
}

/// Whether `password` matches a value produced by [`hash`].
pub fn verify(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    match hex::decode(salt) {
        Ok(salt) => digest(&salt, password) == expected,
        Err(_) => false,
    }
}

fn digest(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
