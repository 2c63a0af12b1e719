use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

pub const DIGEST_LEN: usize = 32;

/// Length of a padded base64 encoding of a SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 44;

/// Computes the pin fingerprint of a public key: the SHA-256 digest of the
/// given bytes, base64 encoded with the standard alphabet and padding.
pub fn hash_public_key(key: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(key))
}

/// Checks whether a string looks like a fingerprint this crate produces.
///
/// Only used to warn about suspicious pins, never to reject them.
pub fn is_well_formed(fingerprint: &str) -> bool {
    fingerprint.len() == FINGERPRINT_LEN
        && STANDARD
            .decode(fingerprint)
            .is_ok_and(|digest| digest.len() == DIGEST_LEN)
}
