//! Password hashing with PBKDF2-SHA256 and a self-describing hash format.
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt_b64>$<hash_b64>`. The
//! iteration count travels with the hash, so it can be raised later without
//! invalidating existing credentials.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

const SCHEME: &str = "pbkdf2-sha256";
const PBKDF2_ITERATIONS: u32 = 600_000;
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

pub fn hash_password(password: &str) -> String {
    hash_with_iterations(password, PBKDF2_ITERATIONS)
}

pub(crate) fn hash_with_iterations(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut derived = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut derived);
    format!(
        "{SCHEME}${iterations}${}${}",
        BASE64.encode(salt),
        BASE64.encode(derived)
    )
}

/// Verify a password against a stored hash. Malformed hashes verify as
/// false rather than erroring, so a corrupted row cannot be logged into.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (BASE64.decode(salt), BASE64.decode(hash)) else {
        return false;
    };
    if expected.len() != HASH_LENGTH {
        return false;
    }

    let mut derived = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut derived);
    constant_time_eq(&derived, &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low iteration count keeps the tests fast; the format is identical.
    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn correct_password_verifies() {
        let stored = hash_with_iterations("open sesame", TEST_ITERATIONS);
        assert!(verify_password("open sesame", &stored));
    }

    #[test]
    fn wrong_password_fails() {
        let stored = hash_with_iterations("open sesame", TEST_ITERATIONS);
        assert!(!verify_password("open Sesame", &stored));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_with_iterations("open sesame", TEST_ITERATIONS);
        let b = hash_with_iterations("open sesame", TEST_ITERATIONS);
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        for stored in [
            "",
            "plaintext",
            "pbkdf2-sha256$not-a-number$AAAA$AAAA",
            "md5$1000$AAAA$AAAA",
            "pbkdf2-sha256$1000$AAAA$AAAA$extra",
            "pbkdf2-sha256$1000$!!$AAAA",
        ] {
            assert!(!verify_password("anything", stored), "{stored:?}");
        }
    }

    #[test]
    fn iteration_count_is_read_from_the_stored_hash() {
        let stored = hash_with_iterations("open sesame", 2_000);
        assert!(stored.starts_with("pbkdf2-sha256$2000$"));
        assert!(verify_password("open sesame", &stored));
    }
}
