//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Hashes are self-describing strings of the form
//! `pbkdf2-sha256$<iterations>$<salt>$<hash>` with unpadded standard base64,
//! so the work factor can be raised without invalidating stored hashes.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::AuthError;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;

/// Work factor used for new hashes.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Hashes a password with a fresh random salt and [`DEFAULT_ITERATIONS`].
pub fn hash_password(password: &str) -> String {
    hash_password_with_iterations(password, DEFAULT_ITERATIONS)
}

/// Hashes a password with an explicit work factor.
pub fn hash_password_with_iterations(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt[..]);
    let derived = pbkdf2_sha256(password.as_bytes(), &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(derived)
    )
}

/// Checks a password against a stored hash in constant time.
///
/// Returns `Ok(false)` on a mismatch and `Err(MalformedHash)` when the stored
/// value is not a hash this module produced.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(AuthError::MalformedHash);
    };

    let iterations: u32 = iterations.parse().map_err(|_| AuthError::MalformedHash)?;
    if iterations == 0 {
        return Err(AuthError::MalformedHash);
    }
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| AuthError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| AuthError::MalformedHash)?;

    let derived = pbkdf2_sha256(password.as_bytes(), &salt, iterations);
    Ok(derived.as_slice().ct_eq(expected.as_slice()).into())
}

fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut derived = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut derived);
    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_accepts_correct_password() {
        let hash = hash_password_with_iterations("hunter22", 10);
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn hash_uses_random_salt() {
        let a = hash_password_with_iterations("same", 5);
        let b = hash_password_with_iterations("same", 5);
        assert_ne!(a, b);
    }

    #[test]
    fn hash_records_iteration_count() {
        let hash = hash_password_with_iterations("pw", 42);
        assert!(hash.starts_with("pbkdf2-sha256$42$"));
    }

    #[test]
    fn verify_rejects_malformed_hashes() {
        assert!(matches!(
            verify_password("pw", "plaintext"),
            Err(AuthError::MalformedHash)
        ));
        assert!(matches!(
            verify_password("pw", "bcrypt$10$abc$def"),
            Err(AuthError::MalformedHash)
        ));
        assert!(matches!(
            verify_password("pw", "pbkdf2-sha256$0$AAAA$AAAA"),
            Err(AuthError::MalformedHash)
        ));
    }

    #[test]
    fn pbkdf2_matches_rfc7914_vector() {
        // RFC 7914 section 11: PBKDF2-HMAC-SHA256 (P="passwd", S="salt", c=1), first 32 bytes.
        let derived = pbkdf2_sha256(b"passwd", b"salt", 1);
        let expected = [
            0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f, 0xec, 0x16, 0x91, 0xc2, 0x25, 0x44,
            0xb6, 0x05, 0xf9, 0x41, 0x85, 0x21, 0x6d, 0xde, 0x04, 0x65, 0xe6, 0x8b, 0x9d, 0x57,
            0xc2, 0x0d, 0xac, 0xbc,
        ];
        assert_eq!(derived, expected);
    }

    #[test]
    fn long_passwords_round_trip() {
        let password = "x".repeat(200);
        let hash = hash_password_with_iterations(&password, 10);
        assert!(verify_password(&password, &hash).unwrap());
        assert!(!verify_password(&"x".repeat(199), &hash).unwrap());
    }
}
