//! Authentication utilities

use anyhow::{Context, Result};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Default PBKDF2 work factor for new hashes
pub const PBKDF2_ITERATIONS: u32 = 100_000;
const HASH_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;
const METHOD: &str = "pbkdf2:sha256";

/// Hash a password using pbkdf2-sha256 with a fresh random salt.
///
/// The result reads `pbkdf2:sha256:<iterations>$<salt>$<hex digest>`, so
/// verification does not need to know the work factor in advance.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_random_string(SALT_LENGTH);
    let digest = derive(password, &salt, iterations);

    format!("{}:{}${}${}", METHOD, iterations, salt, hex::encode(digest))
}

/// Verify a password against a stored hash using constant-time comparison.
///
/// Malformed hashes are an error, a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let (method, rest) = stored
        .rsplit_once(':')
        .context("Password hash has no method prefix")?;
    if method != METHOD {
        anyhow::bail!("Unsupported password hash method: {}", method);
    }

    let mut parts = rest.splitn(3, '$');
    let iterations: u32 = parts
        .next()
        .context("Password hash has no iteration count")?
        .parse()
        .context("Password hash iteration count is not a number")?;
    let salt = parts.next().context("Password hash has no salt")?;
    let expected = hex::decode(parts.next().context("Password hash has no digest")?)
        .context("Password hash digest is not hex")?;

    let computed = derive(password, salt, iterations);

    Ok(computed.as_slice().ct_eq(expected.as_slice()).into())
}

fn derive(password: &str, salt: &str, iterations: u32) -> [u8; HASH_LENGTH] {
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut hash);
    hash
}

/// generate a random string of the given length
pub fn generate_random_string(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_string() {
        let s1 = generate_random_string(32);
        let s2 = generate_random_string(32);

        assert_eq!(s1.len(), 32);
        assert_eq!(s2.len(), 32);
        assert_ne!(s1, s2); // Should be different (with very high probability)
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2", 1_000);
        assert!(hash.starts_with("pbkdf2:sha256:1000$"));
        assert!(!hash.contains("hunter2"));

        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_salt_differs_per_hash() {
        let a = hash_password("same", 1_000);
        let b = hash_password("same", 1_000);
        assert_ne!(a, b);
        assert!(verify_password("same", &a).unwrap());
        assert!(verify_password("same", &b).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        assert!(verify_password("x", "plaintext").is_err());
        assert!(verify_password("x", "md5:1$salt$00").is_err());
        assert!(verify_password("x", "pbkdf2:sha256:abc$salt$00").is_err());
        assert!(verify_password("x", "pbkdf2:sha256:10$salt$zz").is_err());
    }
}
