use argon2::{
    Argon2,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

const SHA256_TAG: &str = "sha256";
const ARGON2_TAG: &str = "argon2";

/// Digest algorithm used for share passwords. The tag is stored with the
/// digest so links issued under an older scheme keep verifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    /// Unsalted SHA-256, hex encoded. Kept for links issued by the first release.
    Sha256,
    /// Argon2id with a random salt (PHC string)
    Argon2,
}

impl PasswordScheme {
    pub fn tag(&self) -> &'static str {
        match self {
            PasswordScheme::Sha256 => SHA256_TAG,
            PasswordScheme::Argon2 => ARGON2_TAG,
        }
    }
}

impl fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PasswordScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            SHA256_TAG => Ok(PasswordScheme::Sha256),
            ARGON2_TAG | "argon2id" => Ok(PasswordScheme::Argon2),
            other => Err(anyhow::anyhow!("Unknown password scheme: {}", other)),
        }
    }
}

/// Hashes `password` under `scheme` and returns the tagged digest
/// (`<scheme>$<payload>`).
pub fn hash_password(password: &str, scheme: PasswordScheme) -> anyhow::Result<String> {
    let payload = match scheme {
        PasswordScheme::Sha256 => sha256_hex(password),
        PasswordScheme::Argon2 => {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| anyhow::anyhow!("Argon2 hashing failed: {}", e))?
                .to_string()
        }
    };
    Ok(format!("{}${}", scheme.tag(), payload))
}

/// Checks `password` against a stored digest.
///
/// An untagged 64-character hex digest is treated as SHA-256. Malformed
/// digests never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let (scheme, payload) = match split_digest(stored) {
        Some(parts) => parts,
        None => {
            tracing::warn!("Stored password digest has an unrecognised format");
            return false;
        }
    };

    match scheme {
        PasswordScheme::Sha256 => {
            let candidate = sha256_hex(password);
            let expected = payload.to_ascii_lowercase();
            candidate.as_bytes().ct_eq(expected.as_bytes()).into()
        }
        PasswordScheme::Argon2 => match argon2::PasswordHash::new(payload) {
            // argon2 compares the derived output in constant time
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Stored argon2 digest is invalid: {}", e);
                false
            }
        },
    }
}

/// Returns the scheme a stored digest was produced with.
pub fn digest_scheme(stored: &str) -> Option<PasswordScheme> {
    split_digest(stored).map(|(scheme, _)| scheme)
}

fn split_digest(stored: &str) -> Option<(PasswordScheme, &str)> {
    if let Some((tag, payload)) = stored.split_once('$') {
        let scheme = match tag {
            SHA256_TAG if is_sha256_hex(payload) => PasswordScheme::Sha256,
            ARGON2_TAG if !payload.is_empty() => PasswordScheme::Argon2,
            _ => return None,
        };
        return Some((scheme, payload));
    }
    if is_sha256_hex(stored) {
        return Some((PasswordScheme::Sha256, stored));
    }
    None
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn sha256_hex(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_digest_is_tagged_hex() {
        let digest = hash_password("hello world", PasswordScheme::Sha256).unwrap();
        assert_eq!(
            digest,
            "sha256$b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert!(verify_password("hello world", &digest));
        assert!(!verify_password("hello worle", &digest));
    }

    #[test]
    fn test_untagged_legacy_digest_verifies() {
        let legacy = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
        assert_eq!(digest_scheme(legacy), Some(PasswordScheme::Sha256));
        assert!(verify_password("hello world", legacy));
        assert!(verify_password(
            "hello world",
            &legacy.to_ascii_uppercase()
        ));
        assert!(!verify_password("p2", legacy));
    }

    #[test]
    fn test_argon2_digest_roundtrip() {
        let digest = hash_password("p1", PasswordScheme::Argon2).unwrap();
        assert!(digest.starts_with("argon2$$argon2id$"));
        assert_eq!(digest_scheme(&digest), Some(PasswordScheme::Argon2));
        assert!(verify_password("p1", &digest));
        assert!(!verify_password("p2", &digest));
    }

    #[test]
    fn test_argon2_digests_are_salted() {
        let a = hash_password("same", PasswordScheme::Argon2).unwrap();
        let b = hash_password("same", PasswordScheme::Argon2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_digest_never_verifies() {
        assert!(!verify_password("", ""));
        assert!(!verify_password("x", "md5$abc"));
        assert!(!verify_password("x", "sha256$nothex"));
        assert!(!verify_password("x", "argon2$garbage"));
        assert_eq!(digest_scheme("md5$abc"), None);
    }

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("SHA256".parse::<PasswordScheme>().unwrap(), PasswordScheme::Sha256);
        assert_eq!("argon2id".parse::<PasswordScheme>().unwrap(), PasswordScheme::Argon2);
        assert!("bcrypt".parse::<PasswordScheme>().is_err());
    }
}
