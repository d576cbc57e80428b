//! Password hashing, password policy and random credential helpers.

use base64::{engine::general_purpose, Engine as _};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

/// Prefix of generated API keys.
pub const API_KEY_PREFIX: &str = "cak";

const SPECIAL_CHARS: &str = "!@#$%^&*";

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

/// Hash a plain password with argon2id and a random salt. Returns a PHC string.
pub fn hash_password(password: &str) -> Result<String, String> {
    use argon2::Argon2;
    use password_hash::rand_core::OsRng;
    use password_hash::{PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| e.to_string())
}

/// Verify a password against a PHC hash. A malformed hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::Argon2;
    use password_hash::{PasswordHash, PasswordVerifier};

    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// A password policy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    Special,
}

impl PasswordRule {
    pub fn message(&self) -> &'static str {
        match self {
            PasswordRule::MinLength => "Password must be at least 8 characters long",
            PasswordRule::Uppercase => "Password must contain at least one uppercase letter",
            PasswordRule::Lowercase => "Password must contain at least one lowercase letter",
            PasswordRule::Digit => "Password must contain at least one number",
            PasswordRule::Special => {
                "Password must contain at least one special character (!@#$%^&*)"
            }
        }
    }
}

/// Check a password against the policy, reporting every violated rule.
pub fn validate_password(password: &str) -> Result<(), Vec<PasswordRule>> {
    let mut violations = Vec::new();

    if password.chars().count() < 8 {
        violations.push(PasswordRule::MinLength);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(PasswordRule::Uppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push(PasswordRule::Lowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PasswordRule::Digit);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        violations.push(PasswordRule::Special);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Random password of `len` characters (at least 4) with one character from
/// each class the policy requires.
pub fn generate_secure_password(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let classes: [&[u8]; 4] = [UPPERCASE, LOWERCASE, DIGITS, SPECIAL_CHARS.as_bytes()];
    let all: Vec<u8> = classes.concat();

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while chars.len() < len {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

/// `len` random bytes, hex encoded.
pub fn generate_token(len: usize) -> String {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    hex_encode(&buf)
}

/// Single-use password reset token (32 random bytes, hex).
pub fn generate_reset_token() -> String {
    generate_token(32)
}

/// SHA-256 of a token, hex encoded, for storing tokens at rest.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex_encode(&digest)
}

/// `cak_<base64url of 24 random bytes>`.
pub fn generate_api_key() -> String {
    let mut buf = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut buf);
    format!(
        "{}_{}",
        API_KEY_PREFIX,
        general_purpose::URL_SAFE_NO_PAD.encode(buf)
    )
}

/// Split an `Authorization` header into scheme and credentials.
///
/// Lenient: only the first two space-separated parts are looked at. Use
/// [`TokenIssuer::extract_token`](crate::token::TokenIssuer::extract_token)
/// for authentication.
pub fn parse_auth_header(header: Option<&str>) -> Option<(&str, &str)> {
    let mut parts = header?.split(' ');
    let scheme = parts.next().filter(|s| !s.is_empty())?;
    let credentials = parts.next().filter(|s| !s.is_empty())?;
    Some((scheme, credentials))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
