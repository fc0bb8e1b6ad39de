//! Secret hashing and password policy
//!
//! Every stored secret is an Argon2id PHC string with its own random salt,
//! so two accounts with the same password never share a stored hash.
//! Verification recomputes the digest with the stored salt and parameters
//! and compares the raw outputs with [`crate::crypto::digests_match`].
//!
//! The [`PasswordPolicy`] is checked before hashing, at registration and at
//! password change. It follows NIST 800-63B: length bounds and a deny-list,
//! no composition rules.
//!
//! # Usage
//!
//! ```ignore
//! use tutorhub::password::{hash_secret, verify_secret, PasswordPolicy};
//!
//! PasswordPolicy::default().validate("correct horse battery")?;
//! let stored = hash_secret("correct horse battery")?;
//! assert!(verify_secret("correct horse battery", &stored)?);
//! ```

use std::collections::HashSet;

use argon2::password_hash::{PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, Params};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::crypto::digests_match;
use crate::error::AccessError;

// ============================================================================
// Hashing
// ============================================================================

/// Hash a plaintext secret with Argon2id and a fresh random salt.
///
/// Returns the PHC string (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
pub fn hash_secret(secret: &str) -> Result<String, AccessError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AccessError::Hashing(e.to_string()))
}

/// Check a plaintext secret against a stored PHC hash.
///
/// The digest is recomputed with the algorithm, version, parameters and salt
/// recorded in `stored`, then compared in constant time. A malformed stored
/// hash is a [`AccessError::CorruptHash`], not a mismatch.
pub fn verify_secret(secret: &str, stored: &str) -> Result<bool, AccessError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AccessError::CorruptHash(e.to_string()))?;

    let params =
        Params::try_from(&parsed).map_err(|e| AccessError::CorruptHash(e.to_string()))?;
    let expected = parsed
        .hash
        .as_ref()
        .ok_or_else(|| AccessError::CorruptHash("missing digest".to_string()))?;
    let salt = parsed
        .salt
        .ok_or_else(|| AccessError::CorruptHash("missing salt".to_string()))?;

    let recomputed = Argon2::default()
        .hash_password_customized(
            secret.as_bytes(),
            Some(parsed.algorithm),
            parsed.version,
            params,
            salt,
        )
        .map_err(|e| AccessError::Hashing(e.to_string()))?;

    let actual = recomputed
        .hash
        .ok_or_else(|| AccessError::Hashing("hasher produced no digest".to_string()))?;

    Ok(digests_match(expected.as_bytes(), actual.as_bytes()))
}

/// Hash compared against when the account does not exist, so that path
/// costs the same Argon2 work as a wrong secret.
///
/// A well-formed PHC string with the default Argon2id parameters. Nothing is
/// ever stored under it, so the digest only has to parse.
pub(crate) const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dHV0b3JodWJkdW1teXNhbHQ$mXQ0qTC/1kFTwkXJR5Zx20V4B0R+InewMnh5U1AZpr8";

// ============================================================================
// Password Policy
// ============================================================================

/// Rules a new secret must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum length in characters
    pub min_length: usize,

    /// Maximum length in characters
    pub max_length: usize,

    /// Reject secrets from the common-password list
    pub check_common_passwords: bool,

    /// Reject secrets containing the account holder's first or last name
    pub disallow_name_in_password: bool,

    /// Reject secrets containing the local part of the email
    pub disallow_email_in_password: bool,

    /// Application-specific deny-list (lowercased)
    pub blocked_passwords: HashSet<String>,

    /// Reject PIN-like all-digit secrets
    pub disallow_all_numeric: bool,
}

impl Default for PasswordPolicy {
    /// NIST 800-63B floor: 8 to 128 characters, no all-digit PINs
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            check_common_passwords: false,
            disallow_name_in_password: false,
            disallow_email_in_password: false,
            blocked_passwords: HashSet::new(),
            disallow_all_numeric: true,
        }
    }
}

impl PasswordPolicy {
    /// Create a new builder for custom policy configuration
    pub fn builder() -> PasswordPolicyBuilder {
        PasswordPolicyBuilder::default()
    }

    /// Stricter policy for administrator-managed deployments
    pub fn strict() -> Self {
        Self {
            min_length: 12,
            max_length: 128,
            check_common_passwords: true,
            disallow_name_in_password: true,
            disallow_email_in_password: true,
            blocked_passwords: HashSet::new(),
            disallow_all_numeric: true,
        }
    }

    /// Accept anything non-empty (tests and fixtures)
    pub fn minimal() -> Self {
        Self {
            min_length: 1,
            max_length: 128,
            check_common_passwords: false,
            disallow_name_in_password: false,
            disallow_email_in_password: false,
            blocked_passwords: HashSet::new(),
            disallow_all_numeric: false,
        }
    }

    /// Look up a policy by its configuration name
    pub fn named(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "standard" | "default" => Some(Self::default()),
            "strict" => Some(Self::strict()),
            "minimal" => Some(Self::minimal()),
            _ => None,
        }
    }

    /// Validate a secret without account context
    pub fn validate(&self, password: &str) -> Result<(), PasswordError> {
        self.validate_with_context(password, &[], None)
    }

    /// Validate a secret against the policy and the account's names and email
    pub fn validate_with_context(
        &self,
        password: &str,
        names: &[&str],
        email: Option<&str>,
    ) -> Result<(), PasswordError> {
        let len = password.chars().count();
        if len < self.min_length {
            return Err(PasswordError::TooShort {
                min: self.min_length,
                actual: len,
            });
        }
        if len > self.max_length {
            return Err(PasswordError::TooLong {
                max: self.max_length,
                actual: len,
            });
        }

        if self.disallow_all_numeric && password.chars().all(|c| c.is_ascii_digit()) {
            return Err(PasswordError::AllNumeric);
        }

        let lower = password.to_lowercase();

        if self.disallow_name_in_password {
            let hit = names
                .iter()
                .map(|n| n.trim().to_lowercase())
                .any(|n| n.len() > 2 && lower.contains(&n));
            if hit {
                return Err(PasswordError::ContainsName);
            }
        }

        if self.disallow_email_in_password {
            if let Some(local) = email.and_then(|e| e.split('@').next()) {
                if local.len() > 2 && lower.contains(&local.to_lowercase()) {
                    return Err(PasswordError::ContainsEmail);
                }
            }
        }

        if self.blocked_passwords.contains(&lower) {
            return Err(PasswordError::Blocked);
        }

        if self.check_common_passwords && is_common_password(&lower) {
            return Err(PasswordError::TooCommon);
        }

        Ok(())
    }
}

/// Builder for PasswordPolicy
#[derive(Debug, Clone, Default)]
pub struct PasswordPolicyBuilder {
    policy: PasswordPolicy,
}

impl PasswordPolicyBuilder {
    /// Set minimum password length
    pub fn min_length(mut self, len: usize) -> Self {
        self.policy.min_length = len;
        self
    }

    /// Set maximum password length
    pub fn max_length(mut self, len: usize) -> Self {
        self.policy.max_length = len;
        self
    }

    /// Enable/disable common password checking
    pub fn check_common_passwords(mut self, check: bool) -> Self {
        self.policy.check_common_passwords = check;
        self
    }

    /// Enable/disable the name-in-password check
    pub fn disallow_name_in_password(mut self, disallow: bool) -> Self {
        self.policy.disallow_name_in_password = disallow;
        self
    }

    /// Enable/disable the email-in-password check
    pub fn disallow_email_in_password(mut self, disallow: bool) -> Self {
        self.policy.disallow_email_in_password = disallow;
        self
    }

    /// Add custom blocked passwords
    pub fn block_passwords(mut self, passwords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.policy
            .blocked_passwords
            .extend(passwords.into_iter().map(|p| p.into().to_lowercase()));
        self
    }

    /// Enable/disable all-numeric password check
    pub fn disallow_all_numeric(mut self, disallow: bool) -> Self {
        self.policy.disallow_all_numeric = disallow;
        self
    }

    /// Build the policy
    pub fn build(self) -> PasswordPolicy {
        self.policy
    }
}

/// Reasons a secret is rejected by the policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password is too common")]
    TooCommon,

    #[error("Password cannot contain your name")]
    ContainsName,

    #[error("Password cannot contain your email")]
    ContainsEmail,

    #[error("This password is not allowed")]
    Blocked,

    #[error("Password cannot be all numbers")]
    AllNumeric,
}

// ============================================================================
// Common Password List
// ============================================================================

/// Exact match, or a common base of 4+ characters followed only by digits
fn is_common_password(lower: &str) -> bool {
    if COMMON_PASSWORDS.contains(&lower) {
        return true;
    }

    COMMON_PASSWORDS.iter().any(|common| {
        common.len() >= 4
            && lower
                .strip_prefix(common)
                .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
    })
}

static COMMON_PASSWORDS: &[&str] = &[
    "123456", "password", "12345678", "qwerty", "123456789",
    "12345", "1234", "111111", "1234567", "dragon",
    "123123", "baseball", "abc123", "football", "monkey",
    "letmein", "shadow", "master", "666666", "qwertyuiop",
    "123321", "mustang", "1234567890", "michael", "654321",
    "superman", "1qaz2wsx", "7777777", "121212", "000000",
    "qazwsx", "123qwe", "killer", "trustno1", "jordan",
    "zxcvbnm", "asdfgh", "hunter", "sunshine", "iloveyou",
    "charlie", "starwars", "computer", "freedom", "princess",
    "summer", "welcome", "login", "guest", "changeme",
    "test", "testing", "default", "secret", "admin",
    "administrator", "root", "passw0rd", "student", "teacher",
    "tutor", "school", "homework", "classroom", "tutorhub",
];
