//! Credential verification
//!
//! [`CredentialVerifier::verify`] answers one question: does this secret
//! belong to this account? The answer is either an [`Authenticated`] outcome
//! carrying the user id and role, or [`AccessError::InvalidCredentials`].
//!
//! An unknown account and a wrong secret are the same error, and both paths
//! run one Argon2 computation, so neither the result nor its timing reveals
//! which emails are registered.
//!
//! With a [`LockoutPolicy`] attached, identifiers that exhaust their failure
//! budget are refused with [`AccessError::LockedOut`] before the store is
//! consulted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AccessError;
use crate::login::{LockoutPolicy, LoginTracker};
use crate::observability::SecurityEvent;
use crate::password::{verify_secret, DUMMY_HASH};
use crate::role::Role;
use crate::store::CredentialStore;
use crate::validation::normalize_email;

/// Successful verification outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authenticated {
    pub role: Role,
    pub user_id: String,
}

/// Checks login attempts against a [`CredentialStore`]
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    store: Arc<CredentialStore>,
    tracker: Option<LoginTracker>,
}

impl CredentialVerifier {
    /// Verifier without lockout
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self {
            store,
            tracker: None,
        }
    }

    /// Refuse identifiers that exceed the policy's failure budget
    pub fn with_lockout(mut self, policy: LockoutPolicy) -> Self {
        self.tracker = Some(LoginTracker::new(policy));
        self
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn tracker(&self) -> Option<&LoginTracker> {
        self.tracker.as_ref()
    }

    /// Verify a login attempt.
    ///
    /// `identifier` is the account email, matched after normalization.
    ///
    /// # Errors
    ///
    /// - [`AccessError::InvalidCredentials`] for an unknown account or a wrong secret
    /// - [`AccessError::LockedOut`] when lockout is enabled and the identifier is locked
    /// - [`AccessError::CorruptHash`] when the stored hash cannot be parsed
    pub fn verify(&self, identifier: &str, secret: &str) -> Result<Authenticated, AccessError> {
        let key = normalize_email(identifier);

        if let Some(lockout) = self.tracker.as_ref().and_then(|t| t.check_lockout(&key)) {
            crate::security_event!(
                SecurityEvent::AuthenticationFailure,
                identifier = %key,
                reason = "locked_out",
                "Login refused for locked identifier"
            );
            return Err(AccessError::LockedOut {
                retry_after_secs: lockout.remaining_secs().max(1),
            });
        }

        let user = self.store.find_by_email(&key);
        let matched = match &user {
            Some(user) => verify_secret(secret, &user.password_hash).inspect_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Stored credential is unusable");
            })?,
            None => {
                // Same work as a real comparison; the outcome is irrelevant.
                if let Err(e) = verify_secret(secret, DUMMY_HASH) {
                    tracing::error!(error = %e, "Dummy hash comparison failed");
                }
                false
            }
        };

        match user {
            Some(user) if matched => {
                if let Some(tracker) = &self.tracker {
                    tracker.record_success(&key);
                }
                crate::security_event!(
                    SecurityEvent::AuthenticationSuccess,
                    user_id = %user.id,
                    role = %user.role,
                    "Login successful"
                );
                Ok(Authenticated {
                    role: user.role,
                    user_id: user.id,
                })
            }
            _ => {
                let remaining = self
                    .tracker
                    .as_ref()
                    .map(|t| t.record_failure(&key).remaining_attempts);
                crate::security_event!(
                    SecurityEvent::AuthenticationFailure,
                    identifier = %key,
                    remaining_attempts = ?remaining,
                    "Login failed"
                );
                Err(AccessError::InvalidCredentials)
            }
        }
    }

    /// Lift a lockout early (admin action); no-op without lockout
    pub fn unlock(&self, identifier: &str) {
        if let Some(tracker) = &self.tracker {
            tracker.unlock(&normalize_email(identifier));
        }
    }
}
