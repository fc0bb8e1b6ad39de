//! Failed login tracking and lockout
//!
//! Counts failed credential checks per identifier inside a sliding window and
//! locks the identifier once the budget is spent. The credential verifier
//! consults the tracker before touching the store, so a locked identifier
//! costs no hash computation.
//!
//! Identifiers are tracked whether or not an account exists for them;
//! otherwise the lockout itself would reveal which emails are registered.
//! Every [`PRUNE_INTERVAL`] failures the tracker drops records with no recent
//! failure and no active lockout, so a stream of distinct identifiers cannot
//! grow it without bound.
//!
//! ```ignore
//! use tutorhub::login::{LockoutPolicy, LoginTracker};
//!
//! let tracker = LoginTracker::new(LockoutPolicy::default());
//!
//! if let Some(lockout) = tracker.check_lockout("jane@example.com") {
//!     return Err(AccessError::LockedOut { retry_after_secs: lockout.remaining_secs() });
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::observability::SecurityEvent;

/// Failed attempts between two sweeps of stale records
pub const PRUNE_INTERVAL: u64 = 256;

// ============================================================================
// Lockout Policy
// ============================================================================

/// Rules for counting failures and locking identifiers
#[derive(Debug, Clone, PartialEq)]
pub struct LockoutPolicy {
    /// Number of failed attempts before lockout
    pub max_attempts: u32,

    /// Attempts older than this are not counted
    pub attempt_window: Duration,

    /// Duration of the first lockout
    pub lockout_duration: Duration,

    /// Lengthen each subsequent lockout by `lockout_multiplier`
    pub progressive_lockout: bool,

    /// Upper bound for progressive lockouts
    pub max_lockout_duration: Duration,

    /// Growth factor for progressive lockouts
    pub lockout_multiplier: f64,
}

impl Default for LockoutPolicy {
    /// 5 failures in 30 minutes locks for 15 minutes, doubling per repeat
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_window: Duration::from_secs(30 * 60),
            lockout_duration: Duration::from_secs(15 * 60),
            progressive_lockout: true,
            max_lockout_duration: Duration::from_secs(24 * 60 * 60),
            lockout_multiplier: 2.0,
        }
    }
}

impl LockoutPolicy {
    /// Create a new builder
    pub fn builder() -> LockoutPolicyBuilder {
        LockoutPolicyBuilder::default()
    }

    /// 3 failures per hour, 30 minute lockout tripling per repeat
    pub fn strict() -> Self {
        Self {
            max_attempts: 3,
            attempt_window: Duration::from_secs(60 * 60),
            lockout_duration: Duration::from_secs(30 * 60),
            progressive_lockout: true,
            max_lockout_duration: Duration::from_secs(24 * 60 * 60),
            lockout_multiplier: 3.0,
        }
    }

    /// 10 failures in 15 minutes, flat 5 minute lockout
    pub fn relaxed() -> Self {
        Self {
            max_attempts: 10,
            attempt_window: Duration::from_secs(15 * 60),
            lockout_duration: Duration::from_secs(5 * 60),
            progressive_lockout: false,
            max_lockout_duration: Duration::from_secs(60 * 60),
            lockout_multiplier: 1.0,
        }
    }

    /// Lockout duration for the n-th lockout of an identifier (1-based)
    pub fn calculate_lockout_duration(&self, lockout_count: u32) -> Duration {
        if !self.progressive_lockout || lockout_count == 0 {
            return self.lockout_duration;
        }

        let multiplier = self.lockout_multiplier.powi(lockout_count as i32 - 1);
        let duration_secs = (self.lockout_duration.as_secs_f64() * multiplier) as u64;

        Duration::from_secs(duration_secs.min(self.max_lockout_duration.as_secs()))
    }
}

/// Builder for LockoutPolicy
#[derive(Debug, Clone, Default)]
pub struct LockoutPolicyBuilder {
    policy: LockoutPolicy,
}

impl LockoutPolicyBuilder {
    /// Set maximum failed attempts before lockout
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    /// Set the time window for counting attempts
    pub fn attempt_window(mut self, duration: Duration) -> Self {
        self.policy.attempt_window = duration;
        self
    }

    /// Set lockout duration
    pub fn lockout_duration(mut self, duration: Duration) -> Self {
        self.policy.lockout_duration = duration;
        self
    }

    /// Enable/disable progressive lockout
    pub fn progressive_lockout(mut self, enabled: bool) -> Self {
        self.policy.progressive_lockout = enabled;
        self
    }

    /// Set maximum lockout duration
    pub fn max_lockout_duration(mut self, duration: Duration) -> Self {
        self.policy.max_lockout_duration = duration;
        self
    }

    /// Set lockout multiplier for progressive lockout
    pub fn lockout_multiplier(mut self, multiplier: f64) -> Self {
        self.policy.lockout_multiplier = multiplier;
        self
    }

    /// Build the policy
    pub fn build(self) -> LockoutPolicy {
        self.policy
    }
}

// ============================================================================
// Attempt Records
// ============================================================================

/// Failure history of one identifier
#[derive(Debug, Clone, Default)]
pub struct AttemptRecord {
    /// Recent failed attempt timestamps
    pub failed_attempts: Vec<Instant>,
    /// Number of times this identifier has been locked out
    pub lockout_count: u32,
    /// When the current lockout started
    pub lockout_started: Option<Instant>,
    /// Duration of current lockout
    pub lockout_duration: Duration,
    /// Last successful login
    pub last_success: Option<Instant>,
}

impl AttemptRecord {
    /// Count failed attempts within the window
    pub fn recent_failures(&self, window: Duration) -> u32 {
        let now = Instant::now();
        self.failed_attempts
            .iter()
            .filter(|&&t| now.duration_since(t) < window)
            .count() as u32
    }

    /// Check if currently locked out
    pub fn is_locked_out(&self) -> bool {
        self.remaining_lockout().is_some()
    }

    /// Remaining lockout time, if any
    pub fn remaining_lockout(&self) -> Option<Duration> {
        let started = self.lockout_started?;
        let elapsed = Instant::now().duration_since(started);
        (elapsed < self.lockout_duration).then(|| self.lockout_duration - elapsed)
    }

    fn record_failure(&mut self) {
        self.failed_attempts.push(Instant::now());
    }

    fn record_success(&mut self) {
        self.last_success = Some(Instant::now());
        self.failed_attempts.clear();
        // lockout_count survives so repeat offenders keep escalating
    }

    fn start_lockout(&mut self, duration: Duration) {
        self.lockout_started = Some(Instant::now());
        self.lockout_duration = duration;
        self.lockout_count += 1;
        self.failed_attempts.clear();
    }

    fn unlock(&mut self) {
        self.lockout_started = None;
        self.failed_attempts.clear();
    }

    fn cleanup(&mut self, window: Duration) {
        let now = Instant::now();
        self.failed_attempts
            .retain(|&t| now.duration_since(t) < window);
    }
}

// ============================================================================
// Login Tracker
// ============================================================================

/// Result of recording a failed attempt
#[derive(Debug, Clone)]
pub struct AttemptResult {
    /// Number of recent failed attempts
    pub failed_count: u32,
    /// Attempts left before lockout
    pub remaining_attempts: u32,
    /// Whether the identifier is now locked out
    pub is_locked_out: bool,
    /// Lockout duration if locked out
    pub lockout_duration: Option<Duration>,
}

/// Active lockout of an identifier
#[derive(Debug, Clone)]
pub struct LockoutInfo {
    /// When the lockout started
    pub started: Instant,
    /// Total lockout duration
    pub duration: Duration,
    /// Number of times locked out
    pub lockout_count: u32,
}

impl LockoutInfo {
    /// Remaining lockout time in whole seconds, rounded up
    pub fn remaining_secs(&self) -> u64 {
        let elapsed = Instant::now().duration_since(self.started);
        match self.duration.checked_sub(elapsed) {
            Some(left) if left.subsec_nanos() > 0 => left.as_secs() + 1,
            Some(left) => left.as_secs(),
            None => 0,
        }
    }
}

/// In-memory failed login tracker
///
/// Clones share the same records.
#[derive(Debug, Clone)]
pub struct LoginTracker {
    policy: LockoutPolicy,
    records: Arc<RwLock<HashMap<String, AttemptRecord>>>,
    failures: Arc<AtomicU64>,
}

impl LoginTracker {
    /// Create a new login tracker with the given policy
    pub fn new(policy: LockoutPolicy) -> Self {
        Self {
            policy,
            records: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The policy this tracker enforces
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Lockout info if the identifier is currently locked out
    pub fn check_lockout(&self, identifier: &str) -> Option<LockoutInfo> {
        let records = self.records.read();
        let record = records.get(identifier)?;

        if record.is_locked_out() {
            Some(LockoutInfo {
                started: record.lockout_started?,
                duration: record.lockout_duration,
                lockout_count: record.lockout_count,
            })
        } else {
            None
        }
    }

    /// Record a failed attempt, locking the identifier once the budget is spent
    pub fn record_failure(&self, identifier: &str) -> AttemptResult {
        let mut records = self.records.write();

        let seen = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % PRUNE_INTERVAL == 0 {
            prune(&mut records, self.policy.attempt_window);
        }

        let record = records.entry(identifier.to_string()).or_default();
        record.cleanup(self.policy.attempt_window);
        record.record_failure();

        let failed_count = record.recent_failures(self.policy.attempt_window);
        let remaining = self.policy.max_attempts.saturating_sub(failed_count);

        let (is_locked_out, lockout_duration) =
            if failed_count >= self.policy.max_attempts && !record.is_locked_out() {
                let duration = self
                    .policy
                    .calculate_lockout_duration(record.lockout_count + 1);
                record.start_lockout(duration);
                log_account_locked(identifier, failed_count, duration);
                (true, Some(duration))
            } else {
                (record.is_locked_out(), record.remaining_lockout())
            };

        AttemptResult {
            failed_count,
            remaining_attempts: remaining,
            is_locked_out,
            lockout_duration,
        }
    }

    /// Record a successful login, clearing recent failures
    pub fn record_success(&self, identifier: &str) {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(identifier) {
            record.record_success();
        }
    }

    /// Manually unlock an identifier (admin action)
    pub fn unlock(&self, identifier: &str) {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(identifier) {
            record.unlock();
            log_account_unlocked(identifier);
        }
    }

    /// Drop records with no recent failures and no active lockout
    pub fn cleanup(&self) {
        prune(&mut self.records.write(), self.policy.attempt_window);
    }
}

fn prune(records: &mut HashMap<String, AttemptRecord>, window: Duration) {
    let before = records.len();
    records.retain(|_, record| {
        record.cleanup(window);
        !record.failed_attempts.is_empty() || record.is_locked_out()
    });

    let dropped = before - records.len();
    if dropped > 0 {
        tracing::debug!(dropped, retained = records.len(), "Pruned stale login records");
    }
}

// ============================================================================
// Security Event Logging
// ============================================================================

fn log_account_locked(identifier: &str, failed_count: u32, duration: Duration) {
    crate::security_event!(
        SecurityEvent::AccountLocked,
        identifier = %identifier,
        failed_count = failed_count,
        lockout_duration_secs = duration.as_secs(),
        "Account locked due to failed login attempts"
    );
}

fn log_account_unlocked(identifier: &str) {
    crate::security_event!(
        SecurityEvent::AccountUnlocked,
        identifier = %identifier,
        "Account unlocked"
    );
}
