//! Credential store
//!
//! Durable mapping from email to [`User`]. Secrets are hashed before any lock
//! is taken; the uniqueness check and the insert then happen under a single
//! write lock, so two concurrent creates with the same email can never both
//! succeed.
//!
//! Two backends share the same code path:
//!
//! - in-memory, for tests and throwaway servers
//! - a JSON file, rewritten through a temporary sibling and an atomic rename
//!
//! A file-backed store holds an exclusive advisory lock on a `.lock` sibling
//! for as long as the handle lives. A second handle on the same file, in this
//! process or another, fails with [`AccessError::StoreLocked`] instead of
//! working from its own stale copy.
//!
//! Every mutation builds the next user list, persists it, and only then
//! swaps it in, so a failed write leaves memory and disk in agreement.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dashboard::DashboardMetrics;
use crate::error::AccessError;
use crate::observability::SecurityEvent;
use crate::password::{hash_secret, PasswordPolicy};
use crate::role::Role;
use crate::validation::{normalize_email, validate_email, validate_name};

// ============================================================================
// Records
// ============================================================================

/// A stored account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier (UUID v4)
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Normalized email, unique across the store
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public projection without the password hash
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// What a user looks like outside the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Partial profile change; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

#[derive(Deserialize)]
struct StoreFile {
    users: Vec<StoredUser>,
}

/// On-disk record; the role stays a string until it is checked
#[derive(Deserialize)]
struct StoredUser {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StoredUser> for User {
    type Error = AccessError;

    fn try_from(raw: StoredUser) -> Result<Self, Self::Error> {
        Ok(Self {
            role: raw.role.parse()?,
            id: raw.id,
            first_name: raw.first_name,
            last_name: raw.last_name,
            email: raw.email,
            password_hash: raw.password_hash,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        })
    }
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    users: &'a [User],
}

#[derive(Debug)]
enum Backend {
    Memory,
    File {
        path: PathBuf,
        /// Released when the store is dropped
        _lock: fs::File,
    },
}

// ============================================================================
// Credential Store
// ============================================================================

/// Thread-safe user repository
#[derive(Debug)]
pub struct CredentialStore {
    users: RwLock<Vec<User>>,
    backend: Backend,
    policy: PasswordPolicy,
}

impl CredentialStore {
    /// Empty in-memory store with the default password policy
    pub fn in_memory() -> Self {
        Self::in_memory_with_policy(PasswordPolicy::default())
    }

    /// Empty in-memory store with a custom password policy
    pub fn in_memory_with_policy(policy: PasswordPolicy) -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            backend: Backend::Memory,
            policy,
        }
    }

    /// Open a file-backed store, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// - [`AccessError::StoreLocked`] while another handle holds the file
    /// - [`AccessError::UnknownRole`] for a record whose role is outside the
    ///   closed set
    /// - [`AccessError::DuplicateEmail`] when two records share an email
    /// - [`AccessError::Io`] / [`AccessError::Json`] for unreadable or
    ///   malformed files
    pub fn open(path: impl AsRef<Path>, policy: PasswordPolicy) -> Result<Self, AccessError> {
        let path = path.as_ref().to_path_buf();
        let lock = acquire_lock(&path)?;

        let users = match fs::read(&path) {
            Ok(bytes) => {
                let file: StoreFile =
                    serde_json::from_slice(&bytes).map_err(|source| AccessError::Json {
                        path: path.clone(),
                        source,
                    })?;
                let users = file
                    .users
                    .into_iter()
                    .map(User::try_from)
                    .collect::<Result<Vec<_>, _>>()
                    .inspect_err(|e| {
                        tracing::error!(
                            path = %path.display(),
                            error = %e,
                            "Credential store holds an invalid record"
                        );
                    })?;
                check_unique(&users)?;
                users
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(AccessError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), users = users.len(), "Credential store opened");

        Ok(Self {
            users: RwLock::new(users),
            backend: Backend::File { path, _lock: lock },
            policy,
        })
    }

    /// The policy applied to new secrets
    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Memory => None,
            Backend::File { path, .. } => Some(path),
        }
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Exact match on the normalized email
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        self.users.read().iter().find(|u| u.email == email).cloned()
    }

    pub fn find_by_id(&self, id: &str) -> Option<User> {
        self.users.read().iter().find(|u| u.id == id).cloned()
    }

    /// All users, oldest first
    pub fn list(&self) -> Vec<User> {
        self.users.read().clone()
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Validation`] for empty names or a malformed email
    /// - [`AccessError::WeakSecret`] when the policy rejects the secret
    /// - [`AccessError::DuplicateEmail`] when the email is taken
    pub fn create(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        secret: &str,
        role: Role,
    ) -> Result<User, AccessError> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        let email = normalize_email(email);

        validate_name(first_name, "first_name")?;
        validate_name(last_name, "last_name")?;
        validate_email(&email)?;
        self.policy
            .validate_with_context(secret, &[first_name, last_name], Some(email.as_str()))?;

        let password_hash = hash_secret(secret)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        };

        let mut users = self.users.write();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AccessError::DuplicateEmail { email: user.email });
        }

        let mut next = users.clone();
        next.push(user.clone());
        self.persist(&next)?;
        *users = next;
        drop(users);

        crate::security_event!(
            SecurityEvent::UserRegistered,
            user_id = %user.id,
            role = %user.role,
            "User registered"
        );

        Ok(user)
    }

    /// Change names and/or email of an existing account
    pub fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<User, AccessError> {
        let first_name = update.first_name.as_deref().map(str::trim);
        let last_name = update.last_name.as_deref().map(str::trim);
        let email = update.email.as_deref().map(normalize_email);

        if let Some(name) = first_name {
            validate_name(name, "first_name")?;
        }
        if let Some(name) = last_name {
            validate_name(name, "last_name")?;
        }
        if let Some(email) = &email {
            validate_email(email)?;
        }

        let mut users = self.users.write();
        let index = position(&users, id)?;

        if let Some(email) = &email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AccessError::DuplicateEmail {
                    email: email.clone(),
                });
            }
        }

        let mut next = users.clone();
        let user = &mut next[index];
        if let Some(name) = first_name {
            user.first_name = name.to_string();
        }
        if let Some(name) = last_name {
            user.last_name = name.to_string();
        }
        if let Some(email) = email {
            user.email = email;
        }
        user.updated_at = Utc::now();
        let updated = user.clone();

        self.persist(&next)?;
        *users = next;
        drop(users);

        crate::security_event!(
            SecurityEvent::UserModified,
            user_id = %updated.id,
            "User profile updated"
        );

        Ok(updated)
    }

    /// Replace the secret; the new hash gets a fresh salt
    pub fn update_password(&self, id: &str, new_secret: &str) -> Result<User, AccessError> {
        let current = self
            .find_by_id(id)
            .ok_or_else(|| AccessError::NotFound(id.to_string()))?;
        self.policy.validate_with_context(
            new_secret,
            &[current.first_name.as_str(), current.last_name.as_str()],
            Some(current.email.as_str()),
        )?;

        let password_hash = hash_secret(new_secret)?;

        let mut users = self.users.write();
        // The account may have been deleted while hashing.
        let index = position(&users, id)?;

        let mut next = users.clone();
        next[index].password_hash = password_hash;
        next[index].updated_at = Utc::now();
        let updated = next[index].clone();

        self.persist(&next)?;
        *users = next;
        drop(users);

        crate::security_event!(
            SecurityEvent::PasswordChanged,
            user_id = %updated.id,
            "Password changed"
        );

        Ok(updated)
    }

    /// Administrative deletion
    pub fn delete(&self, id: &str) -> Result<(), AccessError> {
        let mut users = self.users.write();
        let index = position(&users, id)?;

        let mut next = users.clone();
        let removed = next.remove(index);

        self.persist(&next)?;
        *users = next;
        drop(users);

        crate::security_event!(
            SecurityEvent::UserDeleted,
            user_id = %removed.id,
            role = %removed.role,
            "User deleted"
        );

        Ok(())
    }

    /// Aggregates for the admin dashboard
    pub fn dashboard_metrics(&self, recent: usize) -> DashboardMetrics {
        DashboardMetrics::from_users(&self.users.read(), recent)
    }

    fn persist(&self, users: &[User]) -> Result<(), AccessError> {
        match &self.backend {
            Backend::Memory => Ok(()),
            Backend::File { path, .. } => write_json_atomically(path, &StoreFileRef { users }),
        }
    }
}

/// Exclusive lock on `<path>.lock`, held by the returned file.
///
/// The data file itself is replaced on every write, so the lock lives on a
/// sibling that is never renamed.
fn acquire_lock(path: &Path) -> Result<fs::File, AccessError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AccessError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut lock_name = path.as_os_str().to_owned();
    lock_name.push(".lock");
    let lock_path = PathBuf::from(lock_name);

    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|source| AccessError::Io {
            path: lock_path.clone(),
            source,
        })?;

    file.try_lock_exclusive().map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Credential store is already open");
        AccessError::StoreLocked {
            path: path.to_path_buf(),
        }
    })?;

    Ok(file)
}

fn position(users: &[User], id: &str) -> Result<usize, AccessError> {
    users
        .iter()
        .position(|u| u.id == id)
        .ok_or_else(|| AccessError::NotFound(id.to_string()))
}

fn check_unique(users: &[User]) -> Result<(), AccessError> {
    let mut seen = HashSet::new();
    for user in users {
        if !seen.insert(user.email.as_str()) {
            return Err(AccessError::DuplicateEmail {
                email: user.email.clone(),
            });
        }
    }
    Ok(())
}

/// Serialize `value` as pretty JSON and replace `path` with it atomically.
///
/// Writes a `.tmp` sibling, syncs it, then renames it over the target.
pub(crate) fn write_json_atomically<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), AccessError> {
    let io_err = |source: std::io::Error| AccessError::Io {
        path: path.to_path_buf(),
        source,
    };

    let body = serde_json::to_vec_pretty(value).map_err(|source| AccessError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(&body).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;

    Ok(())
}
