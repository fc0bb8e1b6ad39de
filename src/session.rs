//! Client session context
//!
//! A [`SessionContext`] is the per-client record of who is signed in and
//! which UI preferences are active. It is passed explicitly to whatever needs
//! it; there is no process-global session.
//!
//! Lifecycle:
//!
//! - [`SessionContext::load`] reads the theme and language from durable
//!   storage. Authentication is never restored; every load starts anonymous.
//! - [`SessionContext::update`] merges a partial preference change and writes
//!   the changed keys back immediately.
//! - [`SessionContext::clear`] signs out. Preferences survive.
//!
//! Preferences live under two independent keys, `theme` (`light`/`dark`) and
//! `language` (`en`/`vi`), as plain strings.
//!
//! # Usage
//!
//! ```ignore
//! use tutorhub::session::{FilePreferenceStorage, SessionContext, SessionUpdate, Language};
//!
//! let storage = FilePreferenceStorage::open("prefs.json")?;
//! let mut ctx = SessionContext::load(storage)?;
//!
//! ctx.authenticate(&verifier, "jane@example.com", "secret123")?;
//! ctx.update(SessionUpdate::new().language(Language::Vi))?;
//! ctx.clear();
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::AccessError;
use crate::observability::SecurityEvent;
use crate::role::Role;
use crate::router::{self, Navigation, RouteState, Section};
use crate::store::write_json_atomically;
use crate::verifier::{Authenticated, CredentialVerifier};

/// Storage key of the theme preference
pub const THEME_KEY: &str = "theme";

/// Storage key of the language preference
pub const LANGUAGE_KEY: &str = "language";

// ============================================================================
// Preferences
// ============================================================================

/// UI colour scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme {:?}", other)),
        }
    }
}

/// UI language tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Vi,
}

impl Language {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Vi => "vi",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "vi" => Ok(Self::Vi),
            other => Err(format!("unknown language {:?}", other)),
        }
    }
}

/// Active UI preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Preferences {
    pub language: Language,
    pub theme: Theme,
}

// ============================================================================
// Session
// ============================================================================

/// Signed-in user of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl From<Authenticated> for Identity {
    fn from(auth: Authenticated) -> Self {
        Self {
            user_id: auth.user_id,
            role: auth.role,
        }
    }
}

/// Snapshot of a client's state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Session {
    /// `None` while anonymous
    pub identity: Option<Identity>,
    pub preferences: Preferences,
}

impl Session {
    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|i| i.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn route_state(&self) -> RouteState {
        RouteState::from(self.role())
    }
}

/// Partial preference change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub language: Option<Language>,
    pub theme: Option<Theme>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }
}

// ============================================================================
// Durable Storage
// ============================================================================

/// Key/value storage for preferences
pub trait PreferenceStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AccessError>;

    /// Write every entry durably before returning.
    ///
    /// All or nothing: on error no entry may be visible to later reads.
    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), AccessError>;
}

/// Volatile storage; counts writes so callers can observe them
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStorage {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryPreferenceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set_many` calls so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PreferenceStorage for MemoryPreferenceStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AccessError> {
        Ok(self.values.get(key).cloned())
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), AccessError> {
        for (key, value) in entries {
            self.values.insert(key.to_string(), value.to_string());
        }
        self.writes += 1;
        Ok(())
    }
}

/// JSON object on disk, rewritten atomically on every `set_many`
#[derive(Debug, Clone)]
pub struct FilePreferenceStorage {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferenceStorage {
    /// Open or start an empty preference file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AccessError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| AccessError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(AccessError::Io { path, source }),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStorage for FilePreferenceStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AccessError> {
        Ok(self.values.get(key).cloned())
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), AccessError> {
        let mut next = self.values.clone();
        for (key, value) in entries {
            next.insert(key.to_string(), value.to_string());
        }
        write_json_atomically(&self.path, &next)?;
        self.values = next;
        Ok(())
    }
}

// ============================================================================
// Session Context
// ============================================================================

/// Per-client session with explicit persistence
#[derive(Debug)]
pub struct SessionContext<P: PreferenceStorage> {
    storage: P,
    session: Session,
}

impl<P: PreferenceStorage> SessionContext<P> {
    /// Start an anonymous session with the persisted preferences.
    ///
    /// Missing keys use defaults; unrecognized values are logged and
    /// replaced by defaults.
    pub fn load(storage: P) -> Result<Self, AccessError> {
        let preferences = Preferences {
            language: read_pref(&storage, LANGUAGE_KEY)?,
            theme: read_pref(&storage, THEME_KEY)?,
        };

        Ok(Self {
            storage,
            session: Session {
                identity: None,
                preferences,
            },
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn storage(&self) -> &P {
        &self.storage
    }

    /// Merge a preference change, persisting only fields that differ.
    ///
    /// Changed fields are written in one storage call; if it fails, neither
    /// the storage nor the session changes.
    pub fn update(&mut self, update: SessionUpdate) -> Result<Session, AccessError> {
        let current = self.session.preferences;
        let language = update.language.filter(|l| *l != current.language);
        let theme = update.theme.filter(|t| *t != current.theme);

        let mut entries = Vec::with_capacity(2);
        if let Some(language) = language {
            entries.push((LANGUAGE_KEY, language.tag()));
        }
        if let Some(theme) = theme {
            entries.push((THEME_KEY, theme.as_str()));
        }

        if !entries.is_empty() {
            self.storage.set_many(&entries)?;
            self.session.preferences = Preferences {
                language: language.unwrap_or(current.language),
                theme: theme.unwrap_or(current.theme),
            };

            crate::security_event!(
                SecurityEvent::PreferencesChanged,
                language = %self.session.preferences.language,
                theme = %self.session.preferences.theme,
                "Preferences updated"
            );
        }

        Ok(self.session.clone())
    }

    /// Attach a verified identity
    pub fn sign_in(&mut self, auth: Authenticated) -> &Session {
        let identity = Identity::from(auth);
        crate::security_event!(
            SecurityEvent::SessionCreated,
            user_id = %identity.user_id,
            role = %identity.role,
            "Session signed in"
        );
        self.session.identity = Some(identity);
        &self.session
    }

    /// Verify credentials and sign in; any failure leaves the session anonymous
    pub fn authenticate(
        &mut self,
        verifier: &CredentialVerifier,
        identifier: &str,
        secret: &str,
    ) -> Result<&Session, AccessError> {
        match verifier.verify(identifier, secret) {
            Ok(auth) => Ok(self.sign_in(auth)),
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// Sign out; preferences are kept
    pub fn clear(&mut self) {
        if let Some(identity) = self.session.identity.take() {
            crate::security_event!(
                SecurityEvent::SessionDestroyed,
                user_id = %identity.user_id,
                "Session cleared"
            );
        }
    }

    /// Resolve navigation for the current state
    pub fn navigate(&self, section: Section) -> Navigation {
        router::navigate(self.session.route_state(), section)
    }
}

fn read_pref<P, T>(storage: &P, key: &str) -> Result<T, AccessError>
where
    P: PreferenceStorage,
    T: FromStr<Err = String> + Default,
{
    let Some(raw) = storage.get(key)? else {
        return Ok(T::default());
    };
    Ok(raw.parse().unwrap_or_else(|e: String| {
        tracing::warn!(key, value = %raw, error = %e, "Ignoring stored preference");
        T::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CredentialStore;
    use std::sync::Arc;

    fn verifier_with_jane() -> CredentialVerifier {
        let store = Arc::new(CredentialStore::in_memory());
        store
            .create("Jane", "Doe", "jane@example.com", "secret123", Role::Tutor)
            .unwrap();
        CredentialVerifier::new(store)
    }

    #[test]
    fn test_load_defaults() {
        let ctx = SessionContext::load(MemoryPreferenceStorage::new()).unwrap();
        assert_eq!(ctx.session(), &Session::default());
        assert_eq!(ctx.session().preferences.theme, Theme::Light);
        assert_eq!(ctx.session().preferences.language, Language::En);
        assert!(!ctx.session().is_authenticated());
    }

    #[test]
    fn test_load_persisted_preferences() {
        let mut storage = MemoryPreferenceStorage::new();
        storage
            .set_many(&[(THEME_KEY, "dark"), (LANGUAGE_KEY, "vi")])
            .unwrap();

        let ctx = SessionContext::load(storage).unwrap();
        assert_eq!(ctx.session().preferences.theme, Theme::Dark);
        assert_eq!(ctx.session().preferences.language, Language::Vi);
    }

    #[test]
    fn test_unknown_stored_values_fall_back() {
        let mut storage = MemoryPreferenceStorage::new();
        storage
            .set_many(&[(THEME_KEY, "sepia"), (LANGUAGE_KEY, "fr")])
            .unwrap();

        let ctx = SessionContext::load(storage).unwrap();
        assert_eq!(ctx.session().preferences, Preferences::default());
    }

    #[test]
    fn test_update_writes_changed_keys() {
        let mut ctx = SessionContext::load(MemoryPreferenceStorage::new()).unwrap();

        let session = ctx
            .update(SessionUpdate::new().language(Language::Vi).theme(Theme::Light))
            .unwrap();
        assert_eq!(session.preferences.language, Language::Vi);
        // Theme was already light.
        assert_eq!(ctx.storage().writes(), 1);
        assert_eq!(ctx.storage().get(LANGUAGE_KEY).unwrap().as_deref(), Some("vi"));
        assert_eq!(ctx.storage().get(THEME_KEY).unwrap(), None);
    }

    /// Accepts language writes, rejects any batch touching the theme
    struct ThemeRejectingStorage(MemoryPreferenceStorage);

    impl PreferenceStorage for ThemeRejectingStorage {
        fn get(&self, key: &str) -> Result<Option<String>, AccessError> {
            self.0.get(key)
        }

        fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), AccessError> {
            if entries.iter().any(|(key, _)| *key == THEME_KEY) {
                return Err(AccessError::Io {
                    path: PathBuf::from("prefs.json"),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.0.set_many(entries)
        }
    }

    #[test]
    fn test_failed_update_persists_nothing() {
        let mut ctx =
            SessionContext::load(ThemeRejectingStorage(MemoryPreferenceStorage::new())).unwrap();

        let err = ctx
            .update(SessionUpdate::new().language(Language::Vi).theme(Theme::Dark))
            .unwrap_err();
        assert!(matches!(err, AccessError::Io { .. }));
        assert_eq!(ctx.session().preferences, Preferences::default());
        assert_eq!(ctx.storage().get(LANGUAGE_KEY).unwrap(), None);
        assert_eq!(ctx.storage().0.writes(), 0);

        // A language-only change still goes through.
        ctx.update(SessionUpdate::new().language(Language::Vi)).unwrap();
        assert_eq!(ctx.session().preferences.language, Language::Vi);
        assert_eq!(ctx.storage().get(LANGUAGE_KEY).unwrap().as_deref(), Some("vi"));
    }

    #[test]
    fn test_two_field_update_is_one_write() {
        let mut ctx = SessionContext::load(MemoryPreferenceStorage::new()).unwrap();
        ctx.update(SessionUpdate::new().language(Language::Vi).theme(Theme::Dark))
            .unwrap();
        assert_eq!(ctx.storage().writes(), 1);
        assert_eq!(ctx.storage().get(THEME_KEY).unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut once = SessionContext::load(MemoryPreferenceStorage::new()).unwrap();
        let mut twice = SessionContext::load(MemoryPreferenceStorage::new()).unwrap();
        let update = SessionUpdate::new().language(Language::Vi);

        let a = once.update(update).unwrap();
        twice.update(update).unwrap();
        let b = twice.update(update).unwrap();

        assert_eq!(a, b);
        assert_eq!(
            once.storage().get(LANGUAGE_KEY).unwrap(),
            twice.storage().get(LANGUAGE_KEY).unwrap()
        );
        assert_eq!(twice.storage().writes(), 1);
    }

    #[test]
    fn test_authenticate_and_clear() {
        let verifier = verifier_with_jane();
        let mut ctx = SessionContext::load(MemoryPreferenceStorage::new()).unwrap();
        ctx.update(SessionUpdate::new().theme(Theme::Dark)).unwrap();

        let session = ctx
            .authenticate(&verifier, "jane@example.com", "secret123")
            .unwrap();
        assert_eq!(session.role(), Some(Role::Tutor));
        assert_eq!(ctx.navigate(Section::Login).destination(), Section::TutorDashboard);

        ctx.clear();
        assert!(!ctx.session().is_authenticated());
        assert_eq!(ctx.session().preferences.theme, Theme::Dark);
        assert_eq!(ctx.navigate(Section::Profile).destination(), Section::Login);
    }

    #[test]
    fn test_failed_authentication_clears_identity() {
        let verifier = verifier_with_jane();
        let mut ctx = SessionContext::load(MemoryPreferenceStorage::new()).unwrap();

        ctx.authenticate(&verifier, "jane@example.com", "secret123")
            .unwrap();
        assert!(ctx.session().is_authenticated());

        let err = ctx
            .authenticate(&verifier, "jane@example.com", "wrong")
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidCredentials));
        assert!(!ctx.session().is_authenticated());
    }

    #[test]
    fn test_file_storage_survives_reload_without_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let verifier = verifier_with_jane();

        {
            let storage = FilePreferenceStorage::open(&path).unwrap();
            let mut ctx = SessionContext::load(storage).unwrap();
            ctx.authenticate(&verifier, "jane@example.com", "secret123")
                .unwrap();
            ctx.update(SessionUpdate::new().language(Language::Vi).theme(Theme::Dark))
                .unwrap();
        }

        let raw: BTreeMap<String, String> =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw.get("language").map(String::as_str), Some("vi"));
        assert_eq!(raw.get("theme").map(String::as_str), Some("dark"));

        let ctx = SessionContext::load(FilePreferenceStorage::open(&path).unwrap()).unwrap();
        assert_eq!(ctx.session().preferences.language, Language::Vi);
        assert_eq!(ctx.session().preferences.theme, Theme::Dark);
        assert!(!ctx.session().is_authenticated());
    }
}
