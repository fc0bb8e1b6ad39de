//! Role-gated navigation
//!
//! A static table maps each [`Role`] to the application sections it may
//! reach. Navigation never fails: a denied request becomes a
//! [`Navigation::Redirected`] to the landing section of the caller's state.
//! Callers that need a typed error (HTTP guards, the CLI) use [`require`].
//!
//! ```text
//!                 sign-in (verifier ok)
//!   Anonymous ─────────────────────────▶ Student | Tutor | Administrator
//!       ▲                                          │
//!       └──────────────── logout ──────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AccessError;
use crate::observability::SecurityEvent;
use crate::role::Role;

// ============================================================================
// Sections
// ============================================================================

/// A navigable area of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    /// Anonymous landing page
    Login,
    /// Admin-only aggregation (dashboard metrics)
    AdminDashboard,
    /// Account administration
    UserManagement,
    StudentDashboard,
    TutorDashboard,
    Messages,
    Profile,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Login,
        Section::AdminDashboard,
        Section::UserManagement,
        Section::StudentDashboard,
        Section::TutorDashboard,
        Section::Messages,
        Section::Profile,
    ];

    /// Stable client-side path
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::AdminDashboard => "/admin",
            Self::UserManagement => "/admin/users",
            Self::StudentDashboard => "/student",
            Self::TutorDashboard => "/tutor",
            Self::Messages => "/messages",
            Self::Profile => "/profile",
        }
    }

    /// Section at an exact path
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        Self::ALL.into_iter().find(|s| s.path() == path)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Accepts a path (`/admin/users`) or a kebab-case name (`user-management`)
impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(section) = Self::from_path(s) {
            return Ok(section);
        }
        match s {
            "login" => Ok(Self::Login),
            "admin-dashboard" => Ok(Self::AdminDashboard),
            "user-management" => Ok(Self::UserManagement),
            "student-dashboard" => Ok(Self::StudentDashboard),
            "tutor-dashboard" => Ok(Self::TutorDashboard),
            "messages" => Ok(Self::Messages),
            "profile" => Ok(Self::Profile),
            other => Err(format!("unknown section {:?}", other)),
        }
    }
}

// ============================================================================
// Access Table
// ============================================================================

/// Sections reachable by an authenticated role
pub fn allowed_sections(role: Role) -> &'static [Section] {
    match role {
        Role::Administrator => &[
            Section::AdminDashboard,
            Section::UserManagement,
            Section::Messages,
            Section::Profile,
        ],
        Role::Student => &[Section::StudentDashboard, Section::Messages, Section::Profile],
        Role::Tutor => &[Section::TutorDashboard, Section::Messages, Section::Profile],
    }
}

/// Whether `role` may open `section`
pub fn can_access(role: Role, section: Section) -> bool {
    allowed_sections(role).contains(&section)
}

/// Landing section after sign-in, and the redirect target on denial
pub fn default_section(role: Role) -> Section {
    match role {
        Role::Administrator => Section::AdminDashboard,
        Role::Student => Section::StudentDashboard,
        Role::Tutor => Section::TutorDashboard,
    }
}

/// Typed form of [`can_access`]
pub fn require(role: Role, section: Section) -> Result<(), AccessError> {
    if can_access(role, section) {
        Ok(())
    } else {
        Err(AccessError::UnauthorizedSection { role, section })
    }
}

// ============================================================================
// Navigation
// ============================================================================

/// Who is navigating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RouteState {
    #[default]
    Anonymous,
    Student,
    Tutor,
    Administrator,
}

impl RouteState {
    /// Role of an authenticated state
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Student => Some(Role::Student),
            Self::Tutor => Some(Role::Tutor),
            Self::Administrator => Some(Role::Administrator),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role().is_some()
    }

    /// Where this state lands and where denials redirect to
    pub fn landing(&self) -> Section {
        match self.role() {
            Some(role) => default_section(role),
            None => Section::Login,
        }
    }

    /// Whether this state may open `section`
    pub fn can_access(&self, section: Section) -> bool {
        match self.role() {
            Some(role) => can_access(role, section),
            None => section == Section::Login,
        }
    }
}

impl From<Role> for RouteState {
    fn from(role: Role) -> Self {
        match role {
            Role::Administrator => Self::Administrator,
            Role::Student => Self::Student,
            Role::Tutor => Self::Tutor,
        }
    }
}

impl From<Option<Role>> for RouteState {
    fn from(role: Option<Role>) -> Self {
        role.map(Self::from).unwrap_or_default()
    }
}

/// Result of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Allowed(Section),
    Redirected { requested: Section, to: Section },
}

impl Navigation {
    /// The section actually shown
    pub fn destination(&self) -> Section {
        match self {
            Self::Allowed(section) => *section,
            Self::Redirected { to, .. } => *to,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirected { .. })
    }
}

/// Resolve a navigation request; denial redirects to the state's landing
pub fn navigate(state: RouteState, section: Section) -> Navigation {
    if state.can_access(section) {
        crate::security_event!(
            SecurityEvent::AccessGranted,
            state = ?state,
            section = %section,
            "Navigation allowed"
        );
        return Navigation::Allowed(section);
    }

    let to = state.landing();
    // Signed-in users opening the login page are just sent home.
    if section != Section::Login {
        crate::security_event!(
            SecurityEvent::AccessDenied,
            state = ?state,
            section = %section,
            redirect = %to,
            "Navigation denied"
        );
    }
    Navigation::Redirected {
        requested: section,
        to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_round_trip() {
        for section in Section::ALL {
            assert_eq!(Section::from_path(section.path()), Some(section));
            assert_eq!(section.path().parse::<Section>().unwrap(), section);
        }
        assert_eq!(Section::from_path("/admin/"), Some(Section::AdminDashboard));
        assert_eq!("user-management".parse::<Section>().unwrap(), Section::UserManagement);
        assert!("/billing".parse::<Section>().is_err());
    }

    #[test]
    fn test_access_table() {
        assert!(can_access(Role::Administrator, Section::AdminDashboard));
        assert!(can_access(Role::Administrator, Section::UserManagement));
        assert!(can_access(Role::Student, Section::StudentDashboard));
        assert!(can_access(Role::Tutor, Section::TutorDashboard));

        for role in Role::ALL {
            assert!(can_access(role, Section::Messages));
            assert!(can_access(role, Section::Profile));
            assert!(!can_access(role, Section::Login));
        }
    }

    #[test]
    fn test_no_cross_role_dashboards() {
        assert!(!can_access(Role::Student, Section::TutorDashboard));
        assert!(!can_access(Role::Tutor, Section::StudentDashboard));
        assert!(!can_access(Role::Administrator, Section::StudentDashboard));
        assert!(!can_access(Role::Administrator, Section::TutorDashboard));
        for role in [Role::Student, Role::Tutor] {
            assert!(!can_access(role, Section::AdminDashboard));
            assert!(!can_access(role, Section::UserManagement));
        }
    }

    #[test]
    fn test_every_denial_redirects_to_default() {
        for role in Role::ALL {
            let state = RouteState::from(role);
            assert!(can_access(role, default_section(role)));

            for section in Section::ALL {
                let nav = navigate(state, section);
                if can_access(role, section) {
                    assert_eq!(nav, Navigation::Allowed(section));
                    assert!(require(role, section).is_ok());
                } else {
                    assert_eq!(
                        nav,
                        Navigation::Redirected {
                            requested: section,
                            to: default_section(role),
                        }
                    );
                    assert!(matches!(
                        require(role, section),
                        Err(AccessError::UnauthorizedSection { role: r, section: s })
                            if r == role && s == section
                    ));
                }
            }
        }
    }

    #[test]
    fn test_anonymous_only_reaches_login() {
        let state = RouteState::Anonymous;
        assert_eq!(navigate(state, Section::Login), Navigation::Allowed(Section::Login));

        for section in Section::ALL.into_iter().filter(|s| *s != Section::Login) {
            let nav = navigate(state, section);
            assert!(nav.is_redirect());
            assert_eq!(nav.destination(), Section::Login);
        }
    }

    #[test]
    fn test_route_state_from_role() {
        assert_eq!(RouteState::from(None), RouteState::Anonymous);
        assert_eq!(RouteState::from(Some(Role::Tutor)), RouteState::Tutor);
        assert_eq!(RouteState::Administrator.role(), Some(Role::Administrator));
        assert!(!RouteState::Anonymous.is_authenticated());
        assert_eq!(RouteState::Student.landing(), Section::StudentDashboard);
    }

    #[test]
    fn test_unauthorized_message() {
        let err = require(Role::Student, Section::AdminDashboard).unwrap_err();
        assert_eq!(err.to_string(), "role student may not access /admin");
    }
}
