//! # tutorhub
//!
//! Access-control core of the tutorhub tutoring platform.
//!
//! ## Features
//!
//! - **Credential Store**: users with Argon2id-hashed secrets, unique emails,
//!   in-memory or JSON-file backed
//! - **Credential Verifier**: constant-time verification that never reveals
//!   whether an account exists, with optional failed-login lockout
//! - **Role-Gated Router**: static role to section table; denied navigation
//!   redirects to the role's landing section
//! - **Session Context**: per-client identity and UI preferences with an
//!   explicit load/update/clear lifecycle
//! - **HTTP surface**: axum login and registration endpoints behind
//!   timeout, body limit, security header and CORS layers
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tutorhub::{CredentialStore, CredentialVerifier, Role};
//! use tutorhub::router::{can_access, Section};
//!
//! let store = Arc::new(CredentialStore::in_memory());
//! store.create("Jane", "Doe", "jane@example.com", "secret123", Role::Student)?;
//!
//! let verifier = CredentialVerifier::new(Arc::clone(&store));
//! let outcome = verifier.verify("jane@example.com", "secret123")?;
//!
//! assert!(can_access(outcome.role, Section::StudentDashboard));
//! assert!(!can_access(outcome.role, Section::AdminDashboard));
//! ```

mod config;
pub mod crypto;
pub mod dashboard;
pub mod error;
pub mod http;
mod layers;
pub mod login;
pub mod observability;
mod parse;
pub mod password;
pub mod role;
pub mod router;
pub mod session;
pub mod store;
pub mod validation;
pub mod verifier;

// Re-exports
pub use config::{TutorhubConfig, TutorhubConfigBuilder};
pub use dashboard::DashboardMetrics;
pub use error::{AccessError, AppError, ErrorConfig, ErrorKind};
pub use layers::HardenedRouter;
pub use login::{LockoutPolicy, LoginTracker};
pub use observability::{ObservabilityConfig, SecurityEvent};
pub use parse::{parse_duration, parse_size};
pub use password::{PasswordError, PasswordPolicy};
pub use role::Role;
pub use router::{Navigation, RouteState, Section};
pub use session::{Session, SessionContext, SessionUpdate};
pub use store::{CredentialStore, ProfileUpdate, User, UserView};
pub use verifier::{Authenticated, CredentialVerifier};
