//! Account roles
//!
//! The role set is closed: `administrator`, `student`, `tutor`. Every
//! decision point matches on [`Role`] exhaustively, so adding a role is a
//! compile-time-visible change. Parsing any other string is an
//! [`AccessError::UnknownRole`], never a silent default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AccessError;

/// Account category governing which application sections are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Platform administrator; the only role with the admin dashboard
    Administrator,
    /// Enrolled student
    Student,
    /// Tutor delivering lessons
    Tutor,
}

impl Role {
    /// All roles, in declaration order
    pub const ALL: [Role; 3] = [Role::Administrator, Role::Student, Role::Tutor];

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Student => "student",
            Self::Tutor => "tutor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrator" => Ok(Self::Administrator),
            "student" => Ok(Self::Student),
            "tutor" => Ok(Self::Tutor),
            other => Err(AccessError::UnknownRole(other.to_string())),
        }
    }
}

// Serialized through the wire name; unknown names fail to parse.
impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
