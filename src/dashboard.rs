//! Admin dashboard aggregates

use serde::Serialize;

use crate::role::Role;
use crate::store::{User, UserView};

/// Account counts and newest sign-ups shown on the admin dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_users: usize,
    pub administrators: usize,
    pub students: usize,
    pub tutors: usize,
    /// Newest accounts first
    pub recent_users: Vec<UserView>,
}

impl DashboardMetrics {
    /// Aggregate `users` (in creation order), keeping the `recent` newest
    pub fn from_users(users: &[User], recent: usize) -> Self {
        let mut administrators = 0;
        let mut students = 0;
        let mut tutors = 0;
        for user in users {
            match user.role {
                Role::Administrator => administrators += 1,
                Role::Student => students += 1,
                Role::Tutor => tutors += 1,
            }
        }

        let mut newest: Vec<&User> = users.iter().rev().collect();
        // Stable: equal timestamps keep reverse insertion order.
        newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Self {
            total_users: users.len(),
            administrators,
            students,
            tutors,
            recent_users: newest.into_iter().take(recent).map(User::view).collect(),
        }
    }

    /// Count for a single role
    pub fn count(&self, role: Role) -> usize {
        match role {
            Role::Administrator => self.administrators,
            Role::Student => self.students,
            Role::Tutor => self.tutors,
        }
    }
}
