//! crates/buildestimate_core/src/session.rs
//!
//! The per-request session context and the role-specific dashboards.

use crate::domain::{Project, ProjectStatus, Role, User};

/// The authenticated actor of one request. Created by the auth layer and
/// passed explicitly to every operation.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user: User,
    pub auth_session_id: String,
}

impl SessionContext {
    pub fn new(user: User, auth_session_id: impl Into<String>) -> Self {
        Self {
            user,
            auth_session_id: auth_session_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerView {
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineerView {
    /// Shown until an admin verifies the engineer.
    PendingVerification,
    Active {
        /// Submitted projects waiting for a quote.
        open: Vec<Project>,
        /// Projects carrying this engineer's accepted quote.
        assigned: Vec<Project>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminStats {
    pub total_projects: usize,
    pub total_users: usize,
    pub pending_approvals: usize,
    pub verified_engineers: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminView {
    pub stats: AdminStats,
    pub pending_engineers: Vec<User>,
    pub engineers: Vec<User>,
    pub customers: Vec<User>,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Customer(CustomerView),
    Engineer(EngineerView),
    Admin(AdminView),
}

/// Builds the dashboard for `user` from the full user and project lists.
pub fn dashboard_for(user: &User, users: Vec<User>, projects: Vec<Project>) -> DashboardView {
    match user.role() {
        Role::Customer => DashboardView::Customer(CustomerView {
            projects: projects.into_iter().filter(|p| p.is_owned_by(user)).collect(),
        }),
        Role::Engineer if !user.is_approved => {
            DashboardView::Engineer(EngineerView::PendingVerification)
        }
        Role::Engineer => {
            let (open, rest): (Vec<_>, Vec<_>) = projects
                .into_iter()
                .partition(|p| p.status() == ProjectStatus::Submitted);
            let assigned = rest
                .into_iter()
                .filter(|p| p.accepted_estimate().is_some_and(|e| e.engineer_id == user.id))
                .collect();
            DashboardView::Engineer(EngineerView::Active { open, assigned })
        }
        Role::Admin => {
            let total_users = users.len();
            let (engineers, others): (Vec<_>, Vec<_>) =
                users.into_iter().partition(|u| u.role() == Role::Engineer);
            let customers: Vec<User> = others
                .into_iter()
                .filter(|u| u.role() == Role::Customer)
                .collect();
            let pending_engineers: Vec<User> =
                engineers.iter().filter(|e| !e.is_approved).cloned().collect();
            let stats = AdminStats {
                total_projects: projects.len(),
                total_users,
                pending_approvals: pending_engineers.len(),
                verified_engineers: engineers.len() - pending_engineers.len(),
            };
            DashboardView::Admin(AdminView {
                stats,
                pending_engineers,
                engineers,
                customers,
                projects,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SeedData;

    #[test]
    fn customer_sees_only_own_projects() {
        let seed = SeedData::bundled();
        let owner = seed.users[1].clone();
        let other = User::restore(uuid::Uuid::new_v4(), "X".into(), "x@example.com".into(), Role::Customer, true);

        match dashboard_for(&owner, seed.users.clone(), seed.projects.clone()) {
            DashboardView::Customer(view) => assert_eq!(view.projects.len(), 1),
            unexpected => panic!("unexpected view {:?}", unexpected),
        }
        match dashboard_for(&other, seed.users, seed.projects) {
            DashboardView::Customer(view) => assert!(view.projects.is_empty()),
            unexpected => panic!("unexpected view {:?}", unexpected),
        }
    }

    #[test]
    fn unapproved_engineer_gets_pending_view() {
        let seed = SeedData::bundled();
        let mut engineer = seed.users[2].clone();
        engineer.is_approved = false;
        assert_eq!(
            dashboard_for(&engineer, seed.users, seed.projects),
            DashboardView::Engineer(EngineerView::PendingVerification)
        );
    }

    #[test]
    fn approved_engineer_sees_assigned_projects() {
        let seed = SeedData::bundled();
        let engineer = seed.users[2].clone();
        match dashboard_for(&engineer, seed.users, seed.projects) {
            DashboardView::Engineer(EngineerView::Active { open, assigned }) => {
                assert!(open.is_empty());
                assert_eq!(assigned.len(), 1);
            }
            unexpected => panic!("unexpected view {:?}", unexpected),
        }
    }

    #[test]
    fn admin_counts_users_and_approvals() {
        let mut seed = SeedData::bundled();
        seed.users[2].is_approved = false;
        let admin = seed.users[0].clone();
        match dashboard_for(&admin, seed.users, seed.projects) {
            DashboardView::Admin(view) => {
                assert_eq!(view.stats.total_projects, 1);
                assert_eq!(view.stats.pending_approvals, 1);
                assert_eq!(view.stats.verified_engineers, 0);
                assert_eq!(view.customers.len(), 1);
            }
            unexpected => panic!("unexpected view {:?}", unexpected),
        }
    }
}
