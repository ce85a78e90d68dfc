//! crates/buildestimate_core/src/registry.rs
//!
//! Registry implementations that live in the core: an in-memory store and the
//! two-tier `FallbackRegistry` that backs reads with bundled seed data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    ConstructionDetails, Estimate, FloorConfig, KitchenType, Project, ProjectStatus, Role, User,
    UserCredentials, BUDGET_RANGES,
};
use crate::ports::{PortError, PortResult, RegistryService};

//=========================================================================================
// Seed data
//=========================================================================================

/// Demo accounts and the sample project shipped with the application.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub users: Vec<User>,
    pub projects: Vec<Project>,
}

impl SeedData {
    pub fn bundled() -> Self {
        let admin = User::restore(
            Uuid::from_u128(1),
            "Admin User".to_string(),
            "admin@example.com".to_string(),
            Role::Admin,
            true,
        );
        let customer = User::restore(
            Uuid::from_u128(2),
            "John Doe".to_string(),
            "customer@example.com".to_string(),
            Role::Customer,
            true,
        );
        let mut engineer = User::restore(
            Uuid::from_u128(3),
            "Eng. Sarah Smith".to_string(),
            "engineer@example.com".to_string(),
            Role::Engineer,
            true,
        );
        engineer.experience = Some(8);
        engineer.projects_done = Some(45);
        engineer.company_name = Some("Smith Structural Dynamics".to_string());

        let mut details = ConstructionDetails::from_parts(
            1,
            vec![FloorConfig {
                floor_number: 1,
                rooms: 3,
                bathrooms: 2,
                kitchen_type: KitchenType::WithChimney,
            }],
        );
        details.plot_area = 1500.0;
        details.parking = true;
        details.budget_range = BUDGET_RANGES[2].to_string();
        details.timeline_months = 7;
        details.notes = Some("Industrial style workshop house.".to_string());

        let now = Utc::now();
        let estimate = Estimate {
            engineer_id: engineer.id,
            engineer_name: engineer.name.clone(),
            material_cost: 2_800_000,
            labor_cost: 1_200_000,
            material_quality: None,
            token_percentage: None,
            token_amount: None,
            submitted_at: now,
            message: Some("Calculated based on heavy steel reinforcement requirements.".to_string()),
        };
        let project = Project::restore(
            Uuid::from_u128(0x832),
            customer.id,
            customer.name.clone(),
            details,
            ProjectStatus::Approved,
            now,
            vec![estimate],
            Vec::new(),
            0,
        );

        Self {
            users: vec![admin, customer, engineer],
            projects: vec![project],
        }
    }
}

/// Remote wins if it produced a non-empty collection; otherwise the seed is used.
pub fn prefer_remote<T: Clone>(remote: PortResult<Vec<T>>, seed: &[T], what: &str) -> Vec<T> {
    match remote {
        Ok(items) if !items.is_empty() => items,
        Ok(_) => seed.to_vec(),
        Err(e) => {
            warn!("Loading {} from the registry failed, serving seed data: {}", what, e);
            seed.to_vec()
        }
    }
}

/// Writes the seed users (all sharing `hashed_password`) and projects into an
/// empty primary store. Does nothing when the primary already holds users or
/// projects. Returns the number of records written.
pub async fn install_seed(
    registry: &dyn RegistryService,
    seed: &SeedData,
    hashed_password: &str,
) -> PortResult<usize> {
    if !registry.list_users().await?.is_empty() || !registry.list_projects().await?.is_empty() {
        return Ok(0);
    }
    for user in &seed.users {
        registry.create_user(user, hashed_password).await?;
    }
    for project in &seed.projects {
        registry.upsert_project(project).await?;
    }
    let written = seed.users.len() + seed.projects.len();
    info!("Installed {} seed records into an empty registry", written);
    Ok(written)
}

/// A keyed read that falls back to a seed record when the primary misses or fails.
fn prefer_remote_one<T: Clone>(
    remote: PortResult<T>,
    seed: Option<&T>,
    what: &str,
) -> PortResult<T> {
    match (remote, seed) {
        (Ok(item), _) => Ok(item),
        (Err(PortError::NotFound(_)), Some(item)) => Ok(item.clone()),
        (Err(e), Some(item)) => {
            warn!("Loading {} from the registry failed, serving seed data: {}", what, e);
            Ok(item.clone())
        }
        (Err(e), None) => Err(e),
    }
}

//=========================================================================================
// FallbackRegistry
//=========================================================================================

/// Wraps the primary registry; reads fall back to seed data. Writes,
/// credentials and sessions always go to the primary.
pub struct FallbackRegistry {
    primary: Arc<dyn RegistryService>,
    seed: SeedData,
}

impl FallbackRegistry {
    pub fn new(primary: Arc<dyn RegistryService>, seed: SeedData) -> Self {
        Self { primary, seed }
    }
}

#[async_trait]
impl RegistryService for FallbackRegistry {
    async fn create_user(&self, user: &User, hashed_password: &str) -> PortResult<()> {
        self.primary.create_user(user, hashed_password).await
    }

    async fn upsert_user(&self, user: &User) -> PortResult<()> {
        self.primary.upsert_user(user).await
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        prefer_remote_one(
            self.primary.get_user_by_id(user_id).await,
            self.seed.users.iter().find(|u| u.id == user_id),
            "user",
        )
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.primary.get_credentials_by_email(email).await
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        Ok(prefer_remote(self.primary.list_users().await, &self.seed.users, "users"))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.primary
            .create_auth_session(session_id, user_id, expires_at)
            .await
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.primary.validate_auth_session(session_id).await
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.primary.delete_auth_session(session_id).await
    }

    async fn upsert_project(&self, project: &Project) -> PortResult<()> {
        self.primary.upsert_project(project).await
    }

    async fn save_project(&self, project: &Project, expected_version: u32) -> PortResult<()> {
        self.primary.save_project(project, expected_version).await
    }

    async fn get_project_by_id(&self, project_id: Uuid) -> PortResult<Project> {
        prefer_remote_one(
            self.primary.get_project_by_id(project_id).await,
            self.seed.projects.iter().find(|p| p.id == project_id),
            "project",
        )
    }

    async fn list_projects(&self) -> PortResult<Vec<Project>> {
        Ok(prefer_remote(
            self.primary.list_projects().await,
            &self.seed.projects,
            "projects",
        ))
    }
}

//=========================================================================================
// InMemoryRegistry
//=========================================================================================

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    credentials: HashMap<String, UserCredentials>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    projects: HashMap<Uuid, Project>,
}

/// A process-local registry with the same semantics as the database adapter.
#[derive(Default)]
pub struct InMemoryRegistry {
    state: Mutex<MemoryState>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| PortError::Unexpected("registry lock poisoned".to_string()))
    }
}

#[async_trait]
impl RegistryService for InMemoryRegistry {
    async fn create_user(&self, user: &User, hashed_password: &str) -> PortResult<()> {
        let mut state = self.lock()?;
        if state.credentials.contains_key(&user.email) {
            return Err(PortError::Conflict(format!("email {} is already registered", user.email)));
        }
        state.credentials.insert(
            user.email.clone(),
            UserCredentials {
                user_id: user.id,
                email: user.email.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn upsert_user(&self, user: &User) -> PortResult<()> {
        self.lock()?.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.lock()?
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.lock()?
            .credentials
            .get(&email.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| PortError::NotFound("user not found".to_string()))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let mut users: Vec<User> = self.lock()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.lock()?
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.lock()?.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.lock()?.sessions.remove(session_id);
        Ok(())
    }

    async fn upsert_project(&self, project: &Project) -> PortResult<()> {
        self.lock()?.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn save_project(&self, project: &Project, expected_version: u32) -> PortResult<()> {
        let mut state = self.lock()?;
        let stored = state
            .projects
            .get(&project.id)
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", project.id)))?;
        if stored.version != expected_version {
            return Err(PortError::Conflict(format!(
                "project {} was modified concurrently",
                project.id
            )));
        }
        state.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project_by_id(&self, project_id: Uuid) -> PortResult<Project> {
        self.lock()?
            .projects
            .get(&project_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", project_id)))
    }

    async fn list_projects(&self) -> PortResult<Vec<Project>> {
        let mut projects: Vec<Project> = self.lock()?.projects.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenRegistry;

    #[async_trait]
    impl RegistryService for BrokenRegistry {
        async fn create_user(&self, _: &User, _: &str) -> PortResult<()> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn upsert_user(&self, _: &User) -> PortResult<()> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn get_user_by_id(&self, _: Uuid) -> PortResult<User> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn get_credentials_by_email(&self, _: &str) -> PortResult<UserCredentials> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn list_users(&self) -> PortResult<Vec<User>> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn create_auth_session(&self, _: &str, _: Uuid, _: DateTime<Utc>) -> PortResult<()> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn validate_auth_session(&self, _: &str) -> PortResult<Uuid> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn delete_auth_session(&self, _: &str) -> PortResult<()> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn upsert_project(&self, _: &Project) -> PortResult<()> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn save_project(&self, _: &Project, _: u32) -> PortResult<()> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn get_project_by_id(&self, _: Uuid) -> PortResult<Project> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn list_projects(&self) -> PortResult<Vec<Project>> {
            Err(PortError::Unexpected("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn empty_remote_serves_seed() {
        let registry = FallbackRegistry::new(Arc::new(InMemoryRegistry::new()), SeedData::bundled());
        let projects = registry.list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].accepted_estimate().unwrap().material_cost, 2_800_000);
        assert_eq!(registry.list_users().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failing_remote_serves_seed() {
        let registry = FallbackRegistry::new(Arc::new(BrokenRegistry), SeedData::bundled());
        assert_eq!(registry.list_users().await.unwrap().len(), 3);
        assert_eq!(registry.get_user_by_id(Uuid::from_u128(1)).await.unwrap().name, "Admin User");
        assert!(registry.get_user_by_id(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn listed_seed_project_can_be_fetched_by_id() {
        let registry = FallbackRegistry::new(Arc::new(InMemoryRegistry::new()), SeedData::bundled());
        let listed = registry.list_projects().await.unwrap();
        let fetched = registry.get_project_by_id(listed[0].id).await.unwrap();
        assert_eq!(fetched, listed[0]);
        assert!(matches!(
            registry.get_project_by_id(Uuid::new_v4()).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn seed_is_installed_into_an_empty_primary_only() {
        let primary = Arc::new(InMemoryRegistry::new());
        let seed = SeedData::bundled();
        assert_eq!(install_seed(&*primary, &seed, "hash").await.unwrap(), 4);

        let creds = primary.get_credentials_by_email("engineer@example.com").await.unwrap();
        assert_eq!(creds.user_id, Uuid::from_u128(3));
        assert_eq!(creds.hashed_password, "hash");
        let project = primary.get_project_by_id(Uuid::from_u128(0x832)).await.unwrap();
        primary.save_project(&project, project.version).await.unwrap();

        assert_eq!(install_seed(&*primary, &seed, "hash").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn non_empty_remote_wins() {
        let primary = Arc::new(InMemoryRegistry::new());
        let user = User::restore(Uuid::new_v4(), "Solo".to_string(), "solo@example.com".to_string(), Role::Customer, true);
        primary.upsert_user(&user).await.unwrap();
        let registry = FallbackRegistry::new(primary, SeedData::bundled());
        assert_eq!(registry.list_users().await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let registry = InMemoryRegistry::new();
        let mut project = SeedData::bundled().projects.remove(0);
        registry.upsert_project(&project).await.unwrap();

        project.version = 1;
        registry.save_project(&project, 0).await.unwrap();
        project.version = 2;
        let err = registry.save_project(&project, 0).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let registry = InMemoryRegistry::new();
        let a = User::restore(Uuid::new_v4(), "A".to_string(), "same@example.com".to_string(), Role::Customer, true);
        let b = User::restore(Uuid::new_v4(), "B".to_string(), "same@example.com".to_string(), Role::Customer, true);
        registry.create_user(&a, "hash").await.unwrap();
        assert!(matches!(registry.create_user(&b, "hash").await, Err(PortError::Conflict(_))));
    }
}
