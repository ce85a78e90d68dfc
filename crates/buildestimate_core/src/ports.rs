//! crates/buildestimate_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{CostTier, Project, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicting update: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The persistence collaborator holding users and projects.
#[async_trait]
pub trait RegistryService: Send + Sync {
    // --- User Management ---
    /// Inserts a new user together with their credentials.
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, user: &User, hashed_password: &str) -> PortResult<()>;

    /// Insert-or-replace on `id`.
    async fn upsert_user(&self, user: &User) -> PortResult<()>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn list_users(&self) -> PortResult<Vec<User>>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Project Management ---
    /// Insert-or-replace on `id`, no version check.
    async fn upsert_project(&self, project: &Project) -> PortResult<()>;

    /// Replaces the stored project only if its stored version still equals
    /// `expected_version`; otherwise fails with `Conflict`.
    async fn save_project(&self, project: &Project, expected_version: u32) -> PortResult<()>;

    async fn get_project_by_id(&self, project_id: Uuid) -> PortResult<Project>;

    /// All projects, newest first.
    async fn list_projects(&self) -> PortResult<Vec<Project>>;
}

#[async_trait]
pub trait CostEstimationService: Send + Sync {
    /// Asks the generative service for cost tiers described by `prompt`.
    async fn generate_cost_tiers(&self, prompt: &str) -> PortResult<Vec<CostTier>>;

    /// Free-text answer to `question` under a fixed system instruction.
    async fn answer_site_question(&self, system_instruction: &str, question: &str) -> PortResult<String>;
}

#[async_trait]
pub trait LayoutGenerationService: Send + Sync {
    /// Generates one floor-plan image and returns it as a data URL.
    async fn generate_layout(&self, prompt: &str, aspect_ratio: &str) -> PortResult<String>;
}
