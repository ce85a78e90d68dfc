//! crates/buildestimate_core/src/marketplace.rs
//!
//! Application operations that combine the state machine with the registry.
//! Each operation takes the caller's `SessionContext` explicitly.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::chat::{self, MessageDraft};
use crate::domain::{ChatMessage, ConstructionDetails, LayoutOption, Project, Role, User};
use crate::error::{DomainError, DomainResult};
use crate::lifecycle::{self, QuoteRequest};
use crate::ports::RegistryService;
use crate::session::{dashboard_for, DashboardView, SessionContext};

/// Editable profile fields. Role and email are not editable.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
    pub experience: Option<u32>,
    pub projects_done: Option<u32>,
    pub company_name: Option<String>,
}

/// Keeps digits only, at most ten of them.
fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).take(10).collect()
}

#[derive(Clone)]
pub struct Marketplace {
    registry: Arc<dyn RegistryService>,
}

impl Marketplace {
    pub fn new(registry: Arc<dyn RegistryService>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn RegistryService> {
        &self.registry
    }

    pub async fn dashboard(&self, session: &SessionContext) -> DomainResult<DashboardView> {
        let projects = self.registry.list_projects().await?;
        let users = match session.user.role() {
            Role::Admin => self.registry.list_users().await?,
            _ => Vec::new(),
        };
        Ok(dashboard_for(&session.user, users, projects))
    }

    pub async fn submit_project(
        &self,
        session: &SessionContext,
        details: ConstructionDetails,
        selected_layout_url: Option<String>,
        layout_history: Vec<LayoutOption>,
    ) -> DomainResult<Project> {
        let project = lifecycle::submit(
            &session.user,
            details,
            selected_layout_url,
            layout_history,
            Utc::now(),
        )?;
        self.registry.upsert_project(&project).await?;
        info!("Project {} submitted by {}", project.id, session.user.id);
        Ok(project)
    }

    /// Loads a project the caller may see: its owner, any verified engineer, or an admin.
    pub async fn project_for(&self, session: &SessionContext, project_id: Uuid) -> DomainResult<Project> {
        let project = self.registry.get_project_by_id(project_id).await?;
        let user = &session.user;
        let visible = match user.role() {
            Role::Customer => project.is_owned_by(user),
            Role::Engineer => user.is_approved,
            Role::Admin => true,
        };
        if !visible {
            return Err(DomainError::Forbidden(format!(
                "project {} is not visible to this account",
                project_id
            )));
        }
        Ok(project)
    }

    pub async fn quote_project(
        &self,
        session: &SessionContext,
        project_id: Uuid,
        quote: QuoteRequest,
    ) -> DomainResult<Project> {
        let mut project = self.project_for(session, project_id).await?;
        let base_version = project.version;
        lifecycle::approve_with_quote(&mut project, &session.user, quote, Utc::now())?;
        self.registry.save_project(&project, base_version).await?;
        info!("Project {} approved by engineer {}", project.id, session.user.id);
        Ok(project)
    }

    pub async fn finalize_project(&self, session: &SessionContext, project_id: Uuid) -> DomainResult<Project> {
        let mut project = self.project_for(session, project_id).await?;
        let base_version = project.version;
        lifecycle::finalize(&mut project, &session.user)?;
        self.registry.save_project(&project, base_version).await?;
        info!("Project {} finalized", project.id);
        Ok(project)
    }

    pub async fn post_message(
        &self,
        session: &SessionContext,
        project_id: Uuid,
        draft: MessageDraft,
    ) -> DomainResult<ChatMessage> {
        let mut project = self.project_for(session, project_id).await?;
        let base_version = project.version;
        let message = chat::post(&mut project, &session.user, draft, Utc::now())?;
        self.registry.save_project(&project, base_version).await?;
        Ok(message)
    }

    pub async fn messages(&self, session: &SessionContext, project_id: Uuid) -> DomainResult<Vec<ChatMessage>> {
        let project = self.project_for(session, project_id).await?;
        if !chat::can_read(&project, &session.user) {
            return Err(DomainError::Forbidden(
                "only participants can read this thread".to_string(),
            ));
        }
        Ok(project.messages().to_vec())
    }

    /// Flips an engineer's verification flag. Admin only.
    pub async fn toggle_engineer_approval(&self, session: &SessionContext, engineer_id: Uuid) -> DomainResult<User> {
        if session.user.role() != Role::Admin {
            return Err(DomainError::Forbidden(
                "only admins can verify engineers".to_string(),
            ));
        }
        let mut engineer = self.registry.get_user_by_id(engineer_id).await?;
        if engineer.role() != Role::Engineer {
            return Err(DomainError::Validation(format!(
                "user {} is not an engineer",
                engineer_id
            )));
        }
        engineer.is_approved = !engineer.is_approved;
        self.registry.upsert_user(&engineer).await?;
        info!(
            "Engineer {} approval set to {} by {}",
            engineer.id, engineer.is_approved, session.user.id
        );
        Ok(engineer)
    }

    pub async fn update_profile(&self, session: &SessionContext, update: ProfileUpdate) -> DomainResult<User> {
        let mut user = self.registry.get_user_by_id(session.user.id).await?;
        if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
            user.name = name.trim().to_string();
        }
        if let Some(phone) = update.phone {
            user.phone = Some(normalize_phone(&phone)).filter(|p| !p.is_empty());
        }
        if let Some(address) = update.address {
            user.address = Some(address).filter(|a| !a.trim().is_empty());
        }
        if let Some(image) = update.profile_image {
            user.profile_image = Some(image).filter(|i| !i.trim().is_empty());
        }
        if user.role() == Role::Engineer {
            if update.experience.is_some() {
                user.experience = update.experience;
            }
            if update.projects_done.is_some() {
                user.projects_done = update.projects_done;
            }
            if let Some(company) = update.company_name {
                user.company_name = Some(company).filter(|c| !c.trim().is_empty());
            }
        }
        self.registry.upsert_user(&user).await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EngineerProfile, ProjectStatus};
    use crate::lifecycle::LifecycleAction;
    use crate::registry::InMemoryRegistry;

    struct World {
        market: Marketplace,
        customer: SessionContext,
        engineer: SessionContext,
        admin: SessionContext,
    }

    async fn world() -> World {
        let registry = Arc::new(InMemoryRegistry::new());
        let customer = User::new("John Doe", "c@example.com", Role::Customer, EngineerProfile::default());
        let mut engineer = User::new("Eng", "e@example.com", Role::Engineer, EngineerProfile::default());
        engineer.is_approved = true;
        let admin = User::new("Admin", "a@example.com", Role::Admin, EngineerProfile::default());
        for u in [&customer, &engineer, &admin] {
            registry.create_user(u, "hash").await.unwrap();
        }
        World {
            market: Marketplace::new(registry),
            customer: SessionContext::new(customer, "s1"),
            engineer: SessionContext::new(engineer, "s2"),
            admin: SessionContext::new(admin, "s3"),
        }
    }

    fn quote() -> QuoteRequest {
        QuoteRequest {
            material_cost: Some(2_800_000),
            labor_cost: Some(1_200_000),
            token_percentage: Some(10),
            ..QuoteRequest::default()
        }
    }

    #[tokio::test]
    async fn full_lifecycle_through_the_registry() {
        let w = world().await;
        let project = w
            .market
            .submit_project(&w.customer, ConstructionDetails::default(), None, Vec::new())
            .await
            .unwrap();

        let err = w.market.finalize_project(&w.customer, project.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { action: LifecycleAction::Finalize, .. }));

        let approved = w.market.quote_project(&w.engineer, project.id, quote()).await.unwrap();
        assert_eq!(approved.status(), ProjectStatus::Approved);
        assert_eq!(approved.estimates().len(), 1);

        let err = w.market.quote_project(&w.engineer, project.id, quote()).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));

        w.market
            .post_message(&w.engineer, project.id, MessageDraft { text: Some("hello".into()), ..Default::default() })
            .await
            .unwrap();

        let done = w.market.finalize_project(&w.customer, project.id).await.unwrap();
        assert_eq!(done.status(), ProjectStatus::Finalized);
        assert_eq!(done.messages().len(), 1);
        assert_eq!(done.version, 3);

        let messages = w.market.messages(&w.admin, project.id).await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn customers_cannot_see_each_others_projects() {
        let w = world().await;
        let project = w
            .market
            .submit_project(&w.customer, ConstructionDetails::default(), None, Vec::new())
            .await
            .unwrap();
        let stranger = SessionContext::new(
            User::new("S", "s@example.com", Role::Customer, EngineerProfile::default()),
            "s4",
        );
        assert!(matches!(
            w.market.project_for(&stranger, project.id).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn admin_toggles_engineer_approval() {
        let w = world().await;
        let toggled = w
            .market
            .toggle_engineer_approval(&w.admin, w.engineer.user.id)
            .await
            .unwrap();
        assert!(!toggled.is_approved);

        assert!(matches!(
            w.market.toggle_engineer_approval(&w.admin, w.customer.user.id).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            w.market.toggle_engineer_approval(&w.engineer, w.engineer.user.id).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn profile_update_keeps_role_and_ignores_engineer_fields_for_customers() {
        let w = world().await;
        let update = ProfileUpdate {
            phone: Some("+91 98765-43210 ext".into()),
            company_name: Some("Nope Ltd".into()),
            ..ProfileUpdate::default()
        };
        let user = w.market.update_profile(&w.customer, update).await.unwrap();
        assert_eq!(user.phone.as_deref(), Some("9198765432"));
        assert_eq!(user.company_name, None);
        assert_eq!(user.role(), Role::Customer);
    }

    #[tokio::test]
    async fn missing_project_is_not_found() {
        let w = world().await;
        assert!(matches!(
            w.market.project_for(&w.admin, Uuid::new_v4()).await,
            Err(DomainError::NotFound(_))
        ));
    }
}
