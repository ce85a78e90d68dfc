//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `RegistryService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Columns and the JSON documents embedded in them use snake_case names; the
//! `*Record` structs below are the only place that mapping lives.

use async_trait::async_trait;
use buildestimate_core::domain::{
    ChatMessage, ConstructionDetails, Estimate, FloorConfig, KitchenType, LayoutOption, MediaType,
    Project, ProjectStatus, Role, User, UserCredentials,
};
use buildestimate_core::ports::{PortError, PortResult, RegistryService};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RegistryService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_approved: bool,
    pub experience: Option<i32>,
    pub projects_done: Option<i32>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
}

/// Counts are `u32` in the domain and `INTEGER` in the database.
fn count_to_column(value: Option<u32>, field: &str) -> PortResult<Option<i32>> {
    value
        .map(|v| {
            i32::try_from(v)
                .map_err(|_| PortError::Unexpected(format!("{} {} does not fit the column", field, v)))
        })
        .transpose()
}

fn count_from_column(value: Option<i32>, field: &str) -> PortResult<Option<u32>> {
    value
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| PortError::Unexpected(format!("stored {} {} is negative", field, v)))
        })
        .transpose()
}

impl UserRecord {
    pub fn from_domain(user: &User) -> PortResult<Self> {
        Ok(Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role().as_str().to_string(),
            is_approved: user.is_approved,
            experience: count_to_column(user.experience, "experience")?,
            projects_done: count_to_column(user.projects_done, "projects_done")?,
            company_name: user.company_name.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            profile_image: user.profile_image.clone(),
        })
    }

    pub fn to_domain(self) -> PortResult<User> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("unknown role '{}'", self.role)))?;
        let mut user = User::restore(self.id, self.name, self.email, role, self.is_approved);
        user.experience = count_from_column(self.experience, "experience")?;
        user.projects_done = count_from_column(self.projects_done, "projects_done")?;
        user.company_name = self.company_name;
        user.phone = self.phone;
        user.address = self.address;
        user.profile_image = self.profile_image;
        Ok(user)
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorConfigRecord {
    pub floor_number: u32,
    pub rooms: u32,
    pub bathrooms: u32,
    pub kitchen_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailsRecord {
    pub plot_area: f64,
    pub floors: u32,
    pub floor_configs: Vec<FloorConfigRecord>,
    pub parking: bool,
    pub budget_range: String,
    pub timeline_months: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub breadth: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
}

impl DetailsRecord {
    fn from_domain(details: &ConstructionDetails) -> Self {
        Self {
            plot_area: details.plot_area,
            floors: details.floors(),
            floor_configs: details
                .floor_configs()
                .iter()
                .map(|f| FloorConfigRecord {
                    floor_number: f.floor_number,
                    rooms: f.rooms,
                    bathrooms: f.bathrooms,
                    kitchen_type: f.kitchen_type.label().to_string(),
                })
                .collect(),
            parking: details.parking,
            budget_range: details.budget_range.clone(),
            timeline_months: details.timeline_months,
            notes: details.notes.clone(),
            length: details.length,
            breadth: details.breadth,
            location: details.location.clone(),
        }
    }

    fn to_domain(self) -> PortResult<ConstructionDetails> {
        let configs = self
            .floor_configs
            .into_iter()
            .map(|f| {
                let kitchen_type = KitchenType::parse(&f.kitchen_type).ok_or_else(|| {
                    PortError::Unexpected(format!("unknown kitchen type '{}'", f.kitchen_type))
                })?;
                Ok(FloorConfig {
                    floor_number: f.floor_number,
                    rooms: f.rooms,
                    bathrooms: f.bathrooms,
                    kitchen_type,
                })
            })
            .collect::<PortResult<Vec<_>>>()?;

        let mut details = ConstructionDetails::from_parts(self.floors, configs);
        details.plot_area = self.plot_area;
        details.parking = self.parking;
        details.budget_range = self.budget_range;
        details.timeline_months = self.timeline_months;
        details.notes = self.notes;
        details.length = self.length;
        details.breadth = self.breadth;
        details.location = self.location;
        Ok(details)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub engineer_id: Uuid,
    pub engineer_name: String,
    pub material_cost: i64,
    pub labor_cost: i64,
    #[serde(default)]
    pub material_quality: Option<String>,
    #[serde(default)]
    pub token_percentage: Option<u8>,
    #[serde(default)]
    pub token_amount: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub message: Option<String>,
}

impl EstimateRecord {
    fn from_domain(e: &Estimate) -> Self {
        Self {
            engineer_id: e.engineer_id,
            engineer_name: e.engineer_name.clone(),
            material_cost: e.material_cost,
            labor_cost: e.labor_cost,
            material_quality: e.material_quality.clone(),
            token_percentage: e.token_percentage,
            token_amount: e.token_amount,
            submitted_at: e.submitted_at,
            message: e.message.clone(),
        }
    }

    fn to_domain(self) -> PortResult<Estimate> {
        let estimate = Estimate {
            engineer_id: self.engineer_id,
            engineer_name: self.engineer_name,
            material_cost: self.material_cost,
            labor_cost: self.labor_cost,
            material_quality: self.material_quality,
            token_percentage: self.token_percentage,
            token_amount: self.token_amount,
            submitted_at: self.submitted_at,
            message: self.message,
        };
        estimate
            .validate()
            .map_err(|e| PortError::Unexpected(format!("stored estimate is inconsistent: {}", e)))?;
        Ok(estimate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub role: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessageRecord {
    fn from_domain(m: &ChatMessage) -> Self {
        Self {
            id: m.id,
            sender_id: m.sender_id,
            sender_name: m.sender_name.clone(),
            role: m.role.as_str().to_string(),
            text: m.text.clone(),
            media_url: m.media_url.clone(),
            media_type: m.media_type.map(|t| t.as_str().to_string()),
            timestamp: m.timestamp,
        }
    }

    fn to_domain(self) -> PortResult<ChatMessage> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("unknown role '{}'", self.role)))?;
        Ok(ChatMessage {
            id: self.id,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
            role,
            text: self.text,
            media_url: self.media_url,
            media_type: self.media_type.as_deref().and_then(MediaType::parse),
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptionRecord {
    pub url: String,
    pub style_name: String,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub details: Json<DetailsRecord>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub estimates: Json<Vec<EstimateRecord>>,
    pub messages: Json<Vec<ChatMessageRecord>>,
    pub selected_layout_url: Option<String>,
    pub layout_history: Json<Vec<LayoutOptionRecord>>,
    pub version: i32,
}

impl ProjectRecord {
    pub fn from_domain(project: &Project) -> Self {
        Self {
            id: project.id,
            customer_id: project.customer_id,
            customer_name: project.customer_name.clone(),
            details: Json(DetailsRecord::from_domain(&project.details)),
            status: project.status().label().to_string(),
            created_at: project.created_at,
            estimates: Json(project.estimates().iter().map(EstimateRecord::from_domain).collect()),
            messages: Json(project.messages().iter().map(ChatMessageRecord::from_domain).collect()),
            selected_layout_url: project.selected_layout_url.clone(),
            layout_history: Json(
                project
                    .layout_history
                    .iter()
                    .map(|l| LayoutOptionRecord {
                        url: l.url.clone(),
                        style_name: l.style_name.clone(),
                    })
                    .collect(),
            ),
            version: project.version as i32,
        }
    }

    pub fn to_domain(self) -> PortResult<Project> {
        let status = ProjectStatus::parse(&self.status)
            .ok_or_else(|| PortError::Unexpected(format!("unknown status '{}'", self.status)))?;
        let estimates = self
            .estimates
            .0
            .into_iter()
            .map(EstimateRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;
        let messages = self
            .messages
            .0
            .into_iter()
            .map(ChatMessageRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;

        let mut project = Project::restore(
            self.id,
            self.customer_id,
            self.customer_name,
            self.details.0.to_domain()?,
            status,
            self.created_at,
            estimates,
            messages,
            self.version.max(0) as u32,
        );
        project.selected_layout_url = self.selected_layout_url;
        project.layout_history = self
            .layout_history
            .0
            .into_iter()
            .map(|l| LayoutOption {
                url: l.url,
                style_name: l.style_name,
            })
            .collect();
        Ok(project)
    }
}

const USER_COLUMNS: &str = "id, name, email, role, is_approved, experience, projects_done, \
     company_name, phone, address, profile_image";

const PROJECT_COLUMNS: &str = "id, customer_id, customer_name, details, status, created_at, \
     estimates, messages, selected_layout_url, layout_history, version";

//=========================================================================================
// `RegistryService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RegistryService for DbAdapter {
    async fn create_user(&self, user: &User, hashed_password: &str) -> PortResult<()> {
        let record = UserRecord::from_domain(user)?;
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, name, email, role, is_approved, experience, projects_done, \
             company_name, phone, address, profile_image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.role)
        .bind(record.is_approved)
        .bind(record.experience)
        .bind(record.projects_done)
        .bind(&record.company_name)
        .bind(&record.phone)
        .bind(&record.address)
        .bind(&record.profile_image)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            return Err(match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("email {} is already registered", record.email))
                }
                other => unexpected(other),
            });
        }

        sqlx::query("INSERT INTO user_credentials (user_id, email, hashed_password) VALUES ($1, $2, $3)")
            .bind(record.id)
            .bind(&record.email)
            .bind(hashed_password)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn upsert_user(&self, user: &User) -> PortResult<()> {
        let record = UserRecord::from_domain(user)?;
        // The role is written on insert only.
        sqlx::query(
            "INSERT INTO users (id, name, email, role, is_approved, experience, projects_done, \
             company_name, phone, address, profile_image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email, \
             is_approved = EXCLUDED.is_approved, experience = EXCLUDED.experience, \
             projects_done = EXCLUDED.projects_done, company_name = EXCLUDED.company_name, \
             phone = EXCLUDED.phone, address = EXCLUDED.address, profile_image = EXCLUDED.profile_image",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.role)
        .bind(record.is_approved)
        .bind(record.experience)
        .bind(record.projects_done)
        .bind(&record.company_name)
        .bind(&record.phone)
        .bind(&record.address)
        .bind(&record.profile_image)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {} not found", user_id)))?;
        record.to_domain()
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM user_credentials WHERE email = $1",
        )
        .bind(email.trim().to_ascii_lowercase())
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("user not found".to_string()))?;
        Ok(record.to_domain())
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users ORDER BY name ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(UserRecord::to_domain).collect()
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn upsert_project(&self, project: &Project) -> PortResult<()> {
        let r = ProjectRecord::from_domain(project);
        sqlx::query(&format!(
            "INSERT INTO projects ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (id) DO UPDATE SET customer_id = EXCLUDED.customer_id, \
             customer_name = EXCLUDED.customer_name, details = EXCLUDED.details, \
             status = EXCLUDED.status, created_at = EXCLUDED.created_at, \
             estimates = EXCLUDED.estimates, messages = EXCLUDED.messages, \
             selected_layout_url = EXCLUDED.selected_layout_url, \
             layout_history = EXCLUDED.layout_history, version = EXCLUDED.version",
            PROJECT_COLUMNS
        ))
        .bind(r.id)
        .bind(r.customer_id)
        .bind(&r.customer_name)
        .bind(&r.details)
        .bind(&r.status)
        .bind(r.created_at)
        .bind(&r.estimates)
        .bind(&r.messages)
        .bind(&r.selected_layout_url)
        .bind(&r.layout_history)
        .bind(r.version)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn save_project(&self, project: &Project, expected_version: u32) -> PortResult<()> {
        let r = ProjectRecord::from_domain(project);
        let result = sqlx::query(
            "UPDATE projects SET customer_name = $2, details = $3, status = $4, estimates = $5, \
             messages = $6, selected_layout_url = $7, layout_history = $8, version = $9 \
             WHERE id = $1 AND version = $10",
        )
        .bind(r.id)
        .bind(&r.customer_name)
        .bind(&r.details)
        .bind(&r.status)
        .bind(&r.estimates)
        .bind(&r.messages)
        .bind(&r.selected_layout_url)
        .bind(&r.layout_history)
        .bind(r.version)
        .bind(expected_version as i32)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
            .bind(r.id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        if exists {
            Err(PortError::Conflict(format!(
                "project {} was modified concurrently",
                r.id
            )))
        } else {
            Err(PortError::NotFound(format!("Project {} not found", r.id)))
        }
    }

    async fn get_project_by_id(&self, project_id: Uuid) -> PortResult<Project> {
        let record = sqlx::query_as::<_, ProjectRecord>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("Project {} not found", project_id)))?;
        record.to_domain()
    }

    async fn list_projects(&self) -> PortResult<Vec<Project>> {
        let records = sqlx::query_as::<_, ProjectRecord>(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ProjectRecord::to_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildestimate_core::chat::{self, MessageDraft};
    use buildestimate_core::domain::EngineerProfile;
    use buildestimate_core::lifecycle::{approve_with_quote, submit, QuoteRequest};

    fn populated_project() -> Project {
        let customer = User::new("John Doe", "c@example.com", Role::Customer, EngineerProfile::default());
        let mut engineer = User::new("Eng", "e@example.com", Role::Engineer, EngineerProfile::default());
        engineer.is_approved = true;

        let mut details = ConstructionDetails::default();
        details.set_floors(2).unwrap();
        details.length = Some(25.0);
        details.breadth = Some(40.0);
        details.location = Some("Nagpur".to_string());
        details.notes = Some("corner plot".to_string());

        let layouts = vec![LayoutOption {
            url: "data:image/png;base64,AAAA".to_string(),
            style_name: "Modern Minimalist".to_string(),
        }];
        let mut project = submit(&customer, details, Some(layouts[0].url.clone()), layouts, Utc::now()).unwrap();
        let quote = QuoteRequest {
            material_cost: Some(2_800_000),
            labor_cost: Some(1_200_000),
            token_percentage: Some(15),
            material_quality: Some("Premium".to_string()),
            message: Some("steel frame".to_string()),
        };
        approve_with_quote(&mut project, &engineer, quote, Utc::now()).unwrap();
        let draft = MessageDraft {
            text: Some("plan.pdf".to_string()),
            media_url: Some("data:application/pdf;base64,AA".to_string()),
            media_type: Some(MediaType::File),
        };
        chat::post(&mut project, &engineer, draft, Utc::now()).unwrap();
        project
    }

    #[test]
    fn project_mapping_is_lossless() {
        let project = populated_project();
        let back = ProjectRecord::from_domain(&project).to_domain().unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn project_record_survives_json_encoding() {
        let record = ProjectRecord::from_domain(&populated_project());
        let json = serde_json::to_value(&record.details.0).unwrap();
        assert!(json.get("floor_configs").is_some());
        assert!(json.get("timeline_months").is_some());
        let decoded: DetailsRecord = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, record.details.0);

        let estimates = serde_json::to_string(&record.estimates.0).unwrap();
        assert!(estimates.contains("\"token_amount\":600000"));
    }

    #[test]
    fn user_mapping_is_lossless() {
        let mut user = User::new(
            "Eng. Sarah Smith",
            "engineer@example.com",
            Role::Engineer,
            EngineerProfile {
                experience: Some(8),
                projects_done: Some(45),
                company_name: Some("Smith Structural Dynamics".to_string()),
            },
        );
        user.phone = Some("9876543210".to_string());
        let record = UserRecord::from_domain(&user).unwrap();
        assert_eq!(record.role, "ENGINEER");
        assert!(!record.is_approved);
        assert_eq!(record.to_domain().unwrap(), user);
    }

    #[test]
    fn out_of_range_counts_are_errors_not_truncated() {
        let mut user = User::new("Eng", "eng@example.com", Role::Engineer, EngineerProfile::default());
        user.experience = Some(u32::MAX);
        assert!(matches!(UserRecord::from_domain(&user), Err(PortError::Unexpected(_))));

        user.experience = Some(i32::MAX as u32);
        let mut record = UserRecord::from_domain(&user).unwrap();
        assert_eq!(record.clone().to_domain().unwrap().experience, Some(i32::MAX as u32));

        record.projects_done = Some(-1);
        assert!(record.to_domain().is_err());
    }

    #[test]
    fn tampered_token_amount_is_rejected_on_load() {
        let mut record = ProjectRecord::from_domain(&populated_project());
        record.estimates.0[0].token_amount = Some(1);
        assert!(record.to_domain().is_err());
    }

    #[test]
    fn unknown_status_is_rejected_on_load() {
        let mut record = ProjectRecord::from_domain(&populated_project());
        record.status = "Cancelled".to_string();
        assert!(matches!(record.to_domain(), Err(PortError::Unexpected(_))));
    }
}
