//! services/api/src/web/protocol.rs
//!
//! Defines the JSON protocol between the browser client and the API server.
//! Every payload is camelCase on the wire; the conversions to and from the
//! core's domain types live here and nowhere else.

use buildestimate_core::{
    chat::MessageDraft,
    domain::{
        ChatMessage, ConstructionDetails, CostTier, Estimate, FloorConfig, KitchenType, LayoutOption,
        MediaType, Project, User, MAX_FLOORS,
    },
    lifecycle::QuoteRequest,
    session::{AdminStats, AdminView, DashboardView, EngineerView},
    DomainError, LayoutBatch, ProfileUpdate,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Users
//=========================================================================================

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// One of `CUSTOMER`, `ENGINEER` or `ADMIN`.
    pub role: String,
    pub is_approved: bool,
    pub experience: Option<u32>,
    pub projects_done: Option<u32>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role().as_str().to_string(),
            is_approved: user.is_approved,
            experience: user.experience,
            projects_done: user.projects_done,
            company_name: user.company_name.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            profile_image: user.profile_image.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
    pub experience: Option<u32>,
    pub projects_done: Option<u32>,
    pub company_name: Option<String>,
}

impl From<ProfileUpdateRequest> for ProfileUpdate {
    fn from(req: ProfileUpdateRequest) -> Self {
        Self {
            name: req.name,
            phone: req.phone,
            address: req.address,
            profile_image: req.profile_image,
            experience: req.experience,
            projects_done: req.projects_done,
            company_name: req.company_name,
        }
    }
}

//=========================================================================================
// Construction Details
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FloorConfigDto {
    pub floor_number: u32,
    pub rooms: u32,
    pub bathrooms: u32,
    /// `With Chimney` or `Without Chimney`.
    pub kitchen_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionDetailsDto {
    pub plot_area: f64,
    pub floors: u32,
    #[serde(default)]
    pub floor_configs: Vec<FloorConfigDto>,
    #[serde(default)]
    pub parking: bool,
    pub budget_range: String,
    pub timeline_months: u32,
    pub notes: Option<String>,
    pub length: Option<f64>,
    pub breadth: Option<f64>,
    pub location: Option<String>,
}

impl From<&ConstructionDetails> for ConstructionDetailsDto {
    fn from(details: &ConstructionDetails) -> Self {
        Self {
            plot_area: details.plot_area,
            floors: details.floors(),
            floor_configs: details
                .floor_configs()
                .iter()
                .map(|f| FloorConfigDto {
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
}

impl ConstructionDetailsDto {
    /// Converts the payload into domain details. Missing floors are filled
    /// with defaults and surplus entries dropped, then the result is validated.
    pub fn into_domain(self) -> Result<ConstructionDetails, DomainError> {
        if self.floors == 0 || self.floors > MAX_FLOORS {
            return Err(DomainError::Validation(format!(
                "floors must be between 1 and {}",
                MAX_FLOORS
            )));
        }
        let configs = self
            .floor_configs
            .into_iter()
            .map(|f| {
                let kitchen_type = KitchenType::parse(&f.kitchen_type).ok_or_else(|| {
                    DomainError::Validation(format!("unknown kitchen type '{}'", f.kitchen_type))
                })?;
                Ok(FloorConfig {
                    floor_number: f.floor_number,
                    rooms: f.rooms,
                    bathrooms: f.bathrooms,
                    kitchen_type,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let mut details = ConstructionDetails::from_parts(self.floors, configs);
        details.plot_area = self.plot_area;
        details.parking = self.parking;
        details.budget_range = self.budget_range;
        details.timeline_months = self.timeline_months;
        details.notes = self.notes;
        details.length = self.length;
        details.breadth = self.breadth;
        details.location = self.location;
        details.normalize_area();
        details.validate()?;
        Ok(details)
    }
}

//=========================================================================================
// Estimates and Layouts
//=========================================================================================

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CostTierDto {
    pub label: String,
    pub material_cost: i64,
    pub labor_cost: i64,
    pub explanation: String,
}

impl From<CostTier> for CostTierDto {
    fn from(tier: CostTier) -> Self {
        Self {
            label: tier.label,
            material_cost: tier.material_cost,
            labor_cost: tier.labor_cost,
            explanation: tier.explanation,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateTiersRequest {
    pub details: ConstructionDetailsDto,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateTiersResponse {
    pub tiers: Vec<CostTierDto>,
}

/// A FieldBot question, usually a village, city or pincode.
#[derive(Deserialize, Debug, ToSchema)]
pub struct FieldBotRequest {
    pub question: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct FieldBotResponse {
    pub answer: String,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub details: ConstructionDetailsDto,
    /// Style names to render; the default styles are used when empty.
    #[serde(default)]
    pub styles: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptionDto {
    pub url: String,
    pub style_name: String,
}

impl From<&LayoutOption> for LayoutOptionDto {
    fn from(option: &LayoutOption) -> Self {
        Self {
            url: option.url.clone(),
            style_name: option.style_name.clone(),
        }
    }
}

impl From<LayoutOptionDto> for LayoutOption {
    fn from(dto: LayoutOptionDto) -> Self {
        Self {
            url: dto.url,
            style_name: dto.style_name,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    pub layouts: Vec<LayoutOptionDto>,
    /// How many styles could not be rendered.
    pub failed: usize,
}

impl From<LayoutBatch> for LayoutResponse {
    fn from(batch: LayoutBatch) -> Self {
        Self {
            layouts: batch.options.iter().map(LayoutOptionDto::from).collect(),
            failed: batch.failed,
        }
    }
}

//=========================================================================================
// Projects
//=========================================================================================

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateDto {
    pub engineer_id: Uuid,
    pub engineer_name: String,
    pub material_cost: i64,
    pub labor_cost: i64,
    pub total_cost: i64,
    pub material_quality: Option<String>,
    pub token_percentage: Option<u8>,
    pub token_amount: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl From<&Estimate> for EstimateDto {
    fn from(e: &Estimate) -> Self {
        Self {
            engineer_id: e.engineer_id,
            engineer_name: e.engineer_name.clone(),
            material_cost: e.material_cost,
            labor_cost: e.labor_cost,
            total_cost: e.total(),
            material_quality: e.material_quality.clone(),
            token_percentage: e.token_percentage,
            token_amount: e.token_amount,
            submitted_at: e.submitted_at,
            message: e.message.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub role: String,
    pub text: Option<String>,
    pub media_url: Option<String>,
    /// `image` or `file`.
    pub media_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(m: &ChatMessage) -> Self {
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
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub details: ConstructionDetailsDto,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub estimates: Vec<EstimateDto>,
    pub messages: Vec<ChatMessageDto>,
    pub selected_layout_url: Option<String>,
    pub layout_history: Vec<LayoutOptionDto>,
    pub version: u32,
}

impl From<&Project> for ProjectDto {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id,
            customer_id: p.customer_id,
            customer_name: p.customer_name.clone(),
            details: ConstructionDetailsDto::from(&p.details),
            status: p.status().label().to_string(),
            created_at: p.created_at,
            estimates: p.estimates().iter().map(EstimateDto::from).collect(),
            messages: p.messages().iter().map(ChatMessageDto::from).collect(),
            selected_layout_url: p.selected_layout_url.clone(),
            layout_history: p.layout_history.iter().map(LayoutOptionDto::from).collect(),
            version: p.version,
        }
    }
}

fn projects(list: &[Project]) -> Vec<ProjectDto> {
    list.iter().map(ProjectDto::from).collect()
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProjectRequest {
    pub details: ConstructionDetailsDto,
    pub selected_layout_url: Option<String>,
    #[serde(default)]
    pub layout_history: Vec<LayoutOptionDto>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequestDto {
    pub material_cost: Option<i64>,
    pub labor_cost: Option<i64>,
    /// One of 5, 10 or 15.
    pub token_percentage: Option<u8>,
    pub material_quality: Option<String>,
    pub message: Option<String>,
}

impl From<QuoteRequestDto> for QuoteRequest {
    fn from(dto: QuoteRequestDto) -> Self {
        Self {
            material_cost: dto.material_cost,
            labor_cost: dto.labor_cost,
            token_percentage: dto.token_percentage,
            material_quality: dto.material_quality,
            message: dto.message,
        }
    }
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
}

impl PostMessageRequest {
    pub fn into_draft(self) -> Result<MessageDraft, DomainError> {
        let media_type = match self.media_type.as_deref() {
            None => None,
            Some(raw) => Some(MediaType::parse(raw).ok_or_else(|| {
                DomainError::Validation(format!("unknown media type '{}'", raw))
            })?),
        };
        Ok(MessageDraft {
            text: self.text,
            media_url: self.media_url,
            media_type,
        })
    }
}

//=========================================================================================
// Dashboards
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDashboardDto {
    pub projects: Vec<ProjectDto>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineerDashboardDto {
    /// False while the account waits for admin verification; both lists are then empty.
    pub verified: bool,
    pub open_projects: Vec<ProjectDto>,
    pub assigned_projects: Vec<ProjectDto>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsDto {
    pub total_projects: usize,
    pub total_users: usize,
    pub pending_approvals: usize,
    pub verified_engineers: usize,
}

impl From<&AdminStats> for AdminStatsDto {
    fn from(s: &AdminStats) -> Self {
        Self {
            total_projects: s.total_projects,
            total_users: s.total_users,
            pending_approvals: s.pending_approvals,
            verified_engineers: s.verified_engineers,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardDto {
    pub stats: AdminStatsDto,
    pub pending_engineers: Vec<UserDto>,
    pub engineers: Vec<UserDto>,
    pub customers: Vec<UserDto>,
    pub projects: Vec<ProjectDto>,
}

impl From<&AdminView> for AdminDashboardDto {
    fn from(view: &AdminView) -> Self {
        let users = |list: &[User]| list.iter().map(UserDto::from).collect();
        Self {
            stats: AdminStatsDto::from(&view.stats),
            pending_engineers: users(&view.pending_engineers),
            engineers: users(&view.engineers),
            customers: users(&view.customers),
            projects: projects(&view.projects),
        }
    }
}

/// The dashboard for the calling role, tagged by `role`.
#[derive(Serialize, Debug, ToSchema)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardDto {
    Customer(CustomerDashboardDto),
    Engineer(EngineerDashboardDto),
    Admin(AdminDashboardDto),
}

impl From<&DashboardView> for DashboardDto {
    fn from(view: &DashboardView) -> Self {
        match view {
            DashboardView::Customer(c) => DashboardDto::Customer(CustomerDashboardDto {
                projects: projects(&c.projects),
            }),
            DashboardView::Engineer(EngineerView::PendingVerification) => {
                DashboardDto::Engineer(EngineerDashboardDto {
                    verified: false,
                    open_projects: Vec::new(),
                    assigned_projects: Vec::new(),
                })
            }
            DashboardView::Engineer(EngineerView::Active { open, assigned }) => {
                DashboardDto::Engineer(EngineerDashboardDto {
                    verified: true,
                    open_projects: projects(open),
                    assigned_projects: projects(assigned),
                })
            }
            DashboardView::Admin(a) => DashboardDto::Admin(AdminDashboardDto::from(a)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details_json() -> serde_json::Value {
        json!({
            "plotArea": 1200.0,
            "floors": 2,
            "floorConfigs": [
                { "floorNumber": 1, "rooms": 3, "bathrooms": 2, "kitchenType": "With Chimney" }
            ],
            "parking": true,
            "budgetRange": "₹30 - ₹50 Lakhs",
            "timelineMonths": 9,
            "notes": null,
            "length": 30.0,
            "breadth": 50.0,
            "location": "Pune"
        })
    }

    #[test]
    fn details_payload_is_reconciled_and_normalized() {
        let dto: ConstructionDetailsDto = serde_json::from_value(details_json()).unwrap();
        let details = dto.into_domain().unwrap();
        assert_eq!(details.floor_configs().len(), 2);
        assert_eq!(details.floor_configs()[0].rooms, 3);
        assert_eq!(details.floor_configs()[1], FloorConfig::default_for(2));
        assert_eq!(details.plot_area, 1500.0);
    }

    #[test]
    fn too_many_floors_is_a_validation_error() {
        let mut value = details_json();
        value["floors"] = json!(6);
        let dto: ConstructionDetailsDto = serde_json::from_value(value).unwrap();
        assert!(matches!(dto.into_domain(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn unknown_kitchen_type_is_rejected() {
        let mut value = details_json();
        value["floorConfigs"][0]["kitchenType"] = json!("Open");
        let dto: ConstructionDetailsDto = serde_json::from_value(value).unwrap();
        assert!(matches!(dto.into_domain(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn dashboard_is_tagged_by_role() {
        let view = DashboardView::Engineer(EngineerView::PendingVerification);
        let value = serde_json::to_value(DashboardDto::from(&view)).unwrap();
        assert_eq!(value["role"], "ENGINEER");
        assert_eq!(value["verified"], false);
        assert!(value["openProjects"].as_array().unwrap().is_empty());
    }

    #[test]
    fn message_media_type_must_be_known() {
        let req = PostMessageRequest {
            media_type: Some("video".into()),
            ..Default::default()
        };
        assert!(req.into_draft().is_err());
    }
}
