//! crates/buildestimate_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// The budget bands a customer can pick from when describing a build.
pub const BUDGET_RANGES: [&str; 6] = [
    "Below ₹15 Lakhs",
    "₹15 - ₹30 Lakhs",
    "₹30 - ₹50 Lakhs",
    "₹50 - ₹80 Lakhs",
    "₹80 Lakhs - ₹1.5 Crore",
    "Above ₹1.5 Crore",
];

pub const MAX_FLOORS: u32 = 5;

/// Upper bound for a single quoted cost component, in INR (ten trillion).
pub const MAX_COST_INR: i64 = 10_000_000_000_000;

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Customer,
    Engineer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Engineer => "ENGINEER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Some(Role::Customer),
            "ENGINEER" => Some(Role::Engineer),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engineer-only profile data. Absent for customers and admins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineerProfile {
    pub experience: Option<u32>,
    pub projects_done: Option<u32>,
    pub company_name: Option<String>,
}

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    role: Role,
    pub is_approved: bool,
    pub experience: Option<u32>,
    pub projects_done: Option<u32>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
}

impl User {
    /// Builds the record created at signup. Engineers start unapproved and
    /// keep their profile; the engineer fields are dropped for other roles.
    pub fn new(name: &str, email: &str, role: Role, profile: EngineerProfile) -> Self {
        let is_engineer = role == Role::Engineer;
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.trim().to_ascii_lowercase(),
            role,
            is_approved: !is_engineer,
            experience: profile.experience.filter(|_| is_engineer),
            projects_done: profile.projects_done.filter(|_| is_engineer),
            company_name: profile.company_name.filter(|_| is_engineer),
            phone: None,
            address: None,
            profile_image: None,
        }
    }

    /// Rebuilds a user from persisted fields, role included.
    pub fn restore(id: Uuid, name: String, email: String, role: Role, is_approved: bool) -> Self {
        Self {
            id,
            name,
            email,
            role,
            is_approved,
            experience: None,
            projects_done: None,
            company_name: None,
            phone: None,
            address: None,
            profile_image: None,
        }
    }

    /// Role is fixed at creation; there is deliberately no setter.
    pub fn role(&self) -> Role {
        self.role
    }

    /// True for engineers an admin has verified.
    pub fn is_verified_engineer(&self) -> bool {
        self.role == Role::Engineer && self.is_approved
    }
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Construction details
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KitchenType {
    WithChimney,
    WithoutChimney,
}

impl KitchenType {
    pub fn label(&self) -> &'static str {
        match self {
            KitchenType::WithChimney => "With Chimney",
            KitchenType::WithoutChimney => "Without Chimney",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "With Chimney" | "WithChimney" => Some(KitchenType::WithChimney),
            "Without Chimney" | "WithoutChimney" => Some(KitchenType::WithoutChimney),
            _ => None,
        }
    }
}

/// The specification of a single floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorConfig {
    pub floor_number: u32,
    pub rooms: u32,
    pub bathrooms: u32,
    pub kitchen_type: KitchenType,
}

impl FloorConfig {
    /// The entry synthesized for a floor that has not been configured yet.
    pub fn default_for(floor_number: u32) -> Self {
        Self {
            floor_number,
            rooms: 2,
            bathrooms: 1,
            kitchen_type: KitchenType::WithoutChimney,
        }
    }
}

/// The mutable specification of a build, embedded in a `Project`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionDetails {
    pub plot_area: f64,
    pub(crate) floors: u32,
    pub(crate) floor_configs: Vec<FloorConfig>,
    pub parking: bool,
    pub budget_range: String,
    pub timeline_months: u32,
    pub notes: Option<String>,
    pub length: Option<f64>,
    pub breadth: Option<f64>,
    pub location: Option<String>,
}

impl Default for ConstructionDetails {
    fn default() -> Self {
        Self {
            plot_area: 1000.0,
            floors: 1,
            floor_configs: vec![FloorConfig::default_for(1)],
            parking: false,
            budget_range: BUDGET_RANGES[1].to_string(),
            timeline_months: 12,
            notes: None,
            length: None,
            breadth: None,
            location: None,
        }
    }
}

impl ConstructionDetails {
    /// Builds details from raw parts. `floor_configs` is reconciled against
    /// `floors` so the floor-set invariant holds from the start.
    pub fn from_parts(floors: u32, floor_configs: Vec<FloorConfig>) -> Self {
        Self {
            floors,
            floor_configs: crate::floors::reconcile(&floor_configs, floors),
            ..Self::default()
        }
    }

    pub fn floors(&self) -> u32 {
        self.floors
    }

    pub fn floor_configs(&self) -> &[FloorConfig] {
        &self.floor_configs
    }

    pub fn total_rooms(&self) -> u32 {
        self.floor_configs.iter().map(|f| f.rooms).sum()
    }

    pub fn total_bathrooms(&self) -> u32 {
        self.floor_configs.iter().map(|f| f.bathrooms).sum()
    }

    /// Plot area derived from the dimensions when both are given.
    pub fn effective_area(&self) -> f64 {
        match (self.length, self.breadth) {
            (Some(l), Some(b)) if l > 0.0 && b > 0.0 => l * b,
            _ => self.plot_area,
        }
    }

    /// Keeps `plot_area` equal to length × breadth when dimensions are present.
    pub fn normalize_area(&mut self) {
        self.plot_area = self.effective_area();
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !self.plot_area.is_finite() || self.plot_area <= 0.0 {
            return Err(DomainError::Validation(
                "plotArea must be a positive number".to_string(),
            ));
        }
        for (name, dim) in [("length", self.length), ("breadth", self.breadth)] {
            if let Some(d) = dim {
                if !d.is_finite() || d <= 0.0 {
                    return Err(DomainError::Validation(format!(
                        "{} must be a positive number",
                        name
                    )));
                }
            }
        }
        if self.floors == 0 || self.floors > MAX_FLOORS {
            return Err(DomainError::Validation(format!(
                "floors must be between 1 and {}",
                MAX_FLOORS
            )));
        }
        let numbers_match = self.floor_configs.len() == self.floors as usize
            && self
                .floor_configs
                .iter()
                .enumerate()
                .all(|(i, f)| f.floor_number == i as u32 + 1);
        if !numbers_match {
            return Err(DomainError::Validation(
                "floorConfigs must describe floors 1..floors exactly once".to_string(),
            ));
        }
        if !BUDGET_RANGES.contains(&self.budget_range.as_str()) {
            return Err(DomainError::Validation(format!(
                "unknown budgetRange '{}'",
                self.budget_range
            )));
        }
        if self.timeline_months == 0 {
            return Err(DomainError::Validation(
                "timelineMonths must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

//=========================================================================================
// Estimates, chat and projects
//=========================================================================================

/// An engineer's quote attached to a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Estimate {
    pub engineer_id: Uuid,
    pub engineer_name: String,
    pub material_cost: i64,
    pub labor_cost: i64,
    pub material_quality: Option<String>,
    pub token_percentage: Option<u8>,
    pub token_amount: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl Estimate {
    pub fn total(&self) -> i64 {
        self.material_cost.saturating_add(self.labor_cost)
    }

    /// Re-checks the cost and booking-token invariants on a loaded estimate.
    pub fn validate(&self) -> DomainResult<()> {
        if !(0..=MAX_COST_INR).contains(&self.material_cost)
            || !(0..=MAX_COST_INR).contains(&self.labor_cost)
        {
            return Err(DomainError::Validation(format!(
                "estimate costs must be between 0 and {}",
                MAX_COST_INR
            )));
        }
        match (self.token_percentage, self.token_amount) {
            (None, None) => Ok(()),
            (Some(pct), Some(amount))
                if amount == crate::estimate::token_amount(self.material_cost, self.labor_cost, pct) =>
            {
                Ok(())
            }
            _ => Err(DomainError::Validation(
                "tokenAmount does not match its inputs".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    File,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::File => "file",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaType::Image),
            "file" => Some(MediaType::File),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub role: Role,
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Submitted,
    Approved,
    Finalized,
}

impl ProjectStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Submitted => "Submitted",
            ProjectStatus::Approved => "Approved by Engineer",
            ProjectStatus::Finalized => "Finalized & Building",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Submitted" => Some(ProjectStatus::Submitted),
            "Approved" | "Approved by Engineer" => Some(ProjectStatus::Approved),
            "Finalized" | "Finalized & Building" => Some(ProjectStatus::Finalized),
            _ => None,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One AI- or formula-generated cost band.
#[derive(Debug, Clone, PartialEq)]
pub struct CostTier {
    pub label: String,
    pub material_cost: i64,
    pub labor_cost: i64,
    pub explanation: String,
}

/// A generated 2D floor-plan candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutOption {
    pub url: String,
    pub style_name: String,
}

/// The aggregate root: one customer's construction request and its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub details: ConstructionDetails,
    pub(crate) status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub(crate) estimates: Vec<Estimate>,
    pub(crate) messages: Vec<ChatMessage>,
    pub selected_layout_url: Option<String>,
    pub layout_history: Vec<LayoutOption>,
    /// Bumped on every persisted mutation; stores reject saves based on a stale value.
    pub version: u32,
}

impl Project {
    /// Rebuilds a project from persisted state. Used by registry adapters only;
    /// new projects go through `lifecycle::submit`.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        customer_id: Uuid,
        customer_name: String,
        details: ConstructionDetails,
        status: ProjectStatus,
        created_at: DateTime<Utc>,
        estimates: Vec<Estimate>,
        messages: Vec<ChatMessage>,
        version: u32,
    ) -> Self {
        Self {
            id,
            customer_id,
            customer_name,
            details,
            status,
            created_at,
            estimates,
            messages,
            selected_layout_url: None,
            layout_history: Vec::new(),
            version,
        }
    }

    pub fn status(&self) -> ProjectStatus {
        self.status
    }

    pub fn estimates(&self) -> &[Estimate] {
        &self.estimates
    }

    /// The quote that moved the project to Approved, if any.
    pub fn accepted_estimate(&self) -> Option<&Estimate> {
        self.estimates.first()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_owned_by(&self, user: &User) -> bool {
        self.customer_id == user.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_engineer_starts_unapproved_and_keeps_profile() {
        let profile = EngineerProfile {
            experience: Some(8),
            projects_done: Some(45),
            company_name: Some("Smith Structural Dynamics".to_string()),
        };
        let engineer = User::new("Eng. Sarah Smith", "Engineer@Example.com ", Role::Engineer, profile.clone());
        assert!(!engineer.is_approved);
        assert_eq!(engineer.email, "engineer@example.com");
        assert_eq!(engineer.company_name.as_deref(), Some("Smith Structural Dynamics"));

        let customer = User::new("John Doe", "customer@example.com", Role::Customer, profile);
        assert!(customer.is_approved);
        assert_eq!(customer.experience, None);
        assert_eq!(customer.company_name, None);
    }

    #[test]
    fn default_details_are_valid() {
        let details = ConstructionDetails::default();
        assert!(details.validate().is_ok());
        assert_eq!(details.total_rooms(), 2);
    }

    #[test]
    fn validate_rejects_unknown_budget_and_bad_area() {
        let mut details = ConstructionDetails::default();
        details.budget_range = "a lot".to_string();
        assert!(matches!(details.validate(), Err(DomainError::Validation(_))));

        let mut details = ConstructionDetails::default();
        details.plot_area = 0.0;
        assert!(matches!(details.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn dimensions_drive_plot_area() {
        let mut details = ConstructionDetails::default();
        details.length = Some(40.0);
        details.breadth = Some(30.0);
        details.normalize_area();
        assert_eq!(details.plot_area, 1200.0);
    }

    #[test]
    fn estimate_validation_catches_tampered_token() {
        let mut estimate = Estimate {
            engineer_id: Uuid::new_v4(),
            engineer_name: "Eng".to_string(),
            material_cost: 2_800_000,
            labor_cost: 1_200_000,
            material_quality: None,
            token_percentage: Some(10),
            token_amount: Some(400_000),
            submitted_at: Utc::now(),
            message: None,
        };
        assert!(estimate.validate().is_ok());
        estimate.token_amount = Some(1);
        assert!(estimate.validate().is_err());

        estimate.material_cost = i64::MAX;
        estimate.labor_cost = i64::MAX;
        estimate.token_amount = None;
        estimate.token_percentage = None;
        assert_eq!(estimate.total(), i64::MAX);
        assert!(estimate.validate().is_err());
    }

    #[test]
    fn status_parses_both_short_and_display_labels() {
        assert_eq!(ProjectStatus::parse("Approved by Engineer"), Some(ProjectStatus::Approved));
        assert_eq!(ProjectStatus::parse("Finalized"), Some(ProjectStatus::Finalized));
        assert_eq!(ProjectStatus::parse("Rejected"), None);
    }
}
