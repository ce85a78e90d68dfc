//! crates/buildestimate_core/src/lifecycle.rs
//!
//! The project state machine: Submitted -> Approved -> Finalized.
//!
//! Every transition checks its guards before touching the project, so a
//! rejected action leaves the project exactly as it was.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use crate::domain::{
    ConstructionDetails, Estimate, LayoutOption, Project, ProjectStatus, Role, User, MAX_COST_INR,
};
use crate::error::{DomainError, DomainResult};
use crate::estimate::{token_amount, TOKEN_PERCENTAGES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Quote,
    Finalize,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Quote => f.write_str("quote"),
            LifecycleAction::Finalize => f.write_str("finalize"),
        }
    }
}

/// How engineer quotes are collected on a Submitted project.
///
/// Only `SingleOffer` exists: the first quote wins and replaces the estimate
/// list. A competing-bids policy would add a variant here and keep the
/// project Submitted until the customer picks one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuotePolicy {
    #[default]
    SingleOffer,
}

/// An engineer's quote as entered. The token amount is never part of the input.
#[derive(Debug, Clone, Default)]
pub struct QuoteRequest {
    pub material_cost: Option<i64>,
    pub labor_cost: Option<i64>,
    pub token_percentage: Option<u8>,
    pub material_quality: Option<String>,
    pub message: Option<String>,
}

impl QuoteRequest {
    /// Validates the quote and turns it into an `Estimate` signed by `engineer`.
    pub fn into_estimate(self, engineer: &User, now: DateTime<Utc>) -> DomainResult<Estimate> {
        let material_cost = self
            .material_cost
            .ok_or_else(|| DomainError::Validation("materialCost is required".to_string()))?;
        let labor_cost = self
            .labor_cost
            .ok_or_else(|| DomainError::Validation("laborCost is required".to_string()))?;
        if material_cost < 0 || labor_cost < 0 {
            return Err(DomainError::Validation(
                "materialCost and laborCost must not be negative".to_string(),
            ));
        }
        if material_cost > MAX_COST_INR || labor_cost > MAX_COST_INR {
            return Err(DomainError::Validation(format!(
                "materialCost and laborCost must not exceed {}",
                MAX_COST_INR
            )));
        }
        if let Some(pct) = self.token_percentage {
            if !TOKEN_PERCENTAGES.contains(&pct) {
                return Err(DomainError::Validation(format!(
                    "tokenPercentage must be one of {:?}",
                    TOKEN_PERCENTAGES
                )));
            }
        }

        Ok(Estimate {
            engineer_id: engineer.id,
            engineer_name: engineer.name.clone(),
            material_cost,
            labor_cost,
            material_quality: self.material_quality.filter(|q| !q.trim().is_empty()),
            token_percentage: self.token_percentage,
            token_amount: self
                .token_percentage
                .map(|pct| token_amount(material_cost, labor_cost, pct)),
            submitted_at: now,
            message: self.message.filter(|m| !m.trim().is_empty()),
        })
    }
}

/// Creates a new project in `Submitted` on behalf of a customer.
pub fn submit(
    customer: &User,
    mut details: ConstructionDetails,
    selected_layout_url: Option<String>,
    layout_history: Vec<LayoutOption>,
    now: DateTime<Utc>,
) -> DomainResult<Project> {
    if customer.role() != Role::Customer {
        return Err(DomainError::Forbidden(
            "only customers can submit projects".to_string(),
        ));
    }
    details.normalize_area();
    details.validate()?;

    Ok(Project {
        id: Uuid::new_v4(),
        customer_id: customer.id,
        customer_name: customer.name.clone(),
        details,
        status: ProjectStatus::Submitted,
        created_at: now,
        estimates: Vec::new(),
        messages: Vec::new(),
        selected_layout_url,
        layout_history,
        version: 0,
    })
}

/// Submitted -> Approved, driven by a verified engineer's quote.
pub fn approve_with_quote(
    project: &mut Project,
    engineer: &User,
    quote: QuoteRequest,
    now: DateTime<Utc>,
) -> DomainResult<()> {
    if project.status != ProjectStatus::Submitted {
        return Err(DomainError::InvalidTransition {
            from: project.status,
            action: LifecycleAction::Quote,
        });
    }
    if !engineer.is_verified_engineer() {
        return Err(DomainError::Forbidden(
            "only approved engineers can quote".to_string(),
        ));
    }
    let estimate = quote.into_estimate(engineer, now)?;

    match QuotePolicy::default() {
        QuotePolicy::SingleOffer => project.estimates = vec![estimate],
    }
    project.status = ProjectStatus::Approved;
    project.version += 1;
    Ok(())
}

/// Approved -> Finalized, driven by the owning customer.
pub fn finalize(project: &mut Project, customer: &User) -> DomainResult<()> {
    if project.status != ProjectStatus::Approved {
        return Err(DomainError::InvalidTransition {
            from: project.status,
            action: LifecycleAction::Finalize,
        });
    }
    if !project.is_owned_by(customer) {
        return Err(DomainError::Forbidden(
            "only the project owner can finalize".to_string(),
        ));
    }
    project.status = ProjectStatus::Finalized;
    project.version += 1;
    Ok(())
}
