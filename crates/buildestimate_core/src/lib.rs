pub mod chat;
pub mod domain;
pub mod error;
pub mod estimate;
pub mod floors;
pub mod lifecycle;
pub mod marketplace;
pub mod ports;
pub mod registry;
pub mod session;

pub use domain::{
    AuthSession, ChatMessage, ConstructionDetails, CostTier, EngineerProfile, Estimate, FloorConfig,
    KitchenType, LayoutOption, MediaType, Project, ProjectStatus, Role, User, UserCredentials,
};
pub use error::{DomainError, DomainResult};
pub use estimate::{EstimateEngine, LayoutBatch};
pub use marketplace::{Marketplace, ProfileUpdate};
pub use ports::{CostEstimationService, LayoutGenerationService, PortError, PortResult, RegistryService};
pub use session::{DashboardView, SessionContext};
