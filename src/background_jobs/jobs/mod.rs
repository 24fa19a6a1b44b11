//! Specific background job implementations.
//!
//! This module contains implementations of the `BackgroundJob` trait
//! for the preference analysis pipeline and server maintenance.

pub mod audit_log_cleanup;
pub mod facet_affinity;
pub mod facet_recommendation;
pub mod shelf_trends;

pub use audit_log_cleanup::AuditLogCleanupJob;
pub use facet_affinity::FacetAffinityJob;
pub use facet_recommendation::FacetRecommendationJob;
pub use shelf_trends::ShelfTrendsJob;
