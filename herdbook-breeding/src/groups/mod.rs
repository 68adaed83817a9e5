//! Offspring group workflows
//!
//! [`linkage`] owns the transactional group-to-plan association state
//! machine and its audit trail; [`suggest`] ranks candidate plans for an
//! orphan group.

pub mod linkage;
pub mod suggest;

pub use linkage::LinkageService;
pub use suggest::{suggest_plans, PlanSuggestion, DEFAULT_SUGGESTION_LIMIT};
