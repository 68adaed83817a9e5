//! Offspring lifecycle domain
//!
//! One offspring is an individual animal inside an offspring group (its
//! litter or clutch). Its status is tracked along five coupled dimensions;
//! every mutation goes through [`normalize::normalize`] so the cross-field
//! invariants hold after each write.

pub mod normalize;
pub mod state;
pub mod summary;

pub use normalize::normalize;
pub use state::{
    FinancialState, KeeperIntent, LifeState, OffspringPatch, OffspringState, PaperworkState,
    PlacementState, TransitionViolation,
};
pub use summary::{summarize, GroupSummary, StatusCounts};
