//! # perfplan-core
//!
//! The deterministic review engine for perfplan - THE RULES.
//!
//! Employees write a monthly performance plan, their manager approves or
//! rejects it and later scores it, HR reads the results. This crate owns
//! the rules of that process:
//! - `workflow`: legal status transitions and who may trigger them
//! - `items`: weight-sum and required-field invariants of a plan
//! - `scoring`: weighted total and grade point
//!
//! and the plumbing around them (`store`, `storage`, `service`, `report`).
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies (pure Rust)
//! - Integer arithmetic only: weights and scores are fixed-point `Points`
//! - Time is an input: operations take unix seconds from the caller
//! - Every failure is a `ReviewError` value; nothing panics

// =============================================================================
// MODULES
// =============================================================================

pub mod items;
pub mod primitives;
pub mod report;
pub mod roles;
pub mod scoring;
pub mod seed;
pub mod service;
pub mod storage;
pub mod store;
pub mod types;
pub mod workflow;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ApprovalRecord, Category, Department, DepartmentId, ItemField, ItemId, Period,
    PerformanceReview, Points, ReviewAction, ReviewError, ReviewId, ReviewItem, ReviewStatus, Role,
    RoleId, SystemSetting, User, UserId,
};

// =============================================================================
// RE-EXPORTS: Rules
// =============================================================================

pub use items::{ItemSet, global_items, normalize_plan, validate_draft, validate_for_submission};
pub use roles::{Capabilities, RoleKind};
pub use scoring::{
    GradeBand, ItemScore, ScoreCard, apply_scores, compute_total, grade_for, grade_point,
};
pub use workflow::{Workflow, can_edit_items, transition};

// =============================================================================
// RE-EXPORTS: Storage and Service
// =============================================================================

pub use report::{GradeDistribution, PeriodSummary, ScoreSheet, ScoreSheetRow, SheetItem};
pub use service::{ReviewService, ReviewView, ServiceStats, StorageBackend, UserUpdate};
pub use storage::RedbStore;
pub use store::{MemoryStore, ReviewStore};
