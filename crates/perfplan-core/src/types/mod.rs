//! # Core Type Definitions
//!
//! This module contains all core types for the perfplan review engine:
//! - Identifiers (`ReviewId`, `UserId`, `ItemId`, `RoleId`, `DepartmentId`)
//! - Fixed-point numbers (`Points`) and review periods (`Period`)
//! - Review records (`PerformanceReview`, `ReviewItem`, `ApprovalRecord`)
//! - Directory records (`User`, `Role`, `Department`, `SystemSetting`)
//! - Error types (`ReviewError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (weights and scores are hundredths)
//! - Implement `Ord` where they are used as `BTreeMap` keys
//! - Use saturating or checked arithmetic for sums

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a performance review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub u64);

/// Identifier of a user (employee, manager, HR, admin).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct UserId(pub u64);

/// Identifier of a review item. Unique within its review only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ItemId(pub u64);

/// Identifier of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(pub u64);

/// Identifier of a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub u64);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// POINTS (fixed-point, two decimals)
// =============================================================================

/// A decimal quantity with two fractional digits, stored as hundredths.
///
/// Used for weights (percent), item scores, totals and grade points.
/// `Points::whole(80)` is `80.00`; `Points::from_hundredths(105)` is `1.05`.
///
/// Human-readable formats (JSON) see a plain number. Conversion goes through
/// decimal text, so no floating-point arithmetic is ever performed.
/// Binary formats (postcard) see the raw `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Points(i64);

impl Points {
    /// `0.00`
    pub const ZERO: Self = Self(0);

    /// Create from a raw hundredths value.
    #[must_use]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Create from a whole number (`whole(80)` is `80.00`).
    #[must_use]
    pub const fn whole(value: i64) -> Self {
        Self(value.saturating_mul(100))
    }

    /// Get the raw hundredths value.
    #[must_use]
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Divide by an integer, rounding half away from zero.
    ///
    /// Returns `None` when `divisor` is zero.
    #[must_use]
    pub fn div_round(self, divisor: i64) -> Option<Self> {
        if divisor == 0 {
            return None;
        }
        Some(Self(round_div(i128::from(self.0), i128::from(divisor)) as i64))
    }

    /// Sum an iterator of points with saturating arithmetic.
    pub fn sum<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        iter.into_iter().fold(Self::ZERO, Self::saturating_add)
    }
}

/// Integer division rounding half away from zero.
pub(crate) fn round_div(numerator: i128, divisor: i128) -> i128 {
    let half = divisor.abs() / 2;
    if (numerator < 0) == (divisor < 0) {
        (numerator.abs() + half) / divisor.abs()
    } else {
        -((numerator.abs() + half) / divisor.abs())
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Points {
    type Err = ReviewError;

    /// Parse `"80"`, `"92.5"`, `"-1.25"`. At most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReviewError::InvalidInput(format!("invalid decimal '{}'", s));
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty()
            || frac_part.len() > 2
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: i64 = int_part.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac_part.len() {
            0 => 0,
            1 => frac_part.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac_part.parse().map_err(|_| invalid())?,
        };
        let magnitude = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            // Decimal text parses to the nearest f64, no arithmetic involved.
            let number: f64 = self
                .to_string()
                .parse()
                .map_err(serde::ser::Error::custom)?;
            serializer.serialize_f64(number)
        } else {
            serializer.serialize_i64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(PointsVisitor)
        } else {
            i64::deserialize(deserializer).map(Self)
        }
    }
}

struct PointsVisitor;

impl Visitor<'_> for PointsVisitor {
    type Value = Points;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number with at most two fractional digits")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Points, E> {
        v.checked_mul(100)
            .map(Points)
            .ok_or_else(|| E::custom("number out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Points, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(100))
            .map(Points)
            .ok_or_else(|| E::custom("number out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Points, E> {
        if !v.is_finite() {
            return Err(E::custom("number must be finite"));
        }
        // Shortest round-trip text, so `80.123` keeps its third digit and is
        // rejected like the string form.
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Points, E> {
        v.parse().map_err(E::custom)
    }
}

// =============================================================================
// PERIOD
// =============================================================================

/// A review period: one calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: u16,
    month: u8,
}

impl Period {
    /// Create a period, validating the month and a four-digit year.
    pub fn new(year: u16, month: u8) -> Result<Self, ReviewError> {
        if !(1000..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(ReviewError::InvalidPeriod(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    #[must_use]
    pub const fn year(self) -> u16 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u8 {
        self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReviewError::InvalidPeriod(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: u16 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// Category of a review item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Individually planned work results. Weights must sum to 80.
    #[default]
    PerformanceWork,
    /// Fixed global item: use of large-model tooling. Weight 10.
    ModelUsage,
    /// Fixed global item: company values. Weight 10.
    Values,
}

impl Category {
    /// Whether this is one of the two fixed global categories.
    #[must_use]
    pub const fn is_global(self) -> bool {
        matches!(self, Self::ModelUsage | Self::Values)
    }
}

/// Workflow status of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    /// Being written by its owner. Items editable.
    Draft,
    /// Submitted, waiting for the manager's decision.
    PendingApproval,
    /// Plan approved; the scorer may enter scores.
    #[serde(alias = "Approved", alias = "PendingScore")]
    Evaluating,
    /// Scored. Terminal and immutable.
    Completed,
    /// Sent back by the manager. Items editable, may be resubmitted.
    Rejected,
}

impl ReviewStatus {
    /// All statuses in workflow order.
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::PendingApproval,
        Self::Evaluating,
        Self::Completed,
        Self::Rejected,
    ];

    /// Stable name used on the wire and in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::PendingApproval => "PendingApproval",
            Self::Evaluating => "Evaluating",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
        }
    }

    /// A review counts as submitted once it has left Draft.
    #[must_use]
    pub const fn is_submitted(self) -> bool {
        !matches!(self, Self::Draft)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A workflow action that moves a review between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Submit,
    Approve,
    Reject,
    Score,
}

impl ReviewAction {
    pub const ALL: [Self; 4] = [Self::Submit, Self::Approve, Self::Reject, Self::Score];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Score => "score",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A required field of a review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    Title,
    Description,
    Target,
    Weight,
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Target => "target",
            Self::Weight => "weight",
        })
    }
}

// =============================================================================
// REVIEW RECORDS
// =============================================================================

/// One line of a performance plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReviewItem {
    /// Position-stable id within the review (assigned when the plan is stored).
    #[serde(default)]
    pub id: ItemId,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Target or measure of success.
    #[serde(default)]
    pub target: String,
    /// Percentage weight, 0-100.
    #[serde(default)]
    pub weight: Option<Points>,
    /// Filled in at scoring time.
    #[serde(default)]
    pub completion_details: String,
    /// 0-120, `None` until scored.
    #[serde(default)]
    pub score: Option<Points>,
}

impl ReviewItem {
    /// Create a performance-work item.
    #[must_use]
    pub fn work(
        title: impl Into<String>,
        description: impl Into<String>,
        target: impl Into<String>,
        weight: Points,
    ) -> Self {
        Self {
            category: Category::PerformanceWork,
            title: title.into(),
            description: description.into(),
            target: target.into(),
            weight: Some(weight),
            ..Self::default()
        }
    }
}

/// One entry of a review's approval history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Who performed the transition.
    pub actor: UserId,
    /// The status the review entered.
    pub status: ReviewStatus,
    pub comment: Option<String>,
    /// Unix seconds.
    pub at: u64,
}

/// A monthly performance review owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceReview {
    pub id: ReviewId,
    pub user_id: UserId,
    pub period: Period,
    pub status: ReviewStatus,
    pub items: Vec<ReviewItem>,
    pub final_comment: Option<String>,
    pub total_score: Option<Points>,
    pub grade_point: Option<Points>,
    #[serde(default)]
    pub approvals: Vec<ApprovalRecord>,
    /// Unix seconds.
    pub created_at: u64,
    /// Unix seconds.
    pub updated_at: u64,
}

impl PerformanceReview {
    /// Create a new Draft review. The id is assigned by the store.
    #[must_use]
    pub fn draft(user_id: UserId, period: Period, items: Vec<ReviewItem>, at: u64) -> Self {
        Self {
            id: ReviewId(0),
            user_id,
            period,
            status: ReviewStatus::Draft,
            items,
            final_comment: None,
            total_score: None,
            grade_point: None,
            approvals: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }
}

// =============================================================================
// DIRECTORY RECORDS
// =============================================================================

/// An employee account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub english_name: String,
    pub email: String,
    pub department_id: Option<DepartmentId>,
    pub role_id: Option<RoleId>,
    /// Direct manager: approves, rejects and scores this user's reviews.
    pub manager_id: Option<UserId>,
    pub is_active: bool,
}

impl User {
    /// Create an active user with no department, role or manager.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId(0),
            name: name.into(),
            english_name: String::new(),
            email: email.into(),
            department_id: None,
            role_id: None,
            manager_id: None,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub parent_id: Option<DepartmentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the review engine.
///
/// - No silent failures
/// - Every rule violation is a value the caller can render
/// - The core never panics
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The action is not legal from the review's current status.
    #[error("Invalid transition: cannot {action} a review in {from} status")]
    InvalidTransition {
        from: ReviewStatus,
        action: ReviewAction,
    },

    /// Performance-work weights do not sum to the required total.
    #[error("Performance-work weights must sum to 80.00, got {actual}")]
    WeightMismatch { actual: Points },

    /// A required item field is empty. `item` is the zero-based position
    /// among the performance-work items.
    #[error("Item {item}: {field} is required")]
    MissingField { item: usize, field: ItemField },

    /// Reject requires a non-empty comment.
    #[error("A comment is required to reject a review")]
    RejectionCommentRequired,

    /// Number of performance-work items outside 1..=10.
    #[error("A plan needs between 1 and 10 performance-work items, got {count}")]
    ItemCount { count: usize },

    /// A weight outside (0, 100].
    #[error("Item {item}: weight {weight} must be greater than 0 and at most 100")]
    WeightOutOfRange { item: usize, weight: Points },

    /// A score outside 0..=120.
    #[error("Item {item}: score {score} must be between 0 and 120")]
    ScoreOutOfRange { item: ItemId, score: Points },

    /// A score referenced an item that is not part of the review.
    #[error("Item {0} does not belong to this review")]
    UnknownItem(ItemId),

    /// Malformed `YYYY-MM` period.
    #[error("Invalid period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),

    /// Items can only be edited in Draft or Rejected.
    #[error("Review items cannot be edited in {0} status")]
    NotEditable(ReviewStatus),

    /// The actor may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (review per user and period, email, setting).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// TESTS
// =============================================================================
