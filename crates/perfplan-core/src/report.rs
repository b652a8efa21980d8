//! # HR Reporting
//!
//! Period-level aggregates and the flattened score sheet used for export.
//!
//! Only submitted reviews (anything but Draft) are reported. Output is
//! deterministic: rows are ordered by user id and the score sheet carries
//! a BLAKE3 digest of its canonical postcard encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scoring::GradeBand;
use crate::types::{
    Category, Department, DepartmentId, Period, PerformanceReview, Points, ReviewError, ReviewId,
    ReviewStatus, Role, RoleId, User, UserId,
};

/// Count of completed reviews per grade band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeDistribution {
    /// Total in [90, 100]: grade point 1.00.
    pub excellent: usize,
    /// Total in [60, 90): grade point 0.80.
    pub pass: usize,
    /// Total below 60: grade point 0.
    pub fail: usize,
    /// Total above 100: grade point above 1.00.
    pub above_full: usize,
}

impl GradeDistribution {
    fn record(&mut self, band: GradeBand) {
        match band {
            GradeBand::Fail => self.fail += 1,
            GradeBand::Pass => self.pass += 1,
            GradeBand::Excellent => self.excellent += 1,
            GradeBand::AboveFull => self.above_full += 1,
        }
    }
}

/// Aggregate view of one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: Period,
    /// Submitted reviews in the period.
    pub submitted: usize,
    pub by_status: BTreeMap<ReviewStatus, usize>,
    pub completed: usize,
    /// Mean total of completed reviews, rounded to hundredths.
    pub average_total: Option<Points>,
    pub grades: GradeDistribution,
}

impl PeriodSummary {
    #[must_use]
    pub fn build(period: Period, reviews: &[PerformanceReview]) -> Self {
        let mut by_status = BTreeMap::new();
        let mut grades = GradeDistribution::default();
        let mut totals = Vec::new();

        for review in reviews
            .iter()
            .filter(|r| r.period == period && r.status.is_submitted())
        {
            *by_status.entry(review.status).or_insert(0) += 1;
            if review.status == ReviewStatus::Completed {
                let total = review.total_score.unwrap_or(Points::ZERO);
                grades.record(GradeBand::of(&review.items));
                totals.push(total);
            }
        }

        let average_total = Points::sum(totals.iter().copied()).div_round(totals.len() as i64);

        Self {
            period,
            submitted: by_status.values().sum(),
            completed: totals.len(),
            by_status,
            average_total,
            grades,
        }
    }
}

/// One item line of a score sheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetItem {
    pub category: Category,
    pub title: String,
    pub target: String,
    pub weight: Option<Points>,
    pub completion_details: String,
    pub score: Option<Points>,
}

/// One review, flattened with directory names for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheetRow {
    pub review_id: ReviewId,
    pub user_id: UserId,
    pub name: String,
    pub english_name: String,
    pub department: String,
    pub role: String,
    pub status: ReviewStatus,
    pub items: Vec<SheetItem>,
    pub total_score: Option<Points>,
    pub grade_point: Option<Points>,
    pub final_comment: Option<String>,
}

/// Exportable score sheet of one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub period: Period,
    pub rows: Vec<ScoreSheetRow>,
    /// BLAKE3 hex digest of the canonical `(period, rows)` encoding.
    pub checksum: String,
}

impl ScoreSheet {
    /// Build the sheet for `period` from submitted reviews.
    pub fn build(
        period: Period,
        reviews: &[PerformanceReview],
        users: &[User],
        departments: &[Department],
        roles: &[Role],
    ) -> Result<Self, ReviewError> {
        let users: BTreeMap<UserId, &User> = users.iter().map(|u| (u.id, u)).collect();
        let departments: BTreeMap<DepartmentId, &str> = departments
            .iter()
            .map(|d| (d.id, d.name.as_str()))
            .collect();
        let roles: BTreeMap<RoleId, &str> = roles.iter().map(|r| (r.id, r.name.as_str())).collect();

        let mut rows: Vec<ScoreSheetRow> = reviews
            .iter()
            .filter(|r| r.period == period && r.status.is_submitted())
            .map(|review| {
                let user = users.get(&review.user_id);
                let lookup = |name: Option<&str>| name.unwrap_or_default().to_string();
                ScoreSheetRow {
                    review_id: review.id,
                    user_id: review.user_id,
                    name: lookup(user.map(|u| u.name.as_str())),
                    english_name: lookup(user.map(|u| u.english_name.as_str())),
                    department: lookup(
                        user.and_then(|u| u.department_id)
                            .and_then(|id| departments.get(&id).copied()),
                    ),
                    role: lookup(
                        user.and_then(|u| u.role_id)
                            .and_then(|id| roles.get(&id).copied()),
                    ),
                    status: review.status,
                    items: review
                        .items
                        .iter()
                        .map(|item| SheetItem {
                            category: item.category,
                            title: item.title.clone(),
                            target: item.target.clone(),
                            weight: item.weight,
                            completion_details: item.completion_details.clone(),
                            score: item.score,
                        })
                        .collect(),
                    total_score: review.total_score,
                    grade_point: review.grade_point,
                    final_comment: review.final_comment.clone(),
                }
            })
            .collect();
        rows.sort_by_key(|row| (row.user_id, row.review_id));

        let checksum = sheet_checksum(period, &rows)?;
        Ok(Self {
            period,
            rows,
            checksum,
        })
    }

    /// Recompute the checksum and compare.
    pub fn verify(&self) -> Result<bool, ReviewError> {
        Ok(sheet_checksum(self.period, &self.rows)? == self.checksum)
    }
}

/// BLAKE3 over the postcard encoding of `(period, rows)`.
fn sheet_checksum(period: Period, rows: &[ScoreSheetRow]) -> Result<String, ReviewError> {
    let bytes = postcard::to_allocvec(&(period, rows))
        .map_err(|e| ReviewError::SerializationError(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
