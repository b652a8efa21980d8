//! # Score Calculator
//!
//! Weighted total and grade point of a scored plan.
//!
//! ## Rules
//!
//! - `total = Σ weight/100 × score` over items that have both a weight and a score
//! - missing scores contribute zero, so partial totals are allowed
//! - grade point bands are checked in order:
//!   `[90, 100] → 1.00`, `[60, 90) → 0.80`, `< 60 → 0.00`, `> 100 → total/100`
//!
//! All arithmetic is integer: weights and scores are hundredths, the exact
//! product sum is accumulated in `i128`. The displayed total is that sum
//! rounded half away from zero; the grade band is read from the sum itself.

use serde::{Deserialize, Serialize};

use crate::primitives::{
    EXCELLENT_FLOOR, FULL_MARKS, GRADE_EXCELLENT, GRADE_FAIL, GRADE_PASS, MAX_ITEM_SCORE,
    MAX_TEXT_LENGTH, PASS_FLOOR,
};
use crate::types::{ItemId, Points, ReviewError, ReviewItem, round_div};

/// `weight × score` units (hundredths × hundredths) per hundredth of total.
const SUM_PER_HUNDREDTH: i128 = 10_000;

/// Exact weighted sum of a plan, in `weight × score` units.
fn weighted_sum(items: &[ReviewItem]) -> i128 {
    items
        .iter()
        .filter_map(|item| match (item.weight, item.score) {
            (Some(weight), Some(score)) => {
                Some(i128::from(weight.hundredths()) * i128::from(score.hundredths()))
            }
            _ => None,
        })
        .sum()
}

/// Weighted total of a plan's scores, rounded to hundredths.
pub fn compute_total(items: &[ReviewItem]) -> Points {
    // hundredths × hundredths / 100 (percent) / 100 (back to hundredths)
    let total = round_div(weighted_sum(items), SUM_PER_HUNDREDTH);
    Points::from_hundredths(i64::try_from(total).unwrap_or(i64::MAX))
}

/// Grade band of a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GradeBand {
    /// Below 60.
    Fail,
    /// [60, 90).
    Pass,
    /// [90, 100].
    Excellent,
    /// Above 100.
    AboveFull,
}

impl GradeBand {
    fn of_sum(sum: i128) -> Self {
        let floor = |p: Points| i128::from(p.hundredths()) * SUM_PER_HUNDREDTH;
        if sum > floor(FULL_MARKS) {
            Self::AboveFull
        } else if sum >= floor(EXCELLENT_FLOOR) {
            Self::Excellent
        } else if sum >= floor(PASS_FLOOR) {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    /// Band of a plan, chosen from the exact weighted sum.
    ///
    /// A total that only rounds up to a band edge (89.995 shown as 90.00)
    /// stays in the lower band.
    #[must_use]
    pub fn of(items: &[ReviewItem]) -> Self {
        Self::of_sum(weighted_sum(items))
    }
}

/// Grade point of a plan, banded on the exact weighted sum.
pub fn grade_for(items: &[ReviewItem]) -> Points {
    grade_from_sum(weighted_sum(items))
}

/// Map a total score to its grade point.
pub fn grade_point(total: Points) -> Points {
    grade_from_sum(i128::from(total.hundredths()) * SUM_PER_HUNDREDTH)
}

fn grade_from_sum(sum: i128) -> Points {
    match GradeBand::of_sum(sum) {
        GradeBand::Fail => GRADE_FAIL,
        GradeBand::Pass => GRADE_PASS,
        GradeBand::Excellent => GRADE_EXCELLENT,
        GradeBand::AboveFull => {
            // total / 100, uncapped
            let grade = round_div(sum, SUM_PER_HUNDREDTH * 100);
            Points::from_hundredths(i64::try_from(grade).unwrap_or(i64::MAX))
        }
    }
}

/// Check a single score against the 0..=120 scale.
pub fn check_score(item: ItemId, score: Points) -> Result<(), ReviewError> {
    if score < Points::ZERO || score > MAX_ITEM_SCORE {
        return Err(ReviewError::ScoreOutOfRange { item, score });
    }
    Ok(())
}

/// Scorer input for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemScore {
    pub id: ItemId,
    #[serde(default)]
    pub completion_details: String,
    #[serde(default)]
    pub score: Option<Points>,
}

/// Apply scorer input to a plan.
///
/// Every referenced item must exist and every score must be in range; on
/// error `items` is left untouched. Items not mentioned keep their values.
pub fn apply_scores(items: &mut [ReviewItem], scores: &[ItemScore]) -> Result<(), ReviewError> {
    for input in scores {
        if !items.iter().any(|item| item.id == input.id) {
            return Err(ReviewError::UnknownItem(input.id));
        }
        if let Some(score) = input.score {
            check_score(input.id, score)?;
        }
        if input.completion_details.chars().count() > MAX_TEXT_LENGTH {
            return Err(ReviewError::InvalidInput(format!(
                "completion details of item {} exceed {} characters",
                input.id, MAX_TEXT_LENGTH
            )));
        }
    }

    for input in scores {
        if let Some(item) = items.iter_mut().find(|item| item.id == input.id) {
            item.completion_details.clone_from(&input.completion_details);
            item.score = input.score;
        }
    }
    Ok(())
}

/// Running total and grade point of a plan, for display while scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub total: Points,
    pub grade_point: Points,
    pub scored_items: usize,
    pub total_items: usize,
}

impl ScoreCard {
    #[must_use]
    pub fn of(items: &[ReviewItem]) -> Self {
        let total = compute_total(items);
        Self {
            total,
            grade_point: grade_for(items),
            scored_items: items.iter().filter(|item| item.score.is_some()).count(),
            total_items: items.len(),
        }
    }

    /// Whether every item has a score.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.scored_items == self.total_items
    }
}
