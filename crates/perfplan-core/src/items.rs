//! # Plan Items
//!
//! Invariants on the line items of a performance plan.
//!
//! A plan is a list of performance-work items followed by the two fixed
//! global items (model usage and values, weight 10 each). Only the work
//! items are authored by the employee; their weights must sum to exactly 80
//! before the plan can be submitted.
//!
//! - [`validate_for_submission`] is the gate run before Draft -> PendingApproval.
//! - [`validate_draft`] is the lighter check run whenever a draft is saved.
//! - [`ItemSet`] is the editor-side list with a derived running weight sum.

use crate::primitives::{
    GLOBAL_ITEM_WEIGHT, MAX_ITEM_WEIGHT, MAX_TEXT_LENGTH, MAX_TITLE_LENGTH, MAX_WORK_ITEMS,
    MIN_WORK_ITEMS, MODEL_USAGE_DESCRIPTION, MODEL_USAGE_TITLE, REQUIRED_WORK_WEIGHT,
    VALUES_DESCRIPTION, VALUES_TITLE,
};
use crate::types::{Category, ItemField, ItemId, Points, ReviewError, ReviewItem};

/// Iterate the performance-work items of a plan, in order.
pub fn work_items(items: &[ReviewItem]) -> impl Iterator<Item = &ReviewItem> {
    items
        .iter()
        .filter(|item| item.category == Category::PerformanceWork)
}

/// Sum of the performance-work weights. Missing weights count as zero.
pub fn work_weight(items: &[ReviewItem]) -> Points {
    Points::sum(work_items(items).map(|item| item.weight.unwrap_or(Points::ZERO)))
}

/// Validate the performance-work items of a plan for submission.
///
/// Global items in `items` are ignored. Checks, in order:
/// 1. between 1 and 10 work items (`ItemCount`)
/// 2. every item has a title, description, target and weight (`MissingField`)
/// 3. every weight is in (0, 100] (`WeightOutOfRange`)
/// 4. the weights sum to exactly 80 (`WeightMismatch`)
pub fn validate_for_submission(items: &[ReviewItem]) -> Result<(), ReviewError> {
    let work: Vec<&ReviewItem> = work_items(items).collect();

    if !(MIN_WORK_ITEMS..=MAX_WORK_ITEMS).contains(&work.len()) {
        return Err(ReviewError::ItemCount { count: work.len() });
    }

    for (index, item) in work.iter().enumerate() {
        check_required(index, item)?;
        check_bounds(index, item)?;
    }

    let actual = work_weight(items);
    if actual != REQUIRED_WORK_WEIGHT {
        return Err(ReviewError::WeightMismatch { actual });
    }
    Ok(())
}

/// Validate a plan being saved as a draft.
///
/// Drafts may be incomplete: empty fields and a weight sum other than 80 are
/// allowed. Item count, weight range and text length still apply.
pub fn validate_draft(items: &[ReviewItem]) -> Result<(), ReviewError> {
    let count = work_items(items).count();
    if count > MAX_WORK_ITEMS {
        return Err(ReviewError::ItemCount { count });
    }
    for (index, item) in work_items(items).enumerate() {
        check_bounds(index, item)?;
    }
    Ok(())
}

fn check_required(index: usize, item: &ReviewItem) -> Result<(), ReviewError> {
    let missing = |field| ReviewError::MissingField { item: index, field };
    if item.title.trim().is_empty() {
        return Err(missing(ItemField::Title));
    }
    if item.description.trim().is_empty() {
        return Err(missing(ItemField::Description));
    }
    if item.target.trim().is_empty() {
        return Err(missing(ItemField::Target));
    }
    if item.weight.is_none() {
        return Err(missing(ItemField::Weight));
    }
    Ok(())
}

fn check_bounds(index: usize, item: &ReviewItem) -> Result<(), ReviewError> {
    match item.weight {
        Some(weight) if weight <= Points::ZERO || weight > MAX_ITEM_WEIGHT => {
            return Err(ReviewError::WeightOutOfRange {
                item: index,
                weight,
            });
        }
        _ => {}
    }
    if item.title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ReviewError::InvalidInput(format!(
            "item {} title exceeds {} characters",
            index, MAX_TITLE_LENGTH
        )));
    }
    let longest = [&item.description, &item.target, &item.completion_details]
        .iter()
        .map(|text| text.chars().count())
        .max()
        .unwrap_or(0);
    if longest > MAX_TEXT_LENGTH {
        return Err(ReviewError::InvalidInput(format!(
            "item {} text exceeds {} characters",
            index, MAX_TEXT_LENGTH
        )));
    }
    Ok(())
}

/// The two fixed global items, in display order.
#[must_use]
pub fn global_items() -> [ReviewItem; 2] {
    [
        ReviewItem {
            category: Category::ModelUsage,
            title: MODEL_USAGE_TITLE.to_string(),
            description: MODEL_USAGE_DESCRIPTION.to_string(),
            target: MODEL_USAGE_DESCRIPTION.to_string(),
            weight: Some(GLOBAL_ITEM_WEIGHT),
            ..ReviewItem::default()
        },
        ReviewItem {
            category: Category::Values,
            title: VALUES_TITLE.to_string(),
            description: VALUES_DESCRIPTION.to_string(),
            target: VALUES_DESCRIPTION.to_string(),
            weight: Some(GLOBAL_ITEM_WEIGHT),
            ..ReviewItem::default()
        },
    ]
}

/// Rebuild a plan as its work items followed by the canonical global items.
///
/// Client-supplied global items are discarded, so their text and weight can
/// never drift. Scores and completion details are cleared and item ids are
/// renumbered `1..=n` in order.
#[must_use]
pub fn normalize_plan(items: Vec<ReviewItem>) -> Vec<ReviewItem> {
    let mut plan: Vec<ReviewItem> = items
        .into_iter()
        .filter(|item| item.category == Category::PerformanceWork)
        .map(|item| ReviewItem {
            completion_details: String::new(),
            score: None,
            ..item
        })
        .collect();
    plan.extend(global_items());
    for (position, item) in plan.iter_mut().enumerate() {
        item.id = ItemId(position as u64 + 1);
    }
    plan
}

// =============================================================================
// ITEM SET (editor state)
// =============================================================================

/// Editable list of performance-work items with a derived weight sum.
///
/// The sum is recomputed on every change, so `work_weight()` and
/// `remaining_weight()` are always consistent with the rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemSet {
    rows: Vec<ReviewItem>,
    weight: Points,
}

impl ItemSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the work items of an existing plan.
    #[must_use]
    pub fn from_plan(items: &[ReviewItem]) -> Self {
        let mut set = Self {
            rows: work_items(items).cloned().collect(),
            weight: Points::ZERO,
        };
        set.recompute();
        set
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[ReviewItem] {
        &self.rows
    }

    /// Current sum of work weights.
    #[must_use]
    pub fn work_weight(&self) -> Points {
        self.weight
    }

    /// Weight still to distribute to reach 80 (negative when over).
    #[must_use]
    pub fn remaining_weight(&self) -> Points {
        REQUIRED_WORK_WEIGHT.saturating_sub(self.weight)
    }

    /// Whether another row may be added.
    #[must_use]
    pub fn can_add(&self) -> bool {
        self.rows.len() < MAX_WORK_ITEMS
    }

    /// Append a row. Its category is forced to performance work.
    ///
    /// Returns the index of the new row.
    pub fn push(&mut self, item: ReviewItem) -> Result<usize, ReviewError> {
        if !self.can_add() {
            return Err(ReviewError::ItemCount {
                count: self.rows.len() + 1,
            });
        }
        self.rows.push(ReviewItem {
            category: Category::PerformanceWork,
            ..item
        });
        self.recompute();
        Ok(self.rows.len() - 1)
    }

    /// Remove a row, returning it.
    pub fn remove(&mut self, index: usize) -> Result<ReviewItem, ReviewError> {
        if index >= self.rows.len() {
            return Err(out_of_range(index));
        }
        let removed = self.rows.remove(index);
        self.recompute();
        Ok(removed)
    }

    /// Set the weight of a row.
    pub fn set_weight(&mut self, index: usize, weight: Option<Points>) -> Result<(), ReviewError> {
        self.edit(index, |row| row.weight = weight)
    }

    /// Apply an arbitrary edit to a row.
    pub fn edit<F>(&mut self, index: usize, f: F) -> Result<(), ReviewError>
    where
        F: FnOnce(&mut ReviewItem),
    {
        let row = self.rows.get_mut(index).ok_or_else(|| out_of_range(index))?;
        f(row);
        row.category = Category::PerformanceWork;
        self.recompute();
        Ok(())
    }

    /// Run the submission checks on the current rows.
    pub fn validate(&self) -> Result<(), ReviewError> {
        validate_for_submission(&self.rows)
    }

    /// The full plan: rows followed by the global items.
    #[must_use]
    pub fn into_plan(self) -> Vec<ReviewItem> {
        normalize_plan(self.rows)
    }

    fn recompute(&mut self) {
        self.weight = work_weight(&self.rows);
    }
}

fn out_of_range(index: usize) -> ReviewError {
    ReviewError::InvalidInput(format!("no item at position {}", index))
}

// =============================================================================
// TESTS
// =============================================================================
