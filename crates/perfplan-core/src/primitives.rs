//! # Review Primitives
//!
//! Fixed rule constants for the perfplan CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Weights and scores are expressed as [`Points`] (hundredths).
//!
//! ## Primitives
//!
//! 1. **Plan shape**: how many work items a plan holds and what they weigh.
//! 2. **Score scale**: the legal range of an item score.
//! 3. **Grade bands**: thresholds mapping a total score to a grade point.

use crate::types::Points;

// =============================================================================
// PLAN SHAPE
// =============================================================================

/// Required sum of all performance-work weights at submission.
///
/// - Together with the two global items (10 each) a plan weighs 100.
pub const REQUIRED_WORK_WEIGHT: Points = Points::whole(80);

/// Weight of each fixed global item (model usage, values).
pub const GLOBAL_ITEM_WEIGHT: Points = Points::whole(10);

/// Minimum number of performance-work items in a submitted plan.
pub const MIN_WORK_ITEMS: usize = 1;

/// Maximum number of performance-work items in a plan.
///
/// Editors refuse to add an eleventh row.
pub const MAX_WORK_ITEMS: usize = 10;

/// Upper bound of a single item weight (percent).
pub const MAX_ITEM_WEIGHT: Points = Points::whole(100);

// =============================================================================
// SCORE SCALE
// =============================================================================

/// Highest score an item may receive. Scores above 100 reward over-delivery.
pub const MAX_ITEM_SCORE: Points = Points::whole(120);

// =============================================================================
// GRADE BANDS
// =============================================================================

/// Lower bound (inclusive) of the excellent band.
pub const EXCELLENT_FLOOR: Points = Points::whole(90);

/// Upper bound (inclusive) of the excellent band.
pub const FULL_MARKS: Points = Points::whole(100);

/// Lower bound (inclusive) of the pass band.
pub const PASS_FLOOR: Points = Points::whole(60);

/// Grade point of the excellent band (1.00).
pub const GRADE_EXCELLENT: Points = Points::from_hundredths(100);

/// Grade point of the pass band (0.80).
pub const GRADE_PASS: Points = Points::from_hundredths(80);

/// Grade point below the pass floor.
pub const GRADE_FAIL: Points = Points::ZERO;

// =============================================================================
// GLOBAL ITEM TEXT
// =============================================================================

pub const MODEL_USAGE_TITLE: &str = "Model usage";
pub const MODEL_USAGE_DESCRIPTION: &str =
    "Uses the company's large-model tools to improve work efficiency";

pub const VALUES_TITLE: &str = "Values in practice";
pub const VALUES_DESCRIPTION: &str = "Understands and practices the company's values at work";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for item titles.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length for free text (description, target, completion, comments).
///
/// Longer text is rejected before it reaches storage.
pub const MAX_TEXT_LENGTH: usize = 4000;

/// Maximum length for names (users, departments, roles) and emails.
pub const MAX_NAME_LENGTH: usize = 128;

/// Maximum length for setting keys.
pub const MAX_SETTING_KEY_LENGTH: usize = 128;

/// Maximum length for setting values.
pub const MAX_SETTING_VALUE_LENGTH: usize = 4096;

/// Maximum number of score rows in one scoring request.
pub const MAX_SCORE_ROWS: usize = 64;

// A full plan plus its two global items must fit in one request.
const _: () = assert!(MAX_SCORE_ROWS >= MAX_WORK_ITEMS + 2);
