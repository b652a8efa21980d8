//! # Review Workflow
//!
//! The status machine of a performance review and who may drive it.
//!
//! ```text
//!   Draft ──submit──▶ PendingApproval ──approve──▶ Evaluating ──score──▶ Completed
//!     ▲                    │
//!     │                  reject (comment required)
//!     │                    ▼
//!     └──── (edit) ──── Rejected ──submit──▶ PendingApproval
//! ```
//!
//! [`transition`] is the pure table. [`Workflow`] layers permission and
//! validation checks on top and returns an updated *copy* of the review;
//! the input is never mutated, so a failed action leaves no trace.

use crate::items::{normalize_plan, validate_draft, validate_for_submission};
use crate::primitives::MAX_TEXT_LENGTH;
use crate::scoring::{ItemScore, ScoreCard, apply_scores};
use crate::types::{
    ApprovalRecord, PerformanceReview, ReviewAction, ReviewError, ReviewItem, ReviewStatus, User,
};

/// Apply `action` to `from`, returning the next status.
pub fn transition(from: ReviewStatus, action: ReviewAction) -> Result<ReviewStatus, ReviewError> {
    use ReviewAction::{Approve, Reject, Score, Submit};
    use ReviewStatus::{Completed, Draft, Evaluating, PendingApproval, Rejected};

    match (from, action) {
        (Draft | Rejected, Submit) => Ok(PendingApproval),
        (PendingApproval, Approve) => Ok(Evaluating),
        (PendingApproval, Reject) => Ok(Rejected),
        (Evaluating, Score) => Ok(Completed),
        _ => Err(ReviewError::InvalidTransition { from, action }),
    }
}

/// Items may only change while the owner holds the plan.
#[must_use]
pub const fn can_edit_items(status: ReviewStatus) -> bool {
    matches!(status, ReviewStatus::Draft | ReviewStatus::Rejected)
}

/// Whether `actor` is the direct manager of `owner`.
#[must_use]
pub fn is_manager_of(actor: &User, owner: &User) -> bool {
    owner.manager_id == Some(actor.id)
}

/// Namespace for permission-checked workflow actions.
pub struct Workflow;

impl Workflow {
    /// Submit a Draft or Rejected plan for approval. Owner only.
    pub fn submit(
        review: &PerformanceReview,
        actor: &User,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let next = transition(review.status, ReviewAction::Submit)?;
        require_owner(review, actor, ReviewAction::Submit)?;
        validate_for_submission(&review.items)?;
        Ok(advance(review, next, actor, None, at))
    }

    /// Approve a pending plan. Manager only; the comment is optional.
    pub fn approve(
        review: &PerformanceReview,
        owner: &User,
        actor: &User,
        comment: Option<&str>,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let next = transition(review.status, ReviewAction::Approve)?;
        require_manager(review, owner, actor, ReviewAction::Approve)?;
        let comment = clean_comment(comment)?;
        Ok(advance(review, next, actor, comment, at))
    }

    /// Send a pending plan back to its owner. Manager only; needs a comment.
    pub fn reject(
        review: &PerformanceReview,
        owner: &User,
        actor: &User,
        comment: &str,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let next = transition(review.status, ReviewAction::Reject)?;
        require_manager(review, owner, actor, ReviewAction::Reject)?;
        let comment = clean_comment(Some(comment))?.ok_or(ReviewError::RejectionCommentRequired)?;
        Ok(advance(review, next, actor, Some(comment), at))
    }

    /// Record scores and complete the review. Manager only.
    ///
    /// Items without a score contribute zero to the total.
    pub fn score(
        review: &PerformanceReview,
        owner: &User,
        actor: &User,
        scores: &[ItemScore],
        final_comment: Option<&str>,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let next = transition(review.status, ReviewAction::Score)?;
        require_manager(review, owner, actor, ReviewAction::Score)?;
        let final_comment = clean_comment(final_comment)?;

        let mut items = review.items.clone();
        apply_scores(&mut items, scores)?;
        let card = ScoreCard::of(&items);

        let mut updated = advance(review, next, actor, None, at);
        updated.items = items;
        updated.total_score = Some(card.total);
        updated.grade_point = Some(card.grade_point);
        updated.final_comment = final_comment;
        Ok(updated)
    }

    /// Replace the plan's items. Owner only, in Draft or Rejected.
    ///
    /// Global items are rebuilt; the weight sum is only enforced at submit.
    pub fn edit_items(
        review: &PerformanceReview,
        actor: &User,
        items: Vec<ReviewItem>,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        if !can_edit_items(review.status) {
            return Err(ReviewError::NotEditable(review.status));
        }
        if review.user_id != actor.id {
            return Err(ReviewError::Forbidden(
                "only the owner may edit a plan".to_string(),
            ));
        }
        let plan = normalize_plan(items);
        validate_draft(&plan)?;

        let mut updated = review.clone();
        updated.items = plan;
        updated.updated_at = at;
        Ok(updated)
    }

    /// Actions `actor` may take next on `review`. A display hint.
    #[must_use]
    pub fn available_actions(
        review: &PerformanceReview,
        owner: &User,
        actor: &User,
    ) -> Vec<ReviewAction> {
        ReviewAction::ALL
            .into_iter()
            .filter(|action| transition(review.status, *action).is_ok())
            .filter(|action| match action {
                ReviewAction::Submit => review.user_id == actor.id,
                _ => owner.id == review.user_id && is_manager_of(actor, owner),
            })
            .collect()
    }

    /// Whether `actor` may edit the items of `review` now.
    #[must_use]
    pub fn can_edit(review: &PerformanceReview, actor: &User) -> bool {
        can_edit_items(review.status) && review.user_id == actor.id
    }
}

fn require_owner(
    review: &PerformanceReview,
    actor: &User,
    action: ReviewAction,
) -> Result<(), ReviewError> {
    if review.user_id == actor.id {
        Ok(())
    } else {
        Err(ReviewError::Forbidden(format!(
            "only the owner may {} this review",
            action
        )))
    }
}

fn require_manager(
    review: &PerformanceReview,
    owner: &User,
    actor: &User,
    action: ReviewAction,
) -> Result<(), ReviewError> {
    if owner.id != review.user_id {
        return Err(ReviewError::InvalidInput(format!(
            "user {} does not own review {}",
            owner.id, review.id
        )));
    }
    if is_manager_of(actor, owner) {
        Ok(())
    } else {
        Err(ReviewError::Forbidden(format!(
            "only the owner's manager may {} this review",
            action
        )))
    }
}

/// Trim a comment; blank becomes `None`.
fn clean_comment(comment: Option<&str>) -> Result<Option<String>, ReviewError> {
    let Some(text) = comment.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ReviewError::InvalidInput(format!(
            "comment exceeds {} characters",
            MAX_TEXT_LENGTH
        )));
    }
    Ok(Some(text.to_string()))
}

fn advance(
    review: &PerformanceReview,
    next: ReviewStatus,
    actor: &User,
    comment: Option<String>,
    at: u64,
) -> PerformanceReview {
    let mut updated = review.clone();
    updated.status = next;
    updated.updated_at = at;
    updated.approvals.push(ApprovalRecord {
        actor: actor.id,
        status: next,
        comment,
        at,
    });
    updated
}

// =============================================================================
// TESTS
// =============================================================================
