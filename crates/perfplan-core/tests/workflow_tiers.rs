//! # Workflow Tier Tests (T0-T3)
//!
//! ## Tiers
//! - T0: Plan validation
//! - T1: Status transitions and permissions
//! - T2: Scoring
//! - T3: Persistence through the service

#![allow(clippy::panic)]

use perfplan_core::{
    ItemScore, Period, Points, ReviewError, ReviewItem, ReviewService, ReviewStatus, User,
    seed::seed_demo,
};

fn period() -> Period {
    "2025-07".parse().expect("period")
}

fn plan(weights: &[i64]) -> Vec<ReviewItem> {
    weights
        .iter()
        .enumerate()
        .map(|(i, w)| {
            ReviewItem::work(
                format!("Goal {}", i + 1),
                "Deliver the goal",
                "Measured at month end",
                Points::whole(*w),
            )
        })
        .collect()
}

/// A service with a manager and one direct report.
fn team(service: &mut ReviewService) -> (User, User) {
    let manager = service
        .create_user(User::new("Manager", "manager@example.com"))
        .expect("manager");
    let mut owner = User::new("Li Si", "lisi@example.com");
    owner.manager_id = Some(manager.id);
    let owner = service.create_user(owner).expect("owner");
    (manager, owner)
}

// =============================================================================
// TIER T0: PLAN VALIDATION
// =============================================================================

mod t0_plan_validation {
    use super::*;

    /// T0.1: A plan of 50 + 30 submits.
    #[test]
    fn plan_of_eighty_submits() {
        let mut service = ReviewService::new();
        let (_, owner) = team(&mut service);
        let review = service
            .create_review(&owner, period(), plan(&[50, 30]), 1)
            .expect("create");
        let submitted = service.submit(&owner, review.id, 2).expect("submit");
        assert_eq!(submitted.status, ReviewStatus::PendingApproval);
    }

    /// T0.2: A plan of 50 + 20 can be saved but not submitted.
    #[test]
    fn plan_of_seventy_is_a_draft_only() {
        let mut service = ReviewService::new();
        let (_, owner) = team(&mut service);
        let review = service
            .create_review(&owner, period(), plan(&[50, 20]), 1)
            .expect("drafts may be incomplete");

        match service.submit(&owner, review.id, 2) {
            Err(ReviewError::WeightMismatch { actual }) => {
                assert_eq!(actual, Points::whole(70));
            }
            other => panic!("expected WeightMismatch, got {:?}", other),
        }
        let stored = service.review(review.id).expect("review");
        assert_eq!(stored.status, ReviewStatus::Draft);
    }

    /// T0.3: An empty plan cannot be submitted.
    #[test]
    fn empty_plan_rejected() {
        let mut service = ReviewService::new();
        let (_, owner) = team(&mut service);
        let review = service
            .create_review(&owner, period(), vec![], 1)
            .expect("create");
        assert!(matches!(
            service.submit(&owner, review.id, 2),
            Err(ReviewError::ItemCount { count: 0 })
        ));
    }
}

// =============================================================================
// TIER T1: TRANSITIONS
// =============================================================================

mod t1_transitions {
    use super::*;

    /// T1.1: Reject, edit, resubmit.
    #[test]
    fn rejected_plan_can_be_fixed_and_resubmitted() {
        let mut service = ReviewService::new();
        let (manager, owner) = team(&mut service);
        let review = service
            .create_review(&owner, period(), plan(&[80]), 1)
            .expect("create");
        service.submit(&owner, review.id, 2).expect("submit");

        assert!(matches!(
            service.reject(&manager, review.id, "", 3),
            Err(ReviewError::RejectionCommentRequired)
        ));
        service
            .reject(&manager, review.id, "Split the goal", 3)
            .expect("reject");

        service
            .update_review(&owner, review.id, plan(&[40, 40]), 4)
            .expect("edit while rejected");
        let resubmitted = service.submit(&owner, review.id, 5).expect("resubmit");
        assert_eq!(resubmitted.status, ReviewStatus::PendingApproval);
        assert_eq!(resubmitted.items.len(), 4);
    }

    /// T1.2: Pending plans are frozen.
    #[test]
    fn pending_plan_is_not_editable() {
        let mut service = ReviewService::new();
        let (_, owner) = team(&mut service);
        let review = service
            .create_review(&owner, period(), plan(&[80]), 1)
            .expect("create");
        service.submit(&owner, review.id, 2).expect("submit");
        assert!(matches!(
            service.update_review(&owner, review.id, plan(&[80]), 3),
            Err(ReviewError::NotEditable(ReviewStatus::PendingApproval))
        ));
    }

    /// T1.3: Only the direct manager decides.
    #[test]
    fn only_direct_manager_approves() {
        let mut service = ReviewService::new();
        let (_, owner) = team(&mut service);
        let other = service
            .create_user(User::new("Other Lead", "lead@example.com"))
            .expect("user");
        let review = service
            .create_review(&owner, period(), plan(&[80]), 1)
            .expect("create");
        service.submit(&owner, review.id, 2).expect("submit");

        assert!(matches!(
            service.approve(&other, review.id, None, 3),
            Err(ReviewError::Forbidden(_))
        ));
        assert!(matches!(
            service.approve(&owner, review.id, None, 3),
            Err(ReviewError::Forbidden(_))
        ));
    }
}

// =============================================================================
// TIER T2: SCORING
// =============================================================================

mod t2_scoring {
    use super::*;

    /// T2.1: 80×90 + 10×100 + 10×100 = 92, grade point 1.0.
    #[test]
    fn scored_plan_totals_ninety_two() {
        let mut service = ReviewService::new();
        let (manager, owner) = team(&mut service);
        let review = service
            .create_review(&owner, period(), plan(&[80]), 1)
            .expect("create");
        service.submit(&owner, review.id, 2).expect("submit");
        service.approve(&manager, review.id, None, 3).expect("approve");

        let scores: Vec<ItemScore> = review
            .items
            .iter()
            .map(|item| ItemScore {
                id: item.id,
                completion_details: "Delivered".to_string(),
                score: Some(if item.category.is_global() {
                    Points::whole(100)
                } else {
                    Points::whole(90)
                }),
            })
            .collect();
        let done = service
            .score(&manager, review.id, &scores, Some("Solid month"), 4)
            .expect("score");

        assert_eq!(done.total_score, Some(Points::whole(92)));
        assert_eq!(done.grade_point, Some(Points::from_hundredths(100)));
        assert_eq!(done.status, ReviewStatus::Completed);
    }

    /// T2.3: A total of 89.995 is shown as 90.00 but grades as 0.8.
    #[test]
    fn grade_band_ignores_display_rounding() {
        let mut service = ReviewService::new();
        let (manager, owner) = team(&mut service);
        let items = vec![
            ReviewItem::work("Goal 1", "d", "t", Points::from_hundredths(7950)),
            ReviewItem::work("Goal 2", "d", "t", Points::from_hundredths(50)),
        ];
        let review = service
            .create_review(&owner, period(), items, 1)
            .expect("create");
        service.submit(&owner, review.id, 2).expect("submit");
        service.approve(&manager, review.id, None, 3).expect("approve");

        let work_scores = [Points::whole(88), Points::whole(7)];
        let scores: Vec<ItemScore> = review
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| ItemScore {
                id: item.id,
                completion_details: String::new(),
                score: Some(if item.category.is_global() {
                    Points::whole(100)
                } else {
                    work_scores[i]
                }),
            })
            .collect();
        let done = service
            .score(&manager, review.id, &scores, None, 4)
            .expect("score");

        assert_eq!(done.total_score, Some(Points::whole(90)));
        assert_eq!(done.grade_point, Some(Points::from_hundredths(80)));
    }

    /// T2.2: Out-of-range scores are rejected and nothing changes.
    #[test]
    fn out_of_range_score_rejected() {
        let mut service = ReviewService::new();
        let (manager, owner) = team(&mut service);
        let review = service
            .create_review(&owner, period(), plan(&[80]), 1)
            .expect("create");
        service.submit(&owner, review.id, 2).expect("submit");
        let approved = service.approve(&manager, review.id, None, 3).expect("approve");

        let scores = [ItemScore {
            id: approved.items[0].id,
            completion_details: String::new(),
            score: Some(Points::whole(130)),
        }];
        assert!(matches!(
            service.score(&manager, review.id, &scores, None, 4),
            Err(ReviewError::ScoreOutOfRange { .. })
        ));
        assert_eq!(service.review(review.id).expect("review"), approved);
    }
}

// =============================================================================
// TIER T3: PERSISTENCE
// =============================================================================

mod t3_persistence {
    use super::*;
    use tempfile::tempdir;

    /// T3.1: Seeded data and workflow state survive a reopen.
    #[test]
    fn redb_service_survives_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("perfplan.db");

        let review_id = {
            let mut service = ReviewService::with_redb(&path).expect("open");
            assert!(service.is_persistent());
            assert!(seed_demo(&mut service, 1_752_000_000).expect("seed"));
            let owner = service
                .user_by_email("lisi@example.com")
                .expect("lookup")
                .expect("seeded");
            service.user_reviews(owner.id).expect("reviews")[0].id
        };

        let service = ReviewService::with_redb(&path).expect("reopen");
        let review = service.review(review_id).expect("review");
        assert_eq!(review.status, ReviewStatus::Evaluating);
        assert_eq!(review.approvals.len(), 2);

        let stats = service.stats().expect("stats");
        assert_eq!(stats.users, 5);
        assert!(stats.persistent);
    }

    /// T3.2: The score sheet of a seeded store verifies.
    #[test]
    fn score_sheet_checksum_verifies() {
        let mut service = ReviewService::new();
        seed_demo(&mut service, 0).expect("seed");
        let sheet = service.score_sheet(period()).expect("sheet");
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].department, "Platform");
        assert!(sheet.verify().expect("verify"));
    }
}
