//! # Demo Seed
//!
//! Populates an empty store with a small organisation and one review in
//! progress, so a fresh install can be explored immediately.

use crate::roles::RoleKind;
use crate::service::ReviewService;
use crate::types::{Points, ReviewError, ReviewItem, User};

/// Email of the seeded manager; its presence marks a seeded store.
pub const SEED_MARKER_EMAIL: &str = "manager@example.com";

/// Period of the seeded sample review.
pub const SEED_PERIOD: &str = "2025-07";

/// Seed demo data. Returns `false` if the store was already seeded.
pub fn seed_demo(service: &mut ReviewService, at: u64) -> Result<bool, ReviewError> {
    if service.user_by_email(SEED_MARKER_EMAIL)?.is_some() {
        return Ok(false);
    }

    let mut role_ids = Vec::new();
    for (kind, description) in [
        (RoleKind::Employee, "Submits monthly plans"),
        (RoleKind::TeamLead, "Approves and scores direct reports"),
        (RoleKind::Director, "Approves and scores team leads"),
        (RoleKind::Hr, "Views all submitted reviews"),
        (RoleKind::Admin, "Manages users, departments and settings"),
    ] {
        let role = service.create_role(kind.name(), description)?;
        role_ids.push((kind, role.id));
    }
    let role = |kind: RoleKind| {
        role_ids
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, id)| *id)
    };

    let engineering = service.create_department("Engineering", None)?;
    let platform = service.create_department("Platform", Some(engineering.id))?;
    let people = service.create_department("People", None)?;

    let mut manager = User::new("Zhang San", SEED_MARKER_EMAIL);
    manager.english_name = "Sam".to_string();
    manager.department_id = Some(platform.id);
    manager.role_id = role(RoleKind::TeamLead);
    let manager = service.create_user(manager)?;

    let mut employees = Vec::new();
    for (name, english, email) in [
        ("Li Si", "Lee", "lisi@example.com"),
        ("Zhao Wu", "Will", "zhaowu@example.com"),
    ] {
        let mut user = User::new(name, email);
        user.english_name = english.to_string();
        user.department_id = Some(platform.id);
        user.role_id = role(RoleKind::Employee);
        user.manager_id = Some(manager.id);
        employees.push(service.create_user(user)?);
    }

    let mut hr = User::new("Wang Fang", "hr@example.com");
    hr.department_id = Some(people.id);
    hr.role_id = role(RoleKind::Hr);
    service.create_user(hr)?;

    let mut admin = User::new("Administrator", "admin@example.com");
    admin.role_id = role(RoleKind::Admin);
    service.create_user(admin)?;

    service.put_setting("review_cycle", "monthly")?;

    if let Some(owner) = employees.first() {
        let items = vec![
            ReviewItem::work(
                "Release the review workflow",
                "Ship submit, approve and score for monthly plans",
                "Live for all teams by month end",
                Points::whole(50),
            ),
            ReviewItem::work(
                "Storage hardening",
                "Move review storage to the embedded database",
                "No data loss across restarts",
                Points::whole(30),
            ),
        ];
        let review = service.create_review(owner, SEED_PERIOD.parse()?, items, at)?;
        service.submit(owner, review.id, at)?;
        service.approve(&manager, review.id, Some("Plan looks good"), at)?;
    }

    Ok(true)
}
