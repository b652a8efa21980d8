//! # Review Service
//!
//! The facade the server and CLI talk to. It loads records from the
//! configured [`ReviewStore`], runs the [`Workflow`] checks and persists
//! the result.
//!
//! ## Storage Backends
//!
//! - `InMemory`: [`MemoryStore`] (fast, volatile)
//! - `Persistent`: [`RedbStore`] (disk-backed, ACID)
//!
//! Every mutating operation takes the acting [`User`] and the current time
//! in unix seconds; the service never reads a clock.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::items::{normalize_plan, validate_draft};
use crate::primitives::{MAX_NAME_LENGTH, MAX_SETTING_KEY_LENGTH, MAX_SETTING_VALUE_LENGTH};
use crate::report::{PeriodSummary, ScoreSheet};
use crate::roles::{Capabilities, RoleKind, require_hr};
use crate::scoring::{ItemScore, ScoreCard};
use crate::storage::RedbStore;
use crate::store::{MemoryStore, ReviewStore};
use crate::types::{
    Department, DepartmentId, Period, PerformanceReview, ReviewAction, ReviewError, ReviewId,
    ReviewItem, ReviewStatus, Role, RoleId, SystemSetting, User, UserId,
};
use crate::workflow::{Workflow, is_manager_of};

/// Storage backend for a ReviewService.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory maps (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// Full replacement of a user's editable fields (admin operation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub name: String,
    #[serde(default)]
    pub english_name: String,
    pub email: String,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub role_id: Option<RoleId>,
    #[serde(default)]
    pub manager_id: Option<UserId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// A review together with the viewer-specific display hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: PerformanceReview,
    pub available_actions: Vec<ReviewAction>,
    pub can_edit: bool,
    pub score_card: ScoreCard,
}

/// Record counts for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub persistent: bool,
    pub users: usize,
    pub roles: usize,
    pub departments: usize,
    pub reviews: usize,
    pub by_status: BTreeMap<ReviewStatus, usize>,
}

/// Entry point for all review operations.
#[derive(Debug, Default)]
pub struct ReviewService {
    backend: StorageBackend,
}

impl ReviewService {
    /// Create a service with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service with persistent redb storage at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, ReviewError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    fn store(&self) -> &dyn ReviewStore {
        match &self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn ReviewStore {
        match &mut self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }

    // =========================================================================
    // DIRECTORY
    // =========================================================================

    pub fn user(&self, id: UserId) -> Result<User, ReviewError> {
        self.store()
            .get_user(id)?
            .ok_or_else(|| ReviewError::NotFound(format!("user {}", id)))
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>, ReviewError> {
        self.store().find_user_by_email(email.trim())
    }

    pub fn users(&self) -> Result<Vec<User>, ReviewError> {
        self.store().list_users()
    }

    /// Role kind of a user. Users without a role are employees.
    pub fn role_kind(&self, user: &User) -> Result<RoleKind, ReviewError> {
        Ok(match user.role_id {
            Some(id) => self
                .store()
                .get_role(id)?
                .map(|role| RoleKind::from_name(&role.name))
                .unwrap_or(RoleKind::Employee),
            None => RoleKind::Employee,
        })
    }

    pub fn capabilities(&self, user: &User) -> Result<Capabilities, ReviewError> {
        Ok(Capabilities::for_role(self.role_kind(user)?))
    }

    /// Create a user. Name and email are required; references must exist.
    pub fn create_user(&mut self, user: User) -> Result<User, ReviewError> {
        self.check_user_fields(&user)?;
        self.store_mut().insert_user(user)
    }

    /// Replace the editable fields of an existing user.
    pub fn update_user(&mut self, id: UserId, update: UserUpdate) -> Result<User, ReviewError> {
        let mut user = self.user(id)?;
        user.name = update.name.trim().to_string();
        user.english_name = update.english_name.trim().to_string();
        user.email = update.email.trim().to_string();
        user.department_id = update.department_id;
        user.role_id = update.role_id;
        user.manager_id = update.manager_id;
        user.is_active = update.is_active;
        self.check_user_fields(&user)?;
        self.store_mut().update_user(&user)?;
        Ok(user)
    }

    fn check_user_fields(&self, user: &User) -> Result<(), ReviewError> {
        check_name("name", &user.name)?;
        check_name("email", &user.email)?;
        if !user.email.contains('@') {
            return Err(ReviewError::InvalidInput(format!(
                "'{}' is not an email address",
                user.email
            )));
        }
        if let Some(id) = user.department_id {
            if self.store().get_department(id)?.is_none() {
                return Err(ReviewError::NotFound(format!("department {}", id.0)));
            }
        }
        if let Some(id) = user.role_id {
            if self.store().get_role(id)?.is_none() {
                return Err(ReviewError::NotFound(format!("role {}", id.0)));
            }
        }
        if let Some(id) = user.manager_id {
            if id == user.id {
                return Err(ReviewError::InvalidInput(
                    "a user cannot manage themselves".to_string(),
                ));
            }
            self.user(id)?;
        }
        Ok(())
    }

    pub fn roles(&self) -> Result<Vec<Role>, ReviewError> {
        self.store().list_roles()
    }

    pub fn create_role(&mut self, name: &str, description: &str) -> Result<Role, ReviewError> {
        check_name("role name", name)?;
        self.store_mut().insert_role(Role {
            id: RoleId(0),
            name: name.trim().to_string(),
            description: description.trim().to_string(),
        })
    }

    pub fn departments(&self) -> Result<Vec<Department>, ReviewError> {
        self.store().list_departments()
    }

    pub fn create_department(
        &mut self,
        name: &str,
        parent_id: Option<DepartmentId>,
    ) -> Result<Department, ReviewError> {
        check_name("department name", name)?;
        if let Some(parent) = parent_id {
            if self.store().get_department(parent)?.is_none() {
                return Err(ReviewError::NotFound(format!("department {}", parent.0)));
            }
        }
        self.store_mut().insert_department(Department {
            id: DepartmentId(0),
            name: name.trim().to_string(),
            parent_id,
        })
    }

    pub fn settings(&self) -> Result<Vec<SystemSetting>, ReviewError> {
        self.store().list_settings()
    }

    pub fn setting(&self, key: &str) -> Result<Option<SystemSetting>, ReviewError> {
        self.store().get_setting(key)
    }

    /// Insert or replace a setting.
    pub fn put_setting(&mut self, key: &str, value: &str) -> Result<SystemSetting, ReviewError> {
        let key = key.trim();
        if key.is_empty() || key.len() > MAX_SETTING_KEY_LENGTH {
            return Err(ReviewError::InvalidInput(format!(
                "setting key must be 1-{} bytes",
                MAX_SETTING_KEY_LENGTH
            )));
        }
        if value.len() > MAX_SETTING_VALUE_LENGTH {
            return Err(ReviewError::InvalidInput(format!(
                "setting value exceeds {} bytes",
                MAX_SETTING_VALUE_LENGTH
            )));
        }
        let setting = SystemSetting {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.store_mut().put_setting(setting.clone())?;
        Ok(setting)
    }

    // =========================================================================
    // REVIEW QUERIES
    // =========================================================================

    pub fn review(&self, id: ReviewId) -> Result<PerformanceReview, ReviewError> {
        self.store()
            .get_review(id)?
            .ok_or_else(|| ReviewError::NotFound(format!("review {}", id)))
    }

    /// Fetch a review as `viewer` sees it.
    ///
    /// Visible to the owner, the owner's manager, HR and admins.
    pub fn view_review(&self, viewer: &User, id: ReviewId) -> Result<ReviewView, ReviewError> {
        let review = self.review(id)?;
        let owner = self.user(review.user_id)?;
        let visible = review.user_id == viewer.id
            || is_manager_of(viewer, &owner)
            || self.role_kind(viewer)?.is_hr();
        if !visible {
            return Err(ReviewError::Forbidden(format!(
                "review {} is not visible to user {}",
                id, viewer.id
            )));
        }
        Ok(ReviewView {
            available_actions: Workflow::available_actions(&review, &owner, viewer),
            can_edit: Workflow::can_edit(&review, viewer),
            score_card: ScoreCard::of(&review.items),
            review,
        })
    }

    /// The review of `user` for `period`, if any.
    pub fn review_for_period(
        &self,
        user: UserId,
        period: Period,
    ) -> Result<Option<PerformanceReview>, ReviewError> {
        self.store().find_review(user, period)
    }

    /// All reviews of `user`, newest period first.
    pub fn user_reviews(&self, user: UserId) -> Result<Vec<PerformanceReview>, ReviewError> {
        let mut reviews: Vec<PerformanceReview> = self
            .store()
            .list_reviews()?
            .into_iter()
            .filter(|r| r.user_id == user)
            .collect();
        reviews.sort_by(|a, b| b.period.cmp(&a.period));
        Ok(reviews)
    }

    /// Submitted reviews of the manager's direct reports, newest first.
    pub fn team_reviews(&self, manager: &User) -> Result<Vec<PerformanceReview>, ReviewError> {
        let team: Vec<UserId> = self
            .users()?
            .into_iter()
            .filter(|u| u.manager_id == Some(manager.id))
            .map(|u| u.id)
            .collect();
        let mut reviews: Vec<PerformanceReview> = self
            .store()
            .list_reviews()?
            .into_iter()
            .filter(|r| r.status.is_submitted() && team.contains(&r.user_id))
            .collect();
        sort_newest_first(&mut reviews);
        Ok(reviews)
    }

    /// HR: every submitted review, newest period first.
    pub fn submitted_reviews(&self, viewer: &User) -> Result<Vec<PerformanceReview>, ReviewError> {
        require_hr(self.role_kind(viewer)?)?;
        let mut reviews = self.submitted()?;
        sort_newest_first(&mut reviews);
        Ok(reviews)
    }

    /// HR: submitted reviews of one period, by user.
    pub fn period_reviews(
        &self,
        viewer: &User,
        period: Period,
    ) -> Result<Vec<PerformanceReview>, ReviewError> {
        require_hr(self.role_kind(viewer)?)?;
        let mut reviews: Vec<PerformanceReview> = self
            .submitted()?
            .into_iter()
            .filter(|r| r.period == period)
            .collect();
        reviews.sort_by_key(|r| r.user_id);
        Ok(reviews)
    }

    /// HR: aggregate report of one period.
    pub fn period_summary(
        &self,
        viewer: &User,
        period: Period,
    ) -> Result<PeriodSummary, ReviewError> {
        require_hr(self.role_kind(viewer)?)?;
        self.summary(period)
    }

    /// Aggregate report of one period, without a viewer check.
    ///
    /// For operator tooling that already has direct access to the store.
    pub fn summary(&self, period: Period) -> Result<PeriodSummary, ReviewError> {
        Ok(PeriodSummary::build(period, &self.store().list_reviews()?))
    }

    /// HR: score sheet of one period.
    pub fn period_sheet(&self, viewer: &User, period: Period) -> Result<ScoreSheet, ReviewError> {
        require_hr(self.role_kind(viewer)?)?;
        self.score_sheet(period)
    }

    /// Score sheet of a single submitted review.
    ///
    /// Available to the owner's manager (the scorer) and HR.
    pub fn review_sheet(&self, viewer: &User, id: ReviewId) -> Result<ScoreSheet, ReviewError> {
        let review = self.review(id)?;
        let owner = self.user(review.user_id)?;
        if !is_manager_of(viewer, &owner) && !self.role_kind(viewer)?.is_hr() {
            return Err(ReviewError::Forbidden(format!(
                "score sheet of review {} is not available to user {}",
                id, viewer.id
            )));
        }
        if !review.status.is_submitted() {
            return Err(ReviewError::Conflict(format!(
                "review {} has not been submitted",
                id
            )));
        }
        ScoreSheet::build(
            review.period,
            std::slice::from_ref(&review),
            &[owner],
            &self.departments()?,
            &self.roles()?,
        )
    }

    /// Exportable score sheet of one period, without a viewer check.
    pub fn score_sheet(&self, period: Period) -> Result<ScoreSheet, ReviewError> {
        ScoreSheet::build(
            period,
            &self.store().list_reviews()?,
            &self.users()?,
            &self.departments()?,
            &self.roles()?,
        )
    }

    fn submitted(&self) -> Result<Vec<PerformanceReview>, ReviewError> {
        Ok(self
            .store()
            .list_reviews()?
            .into_iter()
            .filter(|r| r.status.is_submitted())
            .collect())
    }

    pub fn stats(&self) -> Result<ServiceStats, ReviewError> {
        let reviews = self.store().list_reviews()?;
        let mut by_status = BTreeMap::new();
        for review in &reviews {
            *by_status.entry(review.status).or_insert(0) += 1;
        }
        Ok(ServiceStats {
            persistent: self.is_persistent(),
            users: self.users()?.len(),
            roles: self.roles()?.len(),
            departments: self.departments()?.len(),
            reviews: reviews.len(),
            by_status,
        })
    }

    // =========================================================================
    // REVIEW MUTATIONS
    // =========================================================================

    /// Create a Draft review owned by `actor`.
    pub fn create_review(
        &mut self,
        actor: &User,
        period: Period,
        items: Vec<ReviewItem>,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let plan = normalize_plan(items);
        validate_draft(&plan)?;
        self.store_mut()
            .insert_review(PerformanceReview::draft(actor.id, period, plan, at))
    }

    /// Replace the items of a Draft or Rejected review.
    pub fn update_review(
        &mut self,
        actor: &User,
        id: ReviewId,
        items: Vec<ReviewItem>,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let review = self.review(id)?;
        let updated = Workflow::edit_items(&review, actor, items, at)?;
        self.store_mut().save_review(&updated)?;
        Ok(updated)
    }

    pub fn submit(
        &mut self,
        actor: &User,
        id: ReviewId,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let review = self.review(id)?;
        let updated = Workflow::submit(&review, actor, at)?;
        self.store_mut().save_review(&updated)?;
        Ok(updated)
    }

    pub fn approve(
        &mut self,
        actor: &User,
        id: ReviewId,
        comment: Option<&str>,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let review = self.review(id)?;
        let owner = self.user(review.user_id)?;
        let updated = Workflow::approve(&review, &owner, actor, comment, at)?;
        self.store_mut().save_review(&updated)?;
        Ok(updated)
    }

    pub fn reject(
        &mut self,
        actor: &User,
        id: ReviewId,
        comment: &str,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let review = self.review(id)?;
        let owner = self.user(review.user_id)?;
        let updated = Workflow::reject(&review, &owner, actor, comment, at)?;
        self.store_mut().save_review(&updated)?;
        Ok(updated)
    }

    pub fn score(
        &mut self,
        actor: &User,
        id: ReviewId,
        scores: &[ItemScore],
        final_comment: Option<&str>,
        at: u64,
    ) -> Result<PerformanceReview, ReviewError> {
        let review = self.review(id)?;
        let owner = self.user(review.user_id)?;
        let updated = Workflow::score(&review, &owner, actor, scores, final_comment, at)?;
        self.store_mut().save_review(&updated)?;
        Ok(updated)
    }
}

fn check_name(what: &str, value: &str) -> Result<(), ReviewError> {
    let len = value.trim().chars().count();
    if len == 0 || len > MAX_NAME_LENGTH {
        return Err(ReviewError::InvalidInput(format!(
            "{} must be 1-{} characters",
            what, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

fn sort_newest_first(reviews: &mut [PerformanceReview]) {
    reviews.sort_by(|a, b| b.period.cmp(&a.period).then(a.user_id.cmp(&b.user_id)));
}

// =============================================================================
// TESTS
// =============================================================================
