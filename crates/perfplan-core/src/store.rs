//! # Review Store
//!
//! The storage abstraction for reviews and the user directory, and the
//! in-memory implementation.
//!
//! Both implementations ([`MemoryStore`] and [`crate::storage::RedbStore`])
//! must behave identically:
//! - ids start at 1 and are assigned on insert
//! - a user has at most one review per period (`Conflict` otherwise)
//! - emails are unique, compared case-insensitively
//! - listings are ordered by id

use std::collections::BTreeMap;

use crate::types::{
    Department, DepartmentId, Period, PerformanceReview, ReviewError, ReviewId, Role, RoleId,
    SystemSetting, User, UserId,
};

/// Trait for review storage backends.
pub trait ReviewStore {
    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Insert a user, assigning its id. Fails with `Conflict` on a taken email.
    fn insert_user(&mut self, user: User) -> Result<User, ReviewError>;

    /// Overwrite an existing user.
    fn update_user(&mut self, user: &User) -> Result<(), ReviewError>;

    fn get_user(&self, id: UserId) -> Result<Option<User>, ReviewError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ReviewError>;

    fn list_users(&self) -> Result<Vec<User>, ReviewError>;

    // -------------------------------------------------------------------------
    // Roles and departments
    // -------------------------------------------------------------------------

    fn insert_role(&mut self, role: Role) -> Result<Role, ReviewError>;

    fn get_role(&self, id: RoleId) -> Result<Option<Role>, ReviewError>;

    fn list_roles(&self) -> Result<Vec<Role>, ReviewError>;

    fn insert_department(&mut self, department: Department) -> Result<Department, ReviewError>;

    fn get_department(&self, id: DepartmentId) -> Result<Option<Department>, ReviewError>;

    fn list_departments(&self) -> Result<Vec<Department>, ReviewError>;

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    /// Insert or replace a setting.
    fn put_setting(&mut self, setting: SystemSetting) -> Result<(), ReviewError>;

    fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, ReviewError>;

    /// All settings ordered by key.
    fn list_settings(&self) -> Result<Vec<SystemSetting>, ReviewError>;

    // -------------------------------------------------------------------------
    // Reviews
    // -------------------------------------------------------------------------

    /// Insert a review, assigning its id. Fails with `Conflict` if the user
    /// already has a review for the period.
    fn insert_review(&mut self, review: PerformanceReview)
    -> Result<PerformanceReview, ReviewError>;

    /// Overwrite an existing review. Owner and period must not change.
    fn save_review(&mut self, review: &PerformanceReview) -> Result<(), ReviewError>;

    fn get_review(&self, id: ReviewId) -> Result<Option<PerformanceReview>, ReviewError>;

    /// The review of `user` for `period`, if any.
    fn find_review(
        &self,
        user: UserId,
        period: Period,
    ) -> Result<Option<PerformanceReview>, ReviewError>;

    fn list_reviews(&self) -> Result<Vec<PerformanceReview>, ReviewError>;
}

/// In-memory store backed by `BTreeMap`s.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: BTreeMap<UserId, User>,
    roles: BTreeMap<RoleId, Role>,
    departments: BTreeMap<DepartmentId, Department>,
    settings: BTreeMap<String, String>,
    reviews: BTreeMap<ReviewId, PerformanceReview>,
    review_index: BTreeMap<(UserId, Period), ReviewId>,
    next_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
    }
}

impl ReviewStore for MemoryStore {
    fn insert_user(&mut self, mut user: User) -> Result<User, ReviewError> {
        if self.email_taken(&user.email, None) {
            return Err(email_conflict(&user.email));
        }
        user.id = UserId(self.allocate());
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn update_user(&mut self, user: &User) -> Result<(), ReviewError> {
        if !self.users.contains_key(&user.id) {
            return Err(ReviewError::NotFound(format!("user {}", user.id)));
        }
        if self.email_taken(&user.email, Some(user.id)) {
            return Err(email_conflict(&user.email));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, ReviewError> {
        Ok(self.users.get(&id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ReviewError> {
        Ok(self
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, ReviewError> {
        Ok(self.users.values().cloned().collect())
    }

    fn insert_role(&mut self, mut role: Role) -> Result<Role, ReviewError> {
        role.id = RoleId(self.allocate());
        self.roles.insert(role.id, role.clone());
        Ok(role)
    }

    fn get_role(&self, id: RoleId) -> Result<Option<Role>, ReviewError> {
        Ok(self.roles.get(&id).cloned())
    }

    fn list_roles(&self) -> Result<Vec<Role>, ReviewError> {
        Ok(self.roles.values().cloned().collect())
    }

    fn insert_department(&mut self, mut department: Department) -> Result<Department, ReviewError> {
        department.id = DepartmentId(self.allocate());
        self.departments.insert(department.id, department.clone());
        Ok(department)
    }

    fn get_department(&self, id: DepartmentId) -> Result<Option<Department>, ReviewError> {
        Ok(self.departments.get(&id).cloned())
    }

    fn list_departments(&self) -> Result<Vec<Department>, ReviewError> {
        Ok(self.departments.values().cloned().collect())
    }

    fn put_setting(&mut self, setting: SystemSetting) -> Result<(), ReviewError> {
        self.settings.insert(setting.key, setting.value);
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, ReviewError> {
        Ok(self.settings.get(key).map(|value| SystemSetting {
            key: key.to_string(),
            value: value.clone(),
        }))
    }

    fn list_settings(&self) -> Result<Vec<SystemSetting>, ReviewError> {
        Ok(self
            .settings
            .iter()
            .map(|(key, value)| SystemSetting {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    fn insert_review(
        &mut self,
        mut review: PerformanceReview,
    ) -> Result<PerformanceReview, ReviewError> {
        let key = (review.user_id, review.period);
        if self.review_index.contains_key(&key) {
            return Err(period_conflict(review.user_id, review.period));
        }
        review.id = ReviewId(self.allocate());
        self.review_index.insert(key, review.id);
        self.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    fn save_review(&mut self, review: &PerformanceReview) -> Result<(), ReviewError> {
        let existing = self
            .reviews
            .get(&review.id)
            .ok_or_else(|| ReviewError::NotFound(format!("review {}", review.id)))?;
        if existing.user_id != review.user_id || existing.period != review.period {
            return Err(ReviewError::InvalidInput(
                "owner and period of a review cannot change".to_string(),
            ));
        }
        self.reviews.insert(review.id, review.clone());
        Ok(())
    }

    fn get_review(&self, id: ReviewId) -> Result<Option<PerformanceReview>, ReviewError> {
        Ok(self.reviews.get(&id).cloned())
    }

    fn find_review(
        &self,
        user: UserId,
        period: Period,
    ) -> Result<Option<PerformanceReview>, ReviewError> {
        Ok(self
            .review_index
            .get(&(user, period))
            .and_then(|id| self.reviews.get(id))
            .cloned())
    }

    fn list_reviews(&self) -> Result<Vec<PerformanceReview>, ReviewError> {
        Ok(self.reviews.values().cloned().collect())
    }
}

pub(crate) fn email_conflict(email: &str) -> ReviewError {
    ReviewError::Conflict(format!("email '{}' is already registered", email))
}

pub(crate) fn period_conflict(user: UserId, period: Period) -> ReviewError {
    ReviewError::Conflict(format!(
        "user {} already has a review for {}",
        user, period
    ))
}
