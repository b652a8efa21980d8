//! # redb-backed Review Storage
//!
//! A disk-backed [`ReviewStore`] using the redb embedded database.
//!
//! - ACID transactions: every mutation is one write transaction
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are postcard-encoded and keyed by id. A `(user_id, period)`
//! index enforces one review per user and period, and a metadata table
//! holds the id counter shared by all record kinds.

use crate::store::{ReviewStore, email_conflict, period_conflict};
use crate::types::{
    Department, DepartmentId, Period, PerformanceReview, ReviewError, ReviewId, Role, RoleId,
    SystemSetting, User, UserId,
};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Id-keyed table of postcard-encoded records.
type RecordTable = TableDefinition<'static, u64, &'static [u8]>;

/// Users: UserId -> User bytes
const USERS: RecordTable = TableDefinition::new("users");

/// Roles: RoleId -> Role bytes
const ROLES: RecordTable = TableDefinition::new("roles");

/// Departments: DepartmentId -> Department bytes
const DEPARTMENTS: RecordTable = TableDefinition::new("departments");

/// Reviews: ReviewId -> PerformanceReview bytes
const REVIEWS: RecordTable = TableDefinition::new("reviews");

/// Review index: (user_id, "YYYY-MM") -> ReviewId
const REVIEW_INDEX: TableDefinition<(u64, &str), u64> = TableDefinition::new("review_index");

/// Settings: key -> value
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

/// Metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_ID_KEY: &str = "next_id";

fn io(e: impl std::fmt::Display) -> ReviewError {
    ReviewError::IoError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ReviewError> {
    postcard::to_allocvec(value).map_err(|e| ReviewError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ReviewError> {
    postcard::from_bytes(bytes).map_err(|e| ReviewError::SerializationError(e.to_string()))
}

/// A disk-backed review store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a review database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReviewError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io)?;
            for table in [USERS, ROLES, DEPARTMENTS, REVIEWS] {
                let _ = write_txn.open_table(table).map_err(io)?;
            }
            let _ = write_txn.open_table(REVIEW_INDEX).map_err(io)?;
            let _ = write_txn.open_table(SETTINGS).map_err(io)?;
            let _ = write_txn.open_table(METADATA).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        Ok(Self { db })
    }

    /// Number of reviews stored, without decoding them.
    pub fn review_count(&self) -> Result<u64, ReviewError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(REVIEWS).map_err(io)?;
        table.len().map_err(io)
    }

    fn get_record<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        id: u64,
    ) -> Result<Option<T>, ReviewError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(table).map_err(io)?;
        let guard = table.get(id).map_err(io)?;
        guard.map(|data| decode(data.value())).transpose()
    }

    fn list_records<T: DeserializeOwned>(&self, table: RecordTable) -> Result<Vec<T>, ReviewError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(table).map_err(io)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(io)? {
            let (_, value) = entry.map_err(io)?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    /// Write one record in its own transaction, optionally allocating its id.
    fn write_record<T, F>(
        &mut self,
        table: RecordTable,
        id: Option<u64>,
        mut record: T,
        assign: F,
    ) -> Result<T, ReviewError>
    where
        T: Serialize,
        F: FnOnce(&mut T, u64),
    {
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let id = match id {
                Some(id) => id,
                None => allocate_id(&write_txn)?,
            };
            assign(&mut record, id);
            let bytes = encode(&record)?;
            let mut table = write_txn.open_table(table).map_err(io)?;
            table.insert(id, bytes.as_slice()).map_err(io)?;
        }
        write_txn.commit().map_err(io)?;
        Ok(record)
    }
}

/// Bump and return the shared id counter inside `txn`.
fn allocate_id(txn: &WriteTransaction) -> Result<u64, ReviewError> {
    let mut meta = txn.open_table(METADATA).map_err(io)?;
    let next = meta
        .get(NEXT_ID_KEY)
        .map_err(io)?
        .map(|v| v.value())
        .unwrap_or(0)
        .saturating_add(1);
    meta.insert(NEXT_ID_KEY, next).map_err(io)?;
    Ok(next)
}

impl ReviewStore for RedbStore {
    fn insert_user(&mut self, user: User) -> Result<User, ReviewError> {
        if self.find_user_by_email(&user.email)?.is_some() {
            return Err(email_conflict(&user.email));
        }
        self.write_record(USERS, None, user, |u, id| u.id = UserId(id))
    }

    fn update_user(&mut self, user: &User) -> Result<(), ReviewError> {
        if self.get_user(user.id)?.is_none() {
            return Err(ReviewError::NotFound(format!("user {}", user.id)));
        }
        let taken = self
            .find_user_by_email(&user.email)?
            .is_some_and(|other| other.id != user.id);
        if taken {
            return Err(email_conflict(&user.email));
        }
        self.write_record(USERS, Some(user.id.0), user.clone(), |_, _| {})?;
        Ok(())
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, ReviewError> {
        self.get_record(USERS, id.0)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ReviewError> {
        Ok(self
            .list_users()?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    fn list_users(&self) -> Result<Vec<User>, ReviewError> {
        self.list_records(USERS)
    }

    fn insert_role(&mut self, role: Role) -> Result<Role, ReviewError> {
        self.write_record(ROLES, None, role, |r, id| r.id = RoleId(id))
    }

    fn get_role(&self, id: RoleId) -> Result<Option<Role>, ReviewError> {
        self.get_record(ROLES, id.0)
    }

    fn list_roles(&self) -> Result<Vec<Role>, ReviewError> {
        self.list_records(ROLES)
    }

    fn insert_department(&mut self, department: Department) -> Result<Department, ReviewError> {
        self.write_record(DEPARTMENTS, None, department, |d, id| {
            d.id = DepartmentId(id);
        })
    }

    fn get_department(&self, id: DepartmentId) -> Result<Option<Department>, ReviewError> {
        self.get_record(DEPARTMENTS, id.0)
    }

    fn list_departments(&self) -> Result<Vec<Department>, ReviewError> {
        self.list_records(DEPARTMENTS)
    }

    fn put_setting(&mut self, setting: SystemSetting) -> Result<(), ReviewError> {
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = write_txn.open_table(SETTINGS).map_err(io)?;
            table
                .insert(setting.key.as_str(), setting.value.as_str())
                .map_err(io)?;
        }
        write_txn.commit().map_err(io)?;
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, ReviewError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(SETTINGS).map_err(io)?;
        let value = table.get(key).map_err(io)?.map(|v| v.value().to_string());
        Ok(value.map(|value| SystemSetting {
            key: key.to_string(),
            value,
        }))
    }

    fn list_settings(&self) -> Result<Vec<SystemSetting>, ReviewError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(SETTINGS).map_err(io)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(io)? {
            let (key, value) = entry.map_err(io)?;
            out.push(SystemSetting {
                key: key.value().to_string(),
                value: value.value().to_string(),
            });
        }
        Ok(out)
    }

    fn insert_review(
        &mut self,
        mut review: PerformanceReview,
    ) -> Result<PerformanceReview, ReviewError> {
        let period = review.period.to_string();
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut index = write_txn.open_table(REVIEW_INDEX).map_err(io)?;
            if index
                .get((review.user_id.0, period.as_str()))
                .map_err(io)?
                .is_some()
            {
                return Err(period_conflict(review.user_id, review.period));
            }
            review.id = ReviewId(allocate_id(&write_txn)?);
            index
                .insert((review.user_id.0, period.as_str()), review.id.0)
                .map_err(io)?;

            let bytes = encode(&review)?;
            let mut reviews = write_txn.open_table(REVIEWS).map_err(io)?;
            reviews.insert(review.id.0, bytes.as_slice()).map_err(io)?;
        }
        write_txn.commit().map_err(io)?;
        Ok(review)
    }

    fn save_review(&mut self, review: &PerformanceReview) -> Result<(), ReviewError> {
        let existing = self
            .get_review(review.id)?
            .ok_or_else(|| ReviewError::NotFound(format!("review {}", review.id)))?;
        if existing.user_id != review.user_id || existing.period != review.period {
            return Err(ReviewError::InvalidInput(
                "owner and period of a review cannot change".to_string(),
            ));
        }
        self.write_record(REVIEWS, Some(review.id.0), review.clone(), |_, _| {})?;
        Ok(())
    }

    fn get_review(&self, id: ReviewId) -> Result<Option<PerformanceReview>, ReviewError> {
        self.get_record(REVIEWS, id.0)
    }

    fn find_review(
        &self,
        user: UserId,
        period: Period,
    ) -> Result<Option<PerformanceReview>, ReviewError> {
        let id = {
            let read_txn = self.db.begin_read().map_err(io)?;
            let index = read_txn.open_table(REVIEW_INDEX).map_err(io)?;
            let period = period.to_string();
            index
                .get((user.0, period.as_str()))
                .map_err(io)?
                .map(|v| v.value())
        };
        match id {
            Some(id) => self.get_review(ReviewId(id)),
            None => Ok(None),
        }
    }

    fn list_reviews(&self) -> Result<Vec<PerformanceReview>, ReviewError> {
        self.list_records(REVIEWS)
    }
}

// =============================================================================
// TESTS
// =============================================================================
