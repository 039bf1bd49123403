use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account. The password hash never leaves the crate;
/// outward-facing payloads use [`UserProfile`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public view of a user, safe to hand to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// An issued bearer session. Expired sessions are pruned on authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Token handed back to a caller after login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// One recorded cycle. Identity for duplicate detection is the triple
/// (owner, start_date, ovulation_date); `id` is the stable handle used
/// for updates and deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub id: Uuid,
    pub owner: Uuid,
    pub start_date: NaiveDate,
    pub ovulation_date: Option<NaiveDate>,
}

/// A cycle record annotated with derived lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedCycle {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub ovulation_date: Option<NaiveDate>,
    /// Days since the previous recorded start date; absent for the
    /// earliest record.
    pub length: Option<i64>,
    /// Days from start to ovulation, counting the start day as day 1;
    /// absent when no ovulation date was recorded.
    pub ovulation_length: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Averages {
    pub avg_length: i64,
    pub avg_ovulation: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predictions {
    /// 1-based day of the current cycle.
    pub day: i64,
    pub next_period: NaiveDate,
    /// Negative once the predicted period is overdue.
    pub days_to_next: i64,
    pub next_ovulation: Option<NaiveDate>,
    /// Never negative; a stale prediction is reported as absent.
    pub days_to_ovul: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub averages: Averages,
    pub predictions: Predictions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub token_ttl_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token_ttl_minutes: 10_080, // 7 days
        }
    }
}

/// Everything persisted in the encrypted data file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    pub users: Vec<User>,
    pub sessions: Vec<Session>,
    pub records: Vec<CycleRecord>,
    #[serde(default)]
    pub settings: Settings,
}
