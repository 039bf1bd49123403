use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::auth::{self, AuthError};
use crate::models::{AppData, AuthToken, CycleRecord, DerivedCycle, Statistics, User, UserProfile};
use crate::prediction::{self, StatsError};
use crate::storage::{self, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid or expired token")]
    Unauthorized,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("email is already registered")]
    EmailTaken,
    #[error("username is already taken")]
    UsernameTaken,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("ovulation date must be after the cycle start date")]
    OvulationBeforeStart,
    #[error("an identical record already exists")]
    DuplicateRecord,
    #[error("record not found")]
    RecordNotFound,
    #[error("add more data to perform calculations")]
    InsufficientHistory,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    #[error("state lock poisoned")]
    State,
}

impl From<StatsError> for ServiceError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::InsufficientHistory => ServiceError::InsufficientHistory,
        }
    }
}

/// The command layer: one method per user-visible operation.
///
/// Holds the decrypted state in memory and persists the full snapshot after
/// every mutation. Record access is always scoped to the owner resolved from
/// the presented token; no operation crosses owners.
pub struct Tracker {
    path: PathBuf,
    passphrase: String,
    data: Mutex<AppData>,
}

impl Tracker {
    /// Open the store at `path`, creating an empty one if the file does not
    /// exist yet.
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, ServiceError> {
        let path = path.into();
        let data = if path.exists() {
            storage::load_from(&path, passphrase)?
        } else {
            let data = AppData::default();
            storage::save_to(&path, passphrase, &data)?;
            data
        };

        Ok(Self {
            path,
            passphrase: passphrase.to_owned(),
            data: Mutex::new(data),
        })
    }

    /// Open the store at the platform's default per-user location.
    pub fn open_default(passphrase: &str) -> Result<Self, ServiceError> {
        let path = storage::default_data_path()?;
        Self::open(path, passphrase)
    }

    fn save(&self, data: &AppData) -> Result<(), ServiceError> {
        storage::save_to(&self.path, &self.passphrase, data)?;
        Ok(())
    }

    /// Resolve a token to its owning user, pruning expired sessions.
    fn authenticate(data: &mut AppData, token: Uuid) -> Result<Uuid, ServiceError> {
        let now = Utc::now();
        data.sessions.retain(|s| s.is_valid(now));
        data.sessions
            .iter()
            .find(|s| s.token == token)
            .map(|s| s.user_id)
            .ok_or(ServiceError::Unauthorized)
    }

    pub fn register(
        &self,
        username: &str,
        email: &str,
        mut password: String,
    ) -> Result<UserProfile, ServiceError> {
        if username.trim().is_empty() {
            return Err(ServiceError::InvalidInput("username must not be empty"));
        }
        if email.trim().is_empty() {
            return Err(ServiceError::InvalidInput("email must not be empty"));
        }
        if password.is_empty() {
            return Err(ServiceError::InvalidInput("password must not be empty"));
        }

        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        if data.users.iter().any(|u| u.email == email) {
            return Err(ServiceError::EmailTaken);
        }
        if data.users.iter().any(|u| u.username == username) {
            return Err(ServiceError::UsernameTaken);
        }

        let password_hash = auth::hash_password(&password)?;
        password.zeroize();

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash,
        };
        let profile = user.profile();
        data.users.push(user);
        self.save(&data)?;

        info!(user = %profile.id, "user registered");
        Ok(profile)
    }

    /// Exchange credentials for an expiring bearer token. Unknown username
    /// and wrong password are deliberately indistinguishable.
    pub fn login(&self, username: &str, mut password: String) -> Result<AuthToken, ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;

        let (user_id, password_hash) = match data.users.iter().find(|u| u.username == username) {
            Some(user) => (user.id, user.password_hash.clone()),
            None => return Err(ServiceError::InvalidCredentials),
        };
        if !auth::verify_password(&password, &password_hash)? {
            return Err(ServiceError::InvalidCredentials);
        }
        password.zeroize();

        let session = auth::issue_session(user_id, data.settings.token_ttl_minutes, Utc::now());
        let token = AuthToken {
            token: session.token,
            expires_at: session.expires_at,
        };
        data.sessions.push(session);
        self.save(&data)?;

        debug!(user = %user_id, "session issued");
        Ok(token)
    }

    /// Drop a session. Unknown tokens are a no-op.
    pub fn logout(&self, token: Uuid) -> Result<(), ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        data.sessions.retain(|s| s.token != token);
        self.save(&data)?;
        Ok(())
    }

    pub fn add_record(
        &self,
        token: Uuid,
        start_date: NaiveDate,
        ovulation_date: Option<NaiveDate>,
    ) -> Result<CycleRecord, ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        let owner = Self::authenticate(&mut data, token)?;
        validate_dates(start_date, ovulation_date)?;

        if data.records.iter().any(|r| {
            r.owner == owner && r.start_date == start_date && r.ovulation_date == ovulation_date
        }) {
            return Err(ServiceError::DuplicateRecord);
        }

        let record = CycleRecord {
            id: Uuid::new_v4(),
            owner,
            start_date,
            ovulation_date,
        };
        data.records.push(record.clone());
        self.save(&data)?;

        debug!(user = %owner, "cycle record added");
        Ok(record)
    }

    pub fn update_record(
        &self,
        token: Uuid,
        id: Uuid,
        start_date: NaiveDate,
        ovulation_date: Option<NaiveDate>,
    ) -> Result<CycleRecord, ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        let owner = Self::authenticate(&mut data, token)?;
        validate_dates(start_date, ovulation_date)?;

        if data.records.iter().any(|r| {
            r.id != id
                && r.owner == owner
                && r.start_date == start_date
                && r.ovulation_date == ovulation_date
        }) {
            return Err(ServiceError::DuplicateRecord);
        }

        let record = data
            .records
            .iter_mut()
            .find(|r| r.id == id && r.owner == owner)
            .ok_or(ServiceError::RecordNotFound)?;
        record.start_date = start_date;
        record.ovulation_date = ovulation_date;
        let updated = record.clone();
        self.save(&data)?;

        debug!(user = %owner, "cycle record updated");
        Ok(updated)
    }

    pub fn delete_record(&self, token: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        let owner = Self::authenticate(&mut data, token)?;

        let index = data
            .records
            .iter()
            .position(|r| r.id == id && r.owner == owner)
            .ok_or(ServiceError::RecordNotFound)?;
        data.records.remove(index);
        self.save(&data)?;

        debug!(user = %owner, "cycle record deleted");
        Ok(())
    }

    /// The owner's records ordered by start date, annotated with derived
    /// cycle and ovulation-phase lengths. Works with any amount of history.
    pub fn records(&self, token: Uuid) -> Result<Vec<DerivedCycle>, ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        let owner = Self::authenticate(&mut data, token)?;
        Ok(prediction::derive_cycles(&owned_records(&data, owner)))
    }

    /// The owner's most recent record by start date.
    pub fn last_record(&self, token: Uuid) -> Result<CycleRecord, ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        let owner = Self::authenticate(&mut data, token)?;
        data.records
            .iter()
            .filter(|r| r.owner == owner)
            .max_by_key(|r| r.start_date)
            .cloned()
            .ok_or(ServiceError::RecordNotFound)
    }

    /// Averages and predictions as of an explicit calendar date.
    pub fn statistics_on(&self, token: Uuid, today: NaiveDate) -> Result<Statistics, ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        let owner = Self::authenticate(&mut data, token)?;
        Ok(prediction::statistics(&owned_records(&data, owner), today)?)
    }

    /// Averages and predictions as of the current local calendar date.
    pub fn statistics(&self, token: Uuid) -> Result<Statistics, ServiceError> {
        self.statistics_on(token, chrono::Local::now().date_naive())
    }

    /// The owner's raw records as pretty JSON, for data portability.
    pub fn export_records(&self, token: Uuid) -> Result<String, ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        let owner = Self::authenticate(&mut data, token)?;
        let records = owned_records(&data, owner);
        Ok(serde_json::to_string_pretty(&records).map_err(StorageError::Serialization)?)
    }

    pub fn update_settings(&self, token: Uuid, token_ttl_minutes: u32) -> Result<(), ServiceError> {
        let mut data = self.data.lock().map_err(|_| ServiceError::State)?;
        Self::authenticate(&mut data, token)?;
        data.settings.token_ttl_minutes = token_ttl_minutes.clamp(5, 43_200);
        self.save(&data)?;
        Ok(())
    }

    /// Delete the data file permanently, consuming the tracker.
    pub fn wipe(self) -> Result<(), ServiceError> {
        storage::wipe(&self.path)?;
        info!("data file wiped");
        Ok(())
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.passphrase.zeroize();
    }
}

fn owned_records(data: &AppData, owner: Uuid) -> Vec<CycleRecord> {
    data.records
        .iter()
        .filter(|r| r.owner == owner)
        .cloned()
        .collect()
}

/// Ovulation must fall strictly after the cycle start.
fn validate_dates(
    start_date: NaiveDate,
    ovulation_date: Option<NaiveDate>,
) -> Result<(), ServiceError> {
    match ovulation_date {
        Some(ovulation) if ovulation <= start_date => Err(ServiceError::OvulationBeforeStart),
        _ => Ok(()),
    }
}
