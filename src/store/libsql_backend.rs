//! libSQL backend: async `SessionStore` and `ProfileStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{DatabaseError, RecordKind};
use crate::onboarding::model::{PatientProfile, ProfileFields};
use crate::onboarding::state::{OnboardingSession, OnboardingStep};
use crate::store::migrations;
use crate::store::traits::{ProfileStore, SessionStore};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|ndt| ndt.and_utc())
}

/// Convert `Option<String>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Decodes typed columns of one row, reporting failures as `Corrupt`.
struct RowReader<'a> {
    row: &'a libsql::Row,
    entity: RecordKind,
    id: String,
}

impl RowReader<'_> {
    fn corrupt(&self, reason: String) -> DatabaseError {
        DatabaseError::Corrupt {
            entity: self.entity,
            id: self.id.clone(),
            reason,
        }
    }

    fn text(&self, idx: i32, column: &str) -> Result<String, DatabaseError> {
        self.row
            .get::<String>(idx)
            .map_err(|e| self.corrupt(format!("column '{column}': {e}")))
    }

    fn opt_text(&self, idx: i32) -> Option<String> {
        self.row.get::<String>(idx).ok()
    }

    fn int(&self, idx: i32, column: &str) -> Result<i64, DatabaseError> {
        self.row
            .get::<i64>(idx)
            .map_err(|e| self.corrupt(format!("column '{column}': {e}")))
    }

    fn parsed<T>(&self, idx: i32, column: &str) -> Result<T, DatabaseError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.text(idx, column)?;
        raw.parse::<T>()
            .map_err(|e| self.corrupt(format!("column '{column}': {e}")))
    }

    fn datetime(&self, idx: i32, column: &str) -> Result<DateTime<Utc>, DatabaseError> {
        let raw = self.text(idx, column)?;
        parse_datetime(&raw).ok_or_else(|| self.corrupt(format!("column '{column}': bad timestamp '{raw}'")))
    }

    fn json<T: serde::de::DeserializeOwned>(&self, idx: i32, column: &str) -> Result<T, DatabaseError> {
        let raw = self.text(idx, column)?;
        serde_json::from_str(&raw).map_err(|e| self.corrupt(format!("column '{column}': {e}")))
    }
}

const SESSION_COLUMNS: &str =
    "user_id, current_step, fields, last_message_id, created_at, last_updated_at";

/// Map a libsql Row to an OnboardingSession.
///
/// Column order matches SESSION_COLUMNS. An unknown step or undecodable
/// `fields` column is reported as `DatabaseError::Corrupt`.
fn row_to_session(row: &libsql::Row, user_id: &str) -> Result<OnboardingSession, DatabaseError> {
    let r = RowReader {
        row,
        entity: RecordKind::Session,
        id: user_id.to_string(),
    };
    Ok(OnboardingSession {
        user_id: r.text(0, "user_id")?,
        current_step: r.parsed::<OnboardingStep>(1, "current_step")?,
        fields: r.json::<ProfileFields>(2, "fields")?,
        last_message_id: r.opt_text(3),
        created_at: r.datetime(4, "created_at")?,
        last_updated_at: r.datetime(5, "last_updated_at")?,
    })
}

const PROFILE_COLUMNS: &str = "user_id, language, name, age, gender, emergency_contact, pincode, \
     consent, diabetes_type, duration_years, medication_type, medicines, diet, comorbidities, \
     last_hba1c, completed, completed_at, updated_at";

/// Map a libsql Row to a PatientProfile. Column order matches PROFILE_COLUMNS.
fn row_to_profile(row: &libsql::Row, user_id: &str) -> Result<PatientProfile, DatabaseError> {
    let r = RowReader {
        row,
        entity: RecordKind::Profile,
        id: user_id.to_string(),
    };
    let age = r.int(3, "age")?;
    let last_hba1c = match r.opt_text(14) {
        Some(raw) => Some(
            Decimal::from_str(&raw).map_err(|e| r.corrupt(format!("column 'last_hba1c': {e}")))?,
        ),
        None => None,
    };
    let completed_at = match r.opt_text(16) {
        Some(_) => Some(r.datetime(16, "completed_at")?),
        None => None,
    };

    Ok(PatientProfile {
        user_id: r.text(0, "user_id")?,
        language: r.parsed(1, "language")?,
        name: r.text(2, "name")?,
        age: u8::try_from(age).map_err(|_| r.corrupt(format!("column 'age': {age} out of range")))?,
        gender: r.parsed(4, "gender")?,
        emergency_contact: r.opt_text(5),
        pincode: r.text(6, "pincode")?,
        consent: r.int(7, "consent")? != 0,
        diabetes_type: r.parsed(8, "diabetes_type")?,
        duration_years: r.parsed(9, "duration_years")?,
        medication_type: r.parsed(10, "medication_type")?,
        medicines: r.json(11, "medicines")?,
        diet: r.parsed(12, "diet")?,
        comorbidities: r.json(13, "comorbidities")?,
        last_hba1c,
        completed: r.int(15, "completed")? != 0,
        completed_at,
        updated_at: r.datetime(17, "updated_at")?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

// ── Trait implementations ───────────────────────────────────────────

#[async_trait]
impl SessionStore for LibSqlBackend {
    async fn find_session(
        &self,
        user_id: &str,
    ) -> Result<Option<OnboardingSession>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM onboarding_sessions WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_session: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("find_session: {e}")))?
        {
            Some(row) => Ok(Some(row_to_session(&row, user_id)?)),
            None => Ok(None),
        }
    }

    async fn create_session(&self, session: &OnboardingSession) -> Result<bool, DatabaseError> {
        let fields = to_json(&session.fields)?;
        let inserted = self
            .conn()
            .execute(
                "INSERT INTO onboarding_sessions (user_id, current_step, fields, last_message_id, created_at, last_updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id) DO NOTHING",
                params![
                    session.user_id.as_str(),
                    session.current_step.as_str(),
                    fields.as_str(),
                    opt_text(session.last_message_id.as_deref()),
                    session.created_at.to_rfc3339(),
                    session.last_updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_session: {e}")))?;

        debug!(user_id = %session.user_id, inserted = inserted > 0, "Session create");
        Ok(inserted > 0)
    }

    async fn update_session(
        &self,
        session: &OnboardingSession,
        expected_step: OnboardingStep,
    ) -> Result<bool, DatabaseError> {
        let fields = to_json(&session.fields)?;
        let updated = self
            .conn()
            .execute(
                "UPDATE onboarding_sessions
                 SET current_step = ?2, fields = ?3, last_message_id = ?4, last_updated_at = ?5
                 WHERE user_id = ?1 AND current_step = ?6",
                params![
                    session.user_id.as_str(),
                    session.current_step.as_str(),
                    fields.as_str(),
                    opt_text(session.last_message_id.as_deref()),
                    session.last_updated_at.to_rfc3339(),
                    expected_step.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_session: {e}")))?;
        Ok(updated > 0)
    }

    async fn touch_session(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE onboarding_sessions SET last_updated_at = ?2 WHERE user_id = ?1",
                params![user_id, at.to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("touch_session: {e}")))?;
        Ok(())
    }

    async fn delete_session(&self, user_id: &str) -> Result<bool, DatabaseError> {
        let deleted = self
            .conn()
            .execute(
                "DELETE FROM onboarding_sessions WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_session: {e}")))?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl ProfileStore for LibSqlBackend {
    async fn find_profile(&self, user_id: &str) -> Result<Option<PatientProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM patient_profiles WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_profile: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("find_profile: {e}")))?
        {
            Some(row) => Ok(Some(row_to_profile(&row, user_id)?)),
            None => Ok(None),
        }
    }

    async fn upsert_profile(
        &self,
        profile: &PatientProfile,
    ) -> Result<PatientProfile, DatabaseError> {
        let medicines = to_json(&profile.medicines)?;
        let comorbidities = to_json(&profile.comorbidities)?;
        let last_hba1c = profile.last_hba1c.map(|v| v.to_string());
        let completed_at = profile.completed_at.map(|t| t.to_rfc3339());
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO patient_profiles ({PROFILE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                     ON CONFLICT(user_id) DO UPDATE SET
                        language = excluded.language,
                        name = excluded.name,
                        age = excluded.age,
                        gender = excluded.gender,
                        emergency_contact = excluded.emergency_contact,
                        pincode = excluded.pincode,
                        consent = excluded.consent,
                        diabetes_type = excluded.diabetes_type,
                        duration_years = excluded.duration_years,
                        medication_type = excluded.medication_type,
                        medicines = excluded.medicines,
                        diet = excluded.diet,
                        comorbidities = excluded.comorbidities,
                        last_hba1c = excluded.last_hba1c,
                        completed = excluded.completed,
                        completed_at = excluded.completed_at,
                        updated_at = excluded.updated_at
                     WHERE patient_profiles.completed = 0"
                ),
                params![
                    profile.user_id.as_str(),
                    profile.language.as_str(),
                    profile.name.as_str(),
                    profile.age as i64,
                    profile.gender.as_str(),
                    opt_text(profile.emergency_contact.as_deref()),
                    profile.pincode.as_str(),
                    profile.consent as i64,
                    profile.diabetes_type.as_str(),
                    profile.duration_years.to_string(),
                    profile.medication_type.as_str(),
                    medicines.as_str(),
                    profile.diet.as_str(),
                    comorbidities.as_str(),
                    opt_text(last_hba1c.as_deref()),
                    profile.completed as i64,
                    opt_text(completed_at.as_deref()),
                    profile.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_profile: {e}")))?;

        self.find_profile(&profile.user_id).await?.ok_or_else(|| {
            DatabaseError::Query(format!(
                "upsert_profile: row for {} missing after write",
                profile.user_id
            ))
        })
    }
}
