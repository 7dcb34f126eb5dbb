//! Storage traits for onboarding sessions and patient profiles.
//!
//! The orchestrator only talks to these traits, so tests can swap in
//! failing or slow stores without touching the libSQL backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::onboarding::model::PatientProfile;
use crate::onboarding::state::{OnboardingSession, OnboardingStep};

/// Per-user onboarding progress.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for a user, if one exists.
    async fn find_session(&self, user_id: &str)
    -> Result<Option<OnboardingSession>, DatabaseError>;

    /// Insert a new session. Returns `false` if one already exists for the user.
    async fn create_session(&self, session: &OnboardingSession) -> Result<bool, DatabaseError>;

    /// Persist `session` only if the stored step still equals `expected_step`.
    ///
    /// Returns `false` when another writer advanced the session first.
    async fn update_session(
        &self,
        session: &OnboardingSession,
        expected_step: OnboardingStep,
    ) -> Result<bool, DatabaseError>;

    /// Bump `last_updated_at` without changing step or fields.
    async fn touch_session(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), DatabaseError>;

    /// Delete the session. Returns whether a row was removed.
    async fn delete_session(&self, user_id: &str) -> Result<bool, DatabaseError>;
}

/// Finalized patient profiles, keyed by user id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> Result<Option<PatientProfile>, DatabaseError>;

    /// Insert or update a profile and return the stored row.
    ///
    /// A row already marked completed is left untouched, so repeating the
    /// terminal commit is a no-op.
    async fn upsert_profile(&self, profile: &PatientProfile)
    -> Result<PatientProfile, DatabaseError>;
}
