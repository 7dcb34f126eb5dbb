//! Error types for Gluco Sahayak.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Onboarding(OnboardingError::StoreUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Onboarding(OnboardingError::InvariantViolation { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored row exists but cannot be decoded into its record type.
    #[error("Corrupt {entity} record for {id}: {reason}")]
    Corrupt {
        entity: RecordKind,
        id: String,
        reason: String,
    },
}

/// Which table a corrupt row was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Session,
    Profile,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session => f.write_str("onboarding_session"),
            Self::Profile => f.write_str("patient_profile"),
        }
    }
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },
}

/// Failures of a single onboarding turn.
///
/// An unparseable answer is not an error; it becomes a re-prompt.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// A store call failed or timed out, or a stored profile is unreadable.
    /// Retried on the next message.
    #[error("Store unavailable during {operation}: {reason}")]
    StoreUnavailable { operation: String, reason: String },

    /// The stored session contradicts the onboarding flow. The user is restarted.
    #[error("Onboarding invariant violated for {user_id}: {reason}")]
    InvariantViolation { user_id: String, reason: String },
}

impl OnboardingError {
    /// Only a corrupt session restarts the user. A corrupt profile row is
    /// reported as unavailable until it is repaired.
    pub fn store(operation: &str, err: DatabaseError) -> Self {
        match err {
            DatabaseError::Corrupt {
                entity: RecordKind::Session,
                id,
                reason,
            } => Self::InvariantViolation {
                user_id: id,
                reason,
            },
            other => Self::StoreUnavailable {
                operation: operation.to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub fn timeout(operation: &str, after: Duration) -> Self {
        Self::StoreUnavailable {
            operation: operation.to_string(),
            reason: format!("timed out after {after:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_record_maps_to_invariant_violation() {
        let err = OnboardingError::store(
            "find_session",
            DatabaseError::Corrupt {
                entity: RecordKind::Session,
                id: "+919876543210".into(),
                reason: "unknown step 'bogus'".into(),
            },
        );
        assert!(matches!(
            err,
            OnboardingError::InvariantViolation { ref user_id, .. } if user_id == "+919876543210"
        ));
    }

    #[test]
    fn corrupt_profile_maps_to_store_unavailable() {
        let err = OnboardingError::store(
            "find_profile",
            DatabaseError::Corrupt {
                entity: RecordKind::Profile,
                id: "+919876543210".into(),
                reason: "column 'gender': unknown value 'bogus'".into(),
            },
        );
        match err {
            OnboardingError::StoreUnavailable { operation, reason } => {
                assert_eq!(operation, "find_profile");
                assert!(reason.contains("patient_profile"), "{reason}");
            }
            other => panic!("expected StoreUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn query_failure_maps_to_store_unavailable() {
        let err = OnboardingError::store("update_session", DatabaseError::Query("locked".into()));
        match err {
            OnboardingError::StoreUnavailable { operation, reason } => {
                assert_eq!(operation, "update_session");
                assert!(reason.contains("locked"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn timeout_mentions_duration() {
        let err = OnboardingError::timeout("find_profile", Duration::from_millis(250));
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            Error::BadRequest("empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Onboarding(OnboardingError::timeout("x", Duration::from_secs(1))).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::Onboarding(OnboardingError::InvariantViolation {
                user_id: "u".into(),
                reason: "r".into(),
            })
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
