//! Onboarding steps and the persisted per-user session.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Language, ProfileFields};

/// One question of the onboarding conversation.
///
/// The terminal "completed" state is never stored: reaching it deletes the
/// session and commits the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Language,
    Name,
    Age,
    Gender,
    EmergencyContact,
    Pincode,
    Consent,
    DiabetesType,
    Duration,
    MedicationType,
    MedicineNames,
    Diet,
    Comorbidities,
    #[serde(rename = "hba1c")]
    HbA1c,
}

impl OnboardingStep {
    /// Canonical order, including the optional `MedicineNames` step.
    pub const ALL: [OnboardingStep; 14] = [
        Self::Language,
        Self::Name,
        Self::Age,
        Self::Gender,
        Self::EmergencyContact,
        Self::Pincode,
        Self::Consent,
        Self::DiabetesType,
        Self::Duration,
        Self::MedicationType,
        Self::MedicineNames,
        Self::Diet,
        Self::Comorbidities,
        Self::HbA1c,
    ];

    pub const INITIAL: OnboardingStep = Self::Language;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::Name => "name",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::EmergencyContact => "emergency_contact",
            Self::Pincode => "pincode",
            Self::Consent => "consent",
            Self::DiabetesType => "diabetes_type",
            Self::Duration => "duration",
            Self::MedicationType => "medication_type",
            Self::MedicineNames => "medicine_names",
            Self::Diet => "diet",
            Self::Comorbidities => "comorbidities",
            Self::HbA1c => "hba1c",
        }
    }

    /// Whether answering this step completes onboarding.
    pub fn is_last(&self) -> bool {
        matches!(self, Self::HbA1c)
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnboardingStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown onboarding step '{s}'"))
    }
}

/// Persisted onboarding progress for one user.
///
/// Exists only between first contact and profile commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingSession {
    /// Phone number identifying the user.
    pub user_id: String,
    pub current_step: OnboardingStep,
    pub fields: ProfileFields,
    /// Provider message id of the last consumed answer, for retry dedup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl OnboardingSession {
    /// Fresh session at the initial step.
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            current_step: OnboardingStep::INITIAL,
            fields: ProfileFields::default(),
            last_message_id: None,
            created_at: now,
            last_updated_at: now,
        }
    }

    /// Language chosen so far, or `default` before the language step is answered.
    pub fn language_or(&self, default: Language) -> Language {
        self.fields.language.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        for step in OnboardingStep::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(
                format!("\"{step}\""),
                json,
                "Display and serde should match for {step:?}"
            );
        }
    }

    #[test]
    fn from_str_roundtrips_every_step() {
        for step in OnboardingStep::ALL {
            assert_eq!(step.as_str().parse::<OnboardingStep>().unwrap(), step);
        }
        assert!("completed".parse::<OnboardingStep>().is_err());
        assert!("".parse::<OnboardingStep>().is_err());
    }

    #[test]
    fn only_hba1c_is_last() {
        let last: Vec<_> = OnboardingStep::ALL
            .into_iter()
            .filter(|s| s.is_last())
            .collect();
        assert_eq!(last, vec![OnboardingStep::HbA1c]);
    }

    #[test]
    fn new_session_starts_at_language() {
        let session = OnboardingSession::new("+15551234567");
        assert_eq!(session.current_step, OnboardingStep::Language);
        assert_eq!(session.fields, ProfileFields::default());
        assert!(session.last_message_id.is_none());
        assert_eq!(session.language_or(Language::Hindi), Language::Hindi);
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut session = OnboardingSession::new("+919812345678");
        session.current_step = OnboardingStep::Age;
        session.fields.language = Some(Language::Marathi);
        session.fields.name = Some("Sunita".to_string());

        let json = serde_json::to_string(&session).unwrap();
        let parsed: OnboardingSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
        assert_eq!(parsed.language_or(Language::English), Language::Marathi);
    }
}
