//! Step transition table: `(step, answer) -> next step`.

use super::model::{FieldValue, MedicationType};
use super::prompts::PromptKey;
use super::state::OnboardingStep;

/// Where the flow goes after a valid answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advance(OnboardingStep),
    /// Terminal: commit the profile and delete the session.
    Complete,
}

impl Transition {
    /// Prompt sent after taking this transition.
    pub fn prompt_key(&self) -> PromptKey {
        match self {
            Self::Advance(step) => PromptKey::Step(*step),
            Self::Complete => PromptKey::Completed,
        }
    }
}

/// Resolve the next state for a valid answer at `step`.
///
/// The only branch: a medication type of `None` skips `MedicineNames`.
pub fn next_step(step: OnboardingStep, value: &FieldValue) -> Transition {
    use OnboardingStep as S;

    let next = match step {
        S::Language => S::Name,
        S::Name => S::Age,
        S::Age => S::Gender,
        S::Gender => S::EmergencyContact,
        S::EmergencyContact => S::Pincode,
        S::Pincode => S::Consent,
        S::Consent => S::DiabetesType,
        S::DiabetesType => S::Duration,
        S::Duration => S::MedicationType,
        S::MedicationType => match value {
            FieldValue::MedicationType(MedicationType::None) => S::Diet,
            _ => S::MedicineNames,
        },
        S::MedicineNames => S::Diet,
        S::Diet => S::Comorbidities,
        S::Comorbidities => S::HbA1c,
        S::HbA1c => return Transition::Complete,
    };
    Transition::Advance(next)
}
