//! Optional AI answer normalizer.
//!
//! Consulted only after the rule-based parser rejects an answer. The
//! interpreter rewrites the free-form reply into a canonical answer, which is
//! then re-validated by the same parser, so it can never introduce a value
//! the parser would not accept.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::InterpreterConfig;
use crate::error::LlmError;

use super::model::Language;
use super::state::OnboardingStep;

/// Reply the model gives when the answer cannot be interpreted.
const UNKNOWN_MARKER: &str = "UNKNOWN";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "anthropic";

/// Rewrites an unparseable answer into canonical form.
#[async_trait]
pub trait AnswerInterpreter: Send + Sync {
    /// Returns `Ok(None)` when the answer has no sensible reading.
    async fn normalize(
        &self,
        step: OnboardingStep,
        text: &str,
        language: Language,
    ) -> Result<Option<String>, LlmError>;
}

/// What a canonical answer looks like for each step.
fn canonical_form(step: OnboardingStep) -> &'static str {
    match step {
        OnboardingStep::Language => "one of: english, hindi, marathi",
        OnboardingStep::Name => "the person's full name only, in Latin or Devanagari script",
        OnboardingStep::Age => "age in whole years as digits, e.g. 45",
        OnboardingStep::Gender => "one of: male, female, other",
        OnboardingStep::EmergencyContact => {
            "a 10-digit Indian mobile number as digits, or the word skip if they decline"
        }
        OnboardingStep::Pincode => "a 6-digit Indian postal pincode as digits",
        OnboardingStep::Consent => "one of: yes, no",
        OnboardingStep::DiabetesType => "one of: type 1, type 2, gestational, prediabetes",
        OnboardingStep::Duration => {
            "years since diagnosis as a number, e.g. 5 years or 6 months; 0 if newly diagnosed"
        }
        OnboardingStep::MedicationType => "one of: tablets, insulin, both, none",
        OnboardingStep::MedicineNames => "comma-separated generic medicine names",
        OnboardingStep::Diet => "one of: vegetarian, non-vegetarian, eggetarian",
        OnboardingStep::Comorbidities => {
            "comma-separated conditions such as hypertension, thyroid, heart disease, kidney disease, cholesterol; or none"
        }
        OnboardingStep::HbA1c => "the HbA1c percentage as a number, e.g. 7.5, or don't know",
    }
}

/// System prompt for one normalization request.
pub fn system_prompt(step: OnboardingStep, language: Language) -> String {
    format!(
        "You help a diabetes care assistant for Indian patients understand replies \
         to onboarding questions. The patient is chatting in {language} and may mix \
         scripts or make typos. Rewrite the patient's reply to the '{step}' question \
         as {form}. Respond with the rewritten answer only, in English, with no \
         explanation. If the reply does not answer the question, respond with {UNKNOWN_MARKER}.",
        form = canonical_form(step),
    )
}

/// Extract the rewritten answer from model output.
pub fn parse_reply(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(UNKNOWN_MARKER) {
        return None;
    }
    Some(cleaned.to_string())
}

/// Map a non-success HTTP status to an `LlmError`.
fn http_error(status: u16, body: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        },
        429 => LlmError::RateLimited {
            provider: PROVIDER.to_string(),
        },
        _ => LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("HTTP {status}: {body}"),
        },
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Interpreter backed by the Anthropic Messages API.
pub struct AnthropicInterpreter {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    endpoint: String,
}

impl AnthropicInterpreter {
    pub fn new(config: &InterpreterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl AnswerInterpreter for AnthropicInterpreter {
    async fn normalize(
        &self,
        step: OnboardingStep,
        text: &str,
        language: Language,
    ) -> Result<Option<String>, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 64,
            "temperature": 0,
            "system": system_prompt(step, language),
            "messages": [{ "role": "user", "content": text }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;
        if status != 200 {
            return Err(http_error(status, &body_text));
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;
        let text = parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .unwrap_or_default();

        tracing::debug!(step = %step, recognized = !text.trim().is_empty(), "Interpreter replied");
        Ok(parse_reply(&text))
    }
}
