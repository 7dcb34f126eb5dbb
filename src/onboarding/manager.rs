//! OnboardingManager drives one inbound message through the onboarding
//! state machine and returns the prompt to send back.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::OnboardingConfig;
use crate::error::{DatabaseError, OnboardingError};
use crate::store::{ProfileStore, SessionStore};

use super::interpret::AnswerInterpreter;
use super::model::{FieldValue, Language, PatientProfile};
use super::parsers::parse_field;
use super::prompts::{self, PromptKey};
use super::state::{OnboardingSession, OnboardingStep};
use super::transitions::{Transition, next_step};

/// One message from the messaging layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub user_id: String,
    pub text: String,
    /// Provider message id, used to drop webhook retries.
    #[serde(default)]
    pub message_id: Option<String>,
}

impl InboundMessage {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            message_id: None,
        }
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }
}

/// What the caller should send back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingReply {
    pub prompt_text: String,
    /// Whether the user has a completed profile after this message.
    pub completed: bool,
}

impl OnboardingReply {
    fn pending(prompt_text: String) -> Self {
        Self {
            prompt_text,
            completed: false,
        }
    }

    fn done(prompt_text: String) -> Self {
        Self {
            prompt_text,
            completed: true,
        }
    }
}

/// Where a user stands in onboarding.
#[derive(Debug, Clone, PartialEq)]
pub enum OnboardingStatus {
    NotStarted,
    InProgress(OnboardingSession),
    Completed(PatientProfile),
}

/// Per-user async locks serializing message handling in this process.
#[derive(Default)]
struct UserLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    /// Entries are dropped once nobody holds or waits on them.
    const PRUNE_THRESHOLD: usize = 1024;

    fn get(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if map.len() >= Self::PRUNE_THRESHOLD {
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        map.entry(user_id.to_string()).or_default().clone()
    }
}

/// Coordinates the onboarding flow: session tracking, answer parsing, step
/// transitions and the terminal profile commit.
pub struct OnboardingManager {
    sessions: Arc<dyn SessionStore>,
    profiles: Arc<dyn ProfileStore>,
    interpreter: Option<Arc<dyn AnswerInterpreter>>,
    config: OnboardingConfig,
    locks: UserLocks,
}

impl OnboardingManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        profiles: Arc<dyn ProfileStore>,
        interpreter: Option<Arc<dyn AnswerInterpreter>>,
        config: OnboardingConfig,
    ) -> Self {
        Self {
            sessions,
            profiles,
            interpreter,
            config,
            locks: UserLocks::default(),
        }
    }

    pub fn config(&self) -> &OnboardingConfig {
        &self.config
    }

    /// Handle one inbound message. Never fails: store and invariant errors
    /// become a localized reply and the session is left at its current step.
    pub async fn handle_message(&self, message: &InboundMessage) -> OnboardingReply {
        let lock = self.locks.get(&message.user_id);
        let _guard = lock.lock().await;

        let mut language = self.config.default_language;
        match self.process(message, &mut language).await {
            Ok(reply) => reply,
            Err(err) => self.recover(&message.user_id, err, language).await,
        }
    }

    /// Drop any in-progress session for `user_id`. Returns whether one existed.
    pub async fn reset(&self, user_id: &str) -> Result<bool, OnboardingError> {
        let lock = self.locks.get(user_id);
        let _guard = lock.lock().await;

        let deleted = self
            .store("delete_session", self.sessions.delete_session(user_id))
            .await?;
        info!(user_id, deleted, "Onboarding reset");
        Ok(deleted)
    }

    pub async fn status(&self, user_id: &str) -> Result<OnboardingStatus, OnboardingError> {
        if let Some(profile) = self
            .store("find_profile", self.profiles.find_profile(user_id))
            .await?
            .filter(|p| p.completed)
        {
            return Ok(OnboardingStatus::Completed(profile));
        }
        Ok(
            match self
                .store("find_session", self.sessions.find_session(user_id))
                .await?
            {
                Some(session) => OnboardingStatus::InProgress(session),
                None => OnboardingStatus::NotStarted,
            },
        )
    }

    async fn process(
        &self,
        message: &InboundMessage,
        language: &mut Language,
    ) -> Result<OnboardingReply, OnboardingError> {
        let user_id = message.user_id.as_str();
        let Some(mut session) = self
            .store("find_session", self.sessions.find_session(user_id))
            .await?
        else {
            return self.start(message).await;
        };
        *language = session.language_or(self.config.default_language);
        let step = session.current_step;

        if message.message_id.is_some() && message.message_id == session.last_message_id {
            debug!(user_id, step = %step, "Duplicate delivery, repeating prompt");
            return Ok(OnboardingReply::pending(self.step_prompt(step, *language)));
        }

        if step.is_last() {
            if let Some(reply) = self.heal_committed(user_id).await? {
                return Ok(reply);
            }
        }

        if self.config.is_reset(&message.text) {
            return self.restart(user_id, PromptKey::Restarted, *language).await;
        }

        let Some(value) = self.parse_answer(step, &message.text, *language).await else {
            self.store(
                "touch_session",
                self.sessions.touch_session(user_id, Utc::now()),
            )
            .await?;
            debug!(user_id, step = %step, "Answer not understood, re-prompting");
            return Ok(OnboardingReply::pending(prompts::reprompt(
                step,
                *language,
                self.config.allow_emergency_skip,
            )));
        };

        let transition = next_step(step, &value);
        debug!(user_id, step = %step, field = value.field_name(), "Answer accepted");
        session.fields.apply(value);
        *language = session.language_or(self.config.default_language);

        match transition {
            Transition::Advance(next) => {
                session.current_step = next;
                session.last_message_id = message.message_id.clone();
                session.last_updated_at = Utc::now();

                let applied = self
                    .store(
                        "update_session",
                        self.sessions.update_session(&session, step),
                    )
                    .await?;
                if !applied {
                    return self.lost_race(user_id).await;
                }
                debug!(user_id, from = %step, to = %next, "Onboarding step advanced");
                Ok(OnboardingReply::pending(
                    self.render(transition.prompt_key(), *language),
                ))
            }
            Transition::Complete => self.commit(&session).await,
        }
    }

    /// First contact: no session yet.
    async fn start(&self, message: &InboundMessage) -> Result<OnboardingReply, OnboardingError> {
        let user_id = message.user_id.as_str();
        if let Some(profile) = self
            .store("find_profile", self.profiles.find_profile(user_id))
            .await?
            .filter(|p| p.completed)
        {
            debug!(user_id, "Message from already onboarded user");
            return Ok(OnboardingReply::done(
                prompts::prompt(PromptKey::AlreadyRegistered, profile.language).to_string(),
            ));
        }

        let mut session = OnboardingSession::new(user_id);
        session.last_message_id = message.message_id.clone();
        let created = self
            .store("create_session", self.sessions.create_session(&session))
            .await?;
        if !created {
            return self.lost_race(user_id).await;
        }

        info!(user_id, "Onboarding session created");
        Ok(OnboardingReply::pending(self.step_prompt(
            OnboardingStep::INITIAL,
            self.config.default_language,
        )))
    }

    /// A session left behind after its profile was committed is deleted.
    async fn heal_committed(
        &self,
        user_id: &str,
    ) -> Result<Option<OnboardingReply>, OnboardingError> {
        let Some(profile) = self
            .store("find_profile", self.profiles.find_profile(user_id))
            .await?
            .filter(|p| p.completed)
        else {
            return Ok(None);
        };

        self.store("delete_session", self.sessions.delete_session(user_id))
            .await?;
        warn!(user_id, "Removed session left over after profile commit");
        Ok(Some(OnboardingReply::done(
            prompts::prompt(PromptKey::AlreadyRegistered, profile.language).to_string(),
        )))
    }

    /// Terminal step: upsert the profile, then delete the session.
    ///
    /// Both halves are idempotent, so a retry after a failed delete converges.
    async fn commit(&self, session: &OnboardingSession) -> Result<OnboardingReply, OnboardingError> {
        let user_id = session.user_id.as_str();
        let profile = session.fields.finalize(user_id).map_err(|reason| {
            OnboardingError::InvariantViolation {
                user_id: user_id.to_string(),
                reason,
            }
        })?;

        let stored = self
            .store("upsert_profile", self.profiles.upsert_profile(&profile))
            .await?;
        self.store("delete_session", self.sessions.delete_session(user_id))
            .await?;

        info!(user_id, language = %stored.language, "Onboarding completed");
        Ok(OnboardingReply::done(prompts::completion_message(&stored)))
    }

    /// Another writer got there first: answer with whatever is stored now.
    async fn lost_race(&self, user_id: &str) -> Result<OnboardingReply, OnboardingError> {
        debug!(user_id, "Concurrent update detected, re-reading session");
        if let Some(session) = self
            .store("find_session", self.sessions.find_session(user_id))
            .await?
        {
            let language = session.language_or(self.config.default_language);
            return Ok(OnboardingReply::pending(
                self.step_prompt(session.current_step, language),
            ));
        }
        match self
            .store("find_profile", self.profiles.find_profile(user_id))
            .await?
            .filter(|p| p.completed)
        {
            Some(profile) => Ok(OnboardingReply::done(prompts::completion_message(&profile))),
            None => Err(OnboardingError::StoreUnavailable {
                operation: "find_session".to_string(),
                reason: "session vanished during concurrent update".to_string(),
            }),
        }
    }

    /// Replace the session with a fresh one and ask the first question.
    async fn restart(
        &self,
        user_id: &str,
        notice: PromptKey,
        language: Language,
    ) -> Result<OnboardingReply, OnboardingError> {
        self.store("delete_session", self.sessions.delete_session(user_id))
            .await?;
        let session = OnboardingSession::new(user_id);
        self.store("create_session", self.sessions.create_session(&session))
            .await?;

        info!(user_id, "Onboarding restarted");
        Ok(OnboardingReply::pending(prompts::notice_then_step(
            notice,
            OnboardingStep::INITIAL,
            language,
            self.config.allow_emergency_skip,
        )))
    }

    /// Rule-based parse, then the interpreter as a fallback.
    async fn parse_answer(
        &self,
        step: OnboardingStep,
        text: &str,
        language: Language,
    ) -> Option<FieldValue> {
        let options = self.config.parser_options();
        if let Some(value) = parse_field(step, text, &options) {
            return Some(value);
        }

        let interpreter = self.interpreter.as_ref()?;
        if text.trim().is_empty() {
            return None;
        }
        let rewritten = match tokio::time::timeout(
            self.config.interpreter_timeout,
            interpreter.normalize(step, text, language),
        )
        .await
        {
            Ok(Ok(Some(rewritten))) => rewritten,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!(step = %step, error = %e, "Answer interpreter failed");
                return None;
            }
            Err(_) => {
                warn!(step = %step, "Answer interpreter timed out");
                return None;
            }
        };
        let value = parse_field(step, &rewritten, &options);
        debug!(step = %step, accepted = value.is_some(), "Interpreted answer re-validated");
        value
    }

    async fn recover(
        &self,
        user_id: &str,
        err: OnboardingError,
        language: Language,
    ) -> OnboardingReply {
        match err {
            OnboardingError::StoreUnavailable { .. } => {
                warn!(user_id, error = %err, "Onboarding store unavailable");
                self.try_again(language)
            }
            OnboardingError::InvariantViolation { .. } => {
                error!(user_id, error = %err, "Onboarding state invalid, restarting user");
                match self
                    .restart(user_id, PromptKey::RestartAfterError, language)
                    .await
                {
                    Ok(reply) => reply,
                    Err(restart_err) => {
                        warn!(user_id, error = %restart_err, "Restart after invalid state failed");
                        self.try_again(language)
                    }
                }
            }
        }
    }

    fn try_again(&self, language: Language) -> OnboardingReply {
        OnboardingReply::pending(prompts::prompt(PromptKey::TryAgainLater, language).to_string())
    }

    fn step_prompt(&self, step: OnboardingStep, language: Language) -> String {
        self.render(PromptKey::Step(step), language)
    }

    fn render(&self, key: PromptKey, language: Language) -> String {
        prompts::render(key, language, self.config.allow_emergency_skip)
    }

    /// Run one store call under the configured timeout.
    async fn store<T, F>(&self, operation: &str, call: F) -> Result<T, OnboardingError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result.map_err(|e| OnboardingError::store(operation, e)),
            Err(_) => Err(OnboardingError::timeout(operation, self.config.store_timeout)),
        }
    }
}
