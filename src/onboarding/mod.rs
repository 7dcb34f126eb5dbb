//! The question-by-question conversation that turns a new
//! WhatsApp contact into a patient profile.
//!
//! Each inbound message is parsed against the user's current step, the
//! answer is stored in the session, and the transition table picks the next
//! question. Answering the last question commits the `PatientProfile` and
//! deletes the session.

pub mod interpret;
pub mod manager;
pub mod model;
pub mod parsers;
pub mod prompts;
pub mod routes;
pub mod state;
pub mod transitions;

pub use interpret::{AnswerInterpreter, AnthropicInterpreter};
pub use manager::{InboundMessage, OnboardingManager, OnboardingReply, OnboardingStatus};
pub use model::{Language, PatientProfile, ProfileFields};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{OnboardingSession, OnboardingStep};
