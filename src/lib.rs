//! Gluco Sahayak: WhatsApp diabetes care assistant, onboarding core.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod store;
