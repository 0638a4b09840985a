//! Onboarding Flow: headless controller for slide-based onboarding.

pub mod config;
pub mod error;
pub mod flow;
