// Membership Registry - API Core
//
// This crate provides the backend for membership onboarding: a
// session-scoped saga that stages, validates and materializes an
// applicant's record graph in the association's system of record.
//
// Architecture follows domain-driven design; caller-facing operations live
// in domains/registration/actions.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
