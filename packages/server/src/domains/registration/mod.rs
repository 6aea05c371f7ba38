//! Registration domain - the multi-entity onboarding orchestrator.
//!
//! A registration is a session-scoped saga: staged data is validated across
//! entity domains, a strict state machine gates progress, and an ordered
//! creation sequence materializes the record graph in the remote store with
//! reverse-order compensation standing in for the transactions that store
//! does not have.

pub mod actions;
pub mod errors;
pub mod events;
pub mod machines;
pub mod models;
pub mod sequencer;
pub mod validation;
