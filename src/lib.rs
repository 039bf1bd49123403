//! Privacy-first cycle tracking and prediction core.
//!
//! The heart of the crate is the [`prediction`] module: pure functions that
//! turn one owner's cycle history into derived per-cycle lengths, rounded
//! averages, and a forward projection from the most recent record. Around it
//! sit accounts and sessions ([`auth`]), an encrypted at-rest snapshot store
//! ([`crypto`], [`storage`]), and the [`service::Tracker`] command layer that
//! a transport of the caller's choosing can sit on top of.

pub mod auth;
pub mod crypto;
pub mod models;
pub mod prediction;
pub mod service;
pub mod storage;

pub use service::{ServiceError, Tracker};
