//! Tollgate - attempt throttling and input validation for audio tool front ends
//!
//! This crate holds the checks that run before an upload or auth request is
//! sent: a sliding-window rate limiter keyed by identifier, and pure
//! validators for audio files, processing parameters and form fields.

pub mod config;
pub mod error;
pub mod gate;
pub mod ratelimit;
pub mod validation;
