//! quizkit-core — Quiz session, question supply, cache and history.
//!
//! This crate holds the data model, the session state machine, and the
//! supply pipeline that turns provider output into validated questions.

pub mod bank;
pub mod cache;
pub mod error;
pub mod feedback;
pub mod history;
pub mod model;
pub mod results;
pub mod session;
pub mod supply;
pub mod traits;
