//! Request handlers, one submodule per resource.
//!
//! Handlers check existence, authorize against the engine in
//! `taskforge_core::authz`, mutate through the `taskforge_db` repositories,
//! record the audit entry and only then publish events.

pub mod attachment;
pub mod audit;
pub mod authz;
pub mod comment;
pub mod department;
pub mod document;
pub mod notification;
pub mod project;
pub mod task;
pub mod team;
pub mod time_log;
