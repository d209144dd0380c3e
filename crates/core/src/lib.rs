//! Domain core for the taskforge project-management backend.
//!
//! Everything in this crate is pure: no database, no HTTP, no clock reads
//! except where a caller passes `now` in. The persistence and API crates
//! build on these rules.

pub mod audit;
pub mod authz;
pub mod document;
pub mod error;
pub mod hashing;
pub mod notification;
pub mod pagination;
pub mod principal;
pub mod roles;
pub mod status;
pub mod task_graph;
pub mod time_tracking;
pub mod types;
