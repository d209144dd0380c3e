//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod audit;
pub mod comment;
pub mod department;
pub mod document;
pub mod notification;
pub mod project;
pub mod status;
pub mod task;
pub mod team;
pub mod time_log;
pub mod user;
