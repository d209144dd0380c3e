//! Request extractors for identity and request metadata.
//!
//! - [`auth::AuthUser`] -- Resolves the acting [`Principal`](taskforge_core::principal::Principal)
//!   from a JWT Bearer token and the current user row.
//! - [`rbac::RequireAdmin`] -- Requires the ADMIN role.
//! - [`client::ClientInfo`] -- Caller IP and user agent for audit entries.

pub mod auth;
pub mod client;
pub mod rbac;
