//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Resolves the Bearer token to a user via the auth service.
//! - [`rbac::RequireAdmin`] -- Requires the `ADMIN` role.
//! - [`rbac::RequireAuth`] -- Requires any authenticated user.

pub mod auth;
pub mod rbac;
