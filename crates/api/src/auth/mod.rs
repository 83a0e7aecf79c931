//! Authentication against the external auth service.
//!
//! - [`gateway`] -- the [`gateway::AuthGateway`] seam and its `reqwest` client.

pub mod gateway;
