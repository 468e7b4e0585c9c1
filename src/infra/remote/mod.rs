//! Hosted backend adapters: REST catalog reads and the auth endpoint.

mod auth;
mod catalog;
mod client;

pub use auth::HostedIdentity;
pub use catalog::HostedCatalog;
pub use client::{BackendClient, Filter};
