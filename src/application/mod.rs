//! Application services layer.

pub mod auth;
pub mod catalog;
pub mod chrome;
pub mod error;
pub mod kv;
pub mod loader;
pub mod repos;
