//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod http;
pub mod kv;
pub mod remote;
pub mod telemetry;
