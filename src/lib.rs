//! Spindle: a server-rendered music catalog browser.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
