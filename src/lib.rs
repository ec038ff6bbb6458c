//! pagemark: find-and-mark highlighting and readable-content extraction for HTML pages.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod dom;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
