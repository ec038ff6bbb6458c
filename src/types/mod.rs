// pagemark shared type definitions
// Each submodule defines types used across the crate.

pub mod errors;
pub mod highlight;
pub mod history;
pub mod preferences;
pub mod reader;
