//! Data models for the content CMS.
//!
//! Field names serialize in camelCase to match the admin panel's scripts.

mod content;

pub use content::*;
