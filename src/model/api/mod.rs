//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Object IDs are serialised as hex strings.
//! - Missing request fields become validation errors instead of parse failures.

pub mod auth;
pub mod census;
pub mod group;
pub mod id;
