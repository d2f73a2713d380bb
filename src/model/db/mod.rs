//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - Object IDs and datetimes are serialised in MongoDB's own format.
//! - User IDs are plain integers allocated from a counter.

pub mod census;
pub mod group;
pub mod petition;
pub mod token;
pub mod user;
