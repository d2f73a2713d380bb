mod bson;
mod collection;
mod counter;
mod errors;

pub use bson::Id;
pub use collection::{creation_order, ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{ensure_counter_exists, Counter, USER_ID_COUNTER};
pub use errors::is_duplicate_key_error;
