pub mod api;
pub mod db;
pub mod export;
pub mod form;
pub mod mongodb;
