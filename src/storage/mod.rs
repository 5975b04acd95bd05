pub mod assets;
pub mod auth;
pub mod catalog;
pub mod db;
pub mod error;
pub mod fs;
pub mod kv;
pub(crate) mod schema;
pub mod static_catalog;
