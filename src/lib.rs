pub mod api;
pub mod config;
pub mod db;
pub mod ingest;
pub mod pdf;
pub mod roles;
pub mod store;
