pub mod core;
pub mod export;
pub mod store;
pub mod students;
pub mod tables;
