pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod indexing;
pub mod ingest;
pub mod util;
