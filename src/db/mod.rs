pub mod connection;
pub mod db_builder;
pub mod db_persister;
pub mod entities;
pub mod persister;
pub mod queries;
