pub mod connection;
pub mod db_manager;
pub mod models;
pub mod queries;
pub mod schema;
