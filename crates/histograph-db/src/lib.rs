pub mod config;
pub mod csv_store;
pub mod database;
pub mod node_repository;
pub mod session_repository;

pub use config::DatabaseConfig;
pub use csv_store::{CsvDataset, CsvNodeStore, export_records, read_records};
pub use database::Database;
pub use node_repository::NodeRepository;
pub use session_repository::SessionRepository;
