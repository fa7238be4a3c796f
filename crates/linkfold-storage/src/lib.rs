pub mod memory;
pub mod mysql;

pub use linkfold_core::error::StorageError;
pub use linkfold_core::repository::{InsertOutcome, ReadRepository, Repository, UrlRecord};
pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
