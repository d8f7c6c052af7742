pub mod checkpoint_repository;
pub mod memory_source_repository;
pub mod source_repository;

pub use checkpoint_repository::{CheckpointRepository, SourceCatalog};
pub use memory_source_repository::InMemorySourceRepository;
pub use source_repository::SourceRepository;
