//! Graph backend for the application registration cache.
//!
//! [`GraphDirectoryRepository`] implements the repository contract against
//! Microsoft Graph. [`memory::MemoryDirectoryRepository`] implements the
//! same contract in process, for tests and `--offline` runs.

pub mod client;
pub mod memory;
pub mod repository;
pub mod token;

pub use client::{GraphClient, DEFAULT_GRAPH_BASE_URL};
pub use memory::MemoryDirectoryRepository;
pub use repository::GraphDirectoryRepository;
pub use token::{StaticTokenProvider, TokenProvider};
