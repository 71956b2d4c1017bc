// src/core/mod.rs
//! Core services shared by the producer and the workers

pub mod config_manager;
pub mod fs_ops;
pub mod matching_client;

pub use config_manager::ConfigManager;
pub use fs_ops::FsOps;
pub use matching_client::{CriteriaSource, MatchingClient};
