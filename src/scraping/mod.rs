// src/scraping/mod.rs
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod extractor;
pub mod pacing;
pub mod selectors;

pub use controller::{SessionController, SessionSettings};
pub use diagnostics::{Anomaly, Diagnostics};
pub use error::ScrapeError;
pub use extractor::{ContainerExtractor, DetailView};
pub use pacing::{ChallengeWait, Pacing};
