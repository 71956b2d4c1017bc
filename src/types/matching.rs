// src/types/matching.rs
use serde::{Deserialize, Serialize};

/// One entry of the matching service response.
///
/// Only `position` feeds the scraper; `prompt` and `user` are validated as part
/// of the schema and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingCriterion {
    pub position: String,
    pub prompt: String,
    pub user: i64,
}
