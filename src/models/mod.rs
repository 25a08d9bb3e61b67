pub mod adjacency;
pub mod catalog;
pub mod cube;

pub use adjacency::AdjacencyMatrix;
pub use catalog::Catalog;
pub use cube::{indices_to_multi_hot, slots_to_multi_hot, CubeSet, SENTINEL};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    /// Card names currently in the cube. Names missing from the catalog are skipped.
    pub cards: Vec<String>,
    pub amount: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Suggestion>,
    pub matched_cards: usize,
    pub unknown_cards: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub index: usize,
    pub name: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub batches: usize,
    pub reconstruction_loss: f32,
    pub regularization_loss: f32,
    pub total_loss: f32,
}
