use std::fmt;
use thiserror::Error;

/// Which without-replacement draw ran out of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStep {
    FlipOut,
    FlipIn,
}

impl fmt::Display for SamplingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingStep::FlipOut => write!(f, "flip-out"),
            SamplingStep::FlipIn => write!(f, "flip-in"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CubeRecError {
    #[error("item index {index} out of range for catalog of {num_items} items (collection {collection})")]
    IndexOutOfRange {
        collection: usize,
        index: usize,
        num_items: usize,
    },

    #[error("collection {collection} has {len} slots, expected {expected}")]
    RaggedCollection {
        collection: usize,
        len: usize,
        expected: usize,
    },

    #[error("collection {collection} contains item {item} more than once")]
    DuplicateItem { collection: usize, item: usize },

    #[error("no collections supplied")]
    EmptyCollections,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("adjacency matrix must be square, got {rows}x{cols}")]
    NonSquareAdjacency { rows: usize, cols: usize },

    #[error("adjacency matrix contains a negative or non-finite value at ({row}, {col})")]
    InvalidAdjacencyValue { row: usize, col: usize },

    #[error("adjacency row {row} sums to zero and cannot be normalized")]
    ZeroAdjacencyRow { row: usize },

    #[error("adjacency matrix sums to zero")]
    ZeroAdjacency,

    #[error("collection {collection} has no negative-sampling weight over its exclusion set")]
    ZeroWeightExclusion { collection: usize },

    #[error("{step} sampling for collection {collection} needs {requested} distinct items, only {available} available")]
    InsufficientCandidates {
        collection: usize,
        step: SamplingStep,
        requested: usize,
        available: usize,
    },

    #[error("regression sampling needs {requested} distinct items, only {available} have non-zero weight")]
    InsufficientRegressionCandidates { requested: usize, available: usize },

    #[error("batch {batch} out of range, epoch has {num_batches} batches")]
    BatchOutOfRange { batch: usize, num_batches: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("cannot remove item {item} from multiset, it is not present")]
    MultisetUnderflow { item: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Artifact(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, CubeRecError>;
