//! reception-core — Identity matching and rule-based car recommendation.
//!
//! The two algorithmic cores of the showroom reception system: matching a
//! face embedding against the gallery of registered clients, and scoring
//! the car catalog against a recognized client's profile. Both are pure
//! functions over caller-supplied snapshots; all I/O lives in the daemon
//! and store crates.

pub mod extractor;
pub mod matcher;
pub mod recommend;
pub mod types;

pub use extractor::{Detection, EmbeddingExtractor, ExtractError};
pub use matcher::{LinearScanMatcher, Matcher, DEFAULT_TOLERANCE};
pub use recommend::{recommend, score};
pub use types::{
    BoundingBox, Car, ClientProfile, CreditHistory, Embedding, Gender, GalleryEntry, MatchResult,
    ScoredCar, EMBEDDING_DIM,
};
