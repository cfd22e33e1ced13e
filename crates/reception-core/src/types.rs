use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Embedding dimensionality of the face-embedding capability in use.
///
/// A design-time constant: every stored and queried vector has exactly this
/// many components, and the extractor rejects model outputs of any other
/// width before they can reach the matcher.
pub const EMBEDDING_DIM: usize = 128;

/// Bounding box of a detected face in source-image pixel coordinates,
/// stored in `[top, right, bottom, left]` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl BoundingBox {
    /// `[top, right, bottom, left]`, the order used in wire payloads.
    pub fn as_array(&self) -> [u32; 4] {
        [self.top, self.right, self.bottom, self.left]
    }
}

/// Face embedding vector (128-dimensional, Euclidean metric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Non-negative and symmetric. Both vectors must share [`EMBEDDING_DIM`];
    /// the extractor enforces this before vectors enter the gallery.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        debug_assert_eq!(self.values.len(), other.values.len());
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One gallery row: a stored embedding owned by exactly one client.
/// A client may own several entries (multiple registrations).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub client_id: i64,
    pub embedding: Embedding,
}

/// Outcome of matching a query embedding against a gallery snapshot.
///
/// When nothing qualifies under the tolerance, the best distance found is
/// deliberately not carried in the result.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Match {
        client_id: i64,
        /// Raw Euclidean distance of the winning entry, strictly below tolerance.
        distance: f32,
        /// `(1 - distance) * 100`, defined only for qualifying matches.
        confidence: f32,
    },
    NoMatch,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Match { .. })
    }

    pub fn client_id(&self) -> Option<i64> {
        match self {
            MatchResult::Match { client_id, .. } => Some(*client_id),
            MatchResult::NoMatch => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(format!("gender must be Male or Female, got '{other}'")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("Male"),
            Gender::Female => f.write_str("Female"),
        }
    }
}

/// Credit history is tri-state: an unregistered history is scored the same
/// as a known-bad one, but callers may still want to distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CreditHistory {
    Yes,
    No,
    #[default]
    Unknown,
}

/// Attributes of a recognized client consumed by recommendation scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    pub client_id: i64,
    pub age: i32,
    pub gender: Gender,
    #[serde(default)]
    pub family_members: i32,
    /// May be empty; an empty value simply fails the married condition.
    #[serde(default)]
    pub marital_status: String,
    /// May be empty; an empty value simply fails the job conditions.
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub has_car: bool,
    #[serde(default)]
    pub has_credit: CreditHistory,
    #[serde(default)]
    pub is_student: bool,
    #[serde(default)]
    pub budget: Option<f64>,
}

/// A recommendable catalog car.
///
/// `features` maps feature name to a boolean flag; an absent key is
/// equivalent to `false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub price: f64,
    pub year: i32,
    pub category: String,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Car {
    /// Whether a boolean feature flag is set. Absent keys read as `false`.
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }
}

/// A car with its interest score, produced per recommendation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCar {
    pub car: Car,
    /// Interest score in [0, 100].
    pub score: f64,
}
