//! Identity matching: exhaustive Euclidean scan over a gallery snapshot.

use crate::types::{Embedding, GalleryEntry, MatchResult};

/// Default acceptance tolerance. Distances at or above this never qualify.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// Strategy for matching a query embedding against a gallery of registered
/// client embeddings.
///
/// Implementations must be pure over the supplied snapshot and must keep the
/// closest-qualifying-candidate-wins semantics, including the tie-break rule:
/// among entries at the identical minimal qualifying distance, the lowest
/// client id wins, and within one client the earliest gallery entry wins.
pub trait Matcher {
    fn match_embedding(
        &self,
        query: &Embedding,
        gallery: &[GalleryEntry],
        tolerance: f32,
    ) -> MatchResult;
}

/// Exhaustive linear-scan matcher, O(N·D) per query.
///
/// This is the system's scalability bottleneck; a future approximate index
/// must preserve the exact tolerance boundary and confidence semantics.
pub struct LinearScanMatcher;

impl Matcher for LinearScanMatcher {
    fn match_embedding(
        &self,
        query: &Embedding,
        gallery: &[GalleryEntry],
        tolerance: f32,
    ) -> MatchResult {
        let mut best: Option<(f32, i64)> = None;

        for entry in gallery {
            let distance = query.euclidean_distance(&entry.embedding);
            if distance >= tolerance {
                continue;
            }

            let better = match best {
                None => true,
                Some((best_distance, best_id)) => {
                    distance < best_distance
                        || (distance == best_distance && entry.client_id < best_id)
                }
            };
            if better {
                best = Some((distance, entry.client_id));
            }
        }

        match best {
            Some((distance, client_id)) => MatchResult::Match {
                client_id,
                distance,
                confidence: (1.0 - distance) * 100.0,
            },
            None => MatchResult::NoMatch,
        }
    }
}
