//! Embedding extraction seam.
//!
//! Face detection and embedding extraction are an external capability; the
//! core only defines the trait the daemon's ONNX-backed implementation (and
//! test fakes) plug into.

use crate::types::{BoundingBox, Embedding};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// Zero faces on a single-face request. A negative result, distinct
    /// from a failed match downstream.
    #[error("no face detected")]
    NoFaceDetected,
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Transient failure of the extraction capability; retried by the
    /// caller's policy, not here.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
}

/// One detected face: its embedding and where it was found in the image.
#[derive(Debug, Clone)]
pub struct Detection {
    pub embedding: Embedding,
    pub bounding_box: BoundingBox,
}

/// Capability that turns an image into zero or more face detections.
pub trait EmbeddingExtractor {
    /// Extract every face in the image. Zero faces is a valid result,
    /// not an error.
    fn extract(&mut self, image: &image::RgbImage) -> Result<Vec<Detection>, ExtractError>;

    /// Extract exactly one face, failing with [`ExtractError::NoFaceDetected`]
    /// when the capability reports none. When several faces are present the
    /// first reported one is used.
    fn extract_single(&mut self, image: &image::RgbImage) -> Result<Detection, ExtractError> {
        self.extract(image)?
            .into_iter()
            .next()
            .ok_or(ExtractError::NoFaceDetected)
    }
}
