//! ONNX-backed embedding extractor.
//!
//! Wraps an end-to-end face-embedding model: one graph takes an RGB image
//! and reports every detected face as a box plus a 128-dimensional
//! embedding. Detection itself lives inside the model; this module only
//! handles tensor plumbing and output validation.

use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use reception_core::{BoundingBox, Detection, Embedding, EmbeddingExtractor, ExtractError, EMBEDDING_DIM};
use std::path::Path;
use thiserror::Error;

// Normalization constants of the embedding model's input distribution.
const INPUT_MEAN: f32 = 127.5;
const INPUT_STD: f32 = 127.5;
/// Expected model outputs: boxes [N, 4] then embeddings [N, 128].
const BOX_WIDTH: usize = 4;

#[derive(Error, Debug)]
pub enum ExtractorLoadError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Face-embedding extractor running on ONNX Runtime, CPU inference.
pub struct OnnxExtractor {
    session: Session,
}

impl OnnxExtractor {
    /// Load the face-embedding ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, ExtractorLoadError> {
        if !model_path.exists() {
            return Err(ExtractorLoadError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face-embedding model"
        );

        Ok(Self { session })
    }

    /// Convert an RGB image to a normalized NCHW float tensor.
    fn preprocess(image: &RgbImage) -> Array4<f32> {
        let (width, height) = image.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel.0[c] as f32 - INPUT_MEAN) / INPUT_STD;
            }
        }

        tensor
    }
}

impl EmbeddingExtractor for OnnxExtractor {
    fn extract(&mut self, image: &RgbImage) -> Result<Vec<Detection>, ExtractError> {
        let input = Self::preprocess(image);

        let outputs = self
            .session
            .run(ort::inputs![
                TensorRef::from_array_view(input.view())
                    .map_err(|e| ExtractError::ExtractionFailed(e.to_string()))?
            ])
            .map_err(|e| ExtractError::ExtractionFailed(e.to_string()))?;

        let (_, boxes) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractError::ExtractionFailed(format!("boxes output: {e}")))?;
        let (_, embeddings) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractError::ExtractionFailed(format!("embeddings output: {e}")))?;

        decode_outputs(boxes, embeddings)
    }
}

/// Pair up the flat box and embedding tensors into detections.
///
/// Zero faces is a valid result and yields an empty vector; the single-face
/// `NoFaceDetected` refusal lives in [`EmbeddingExtractor::extract_single`].
fn decode_outputs(boxes: &[f32], embeddings: &[f32]) -> Result<Vec<Detection>, ExtractError> {
    if boxes.len() % BOX_WIDTH != 0 {
        return Err(ExtractError::ExtractionFailed(format!(
            "boxes tensor length {} is not a multiple of {BOX_WIDTH}",
            boxes.len()
        )));
    }
    let count = boxes.len() / BOX_WIDTH;
    if count == 0 {
        return Ok(Vec::new());
    }

    if embeddings.len() != count * EMBEDDING_DIM {
        let actual = embeddings.len() / count;
        return Err(ExtractError::DimensionMismatch {
            expected: EMBEDDING_DIM,
            actual,
        });
    }

    let detections = (0..count)
        .map(|i| {
            let b = &boxes[i * BOX_WIDTH..(i + 1) * BOX_WIDTH];
            let e = &embeddings[i * EMBEDDING_DIM..(i + 1) * EMBEDDING_DIM];
            Detection {
                embedding: Embedding::new(e.to_vec()),
                bounding_box: BoundingBox {
                    top: b[0].max(0.0) as u32,
                    right: b[1].max(0.0) as u32,
                    bottom: b[2].max(0.0) as u32,
                    left: b[3].max(0.0) as u32,
                },
            }
        })
        .collect();

    Ok(detections)
}
