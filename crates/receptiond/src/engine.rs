use image::RgbImage;
use reception_core::{Detection, EmbeddingExtractor, ExtractError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("engine thread exited")]
    ChannelClosed,
}

impl EngineError {
    /// Whether this is the zero-faces negative result rather than a failure.
    pub fn is_no_face(&self) -> bool {
        matches!(self, EngineError::Extract(ExtractError::NoFaceDetected))
    }
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    /// Single-face extraction; zero faces is an error.
    ExtractSingle {
        image: RgbImage,
        reply: oneshot::Sender<Result<Detection, ExtractError>>,
    },
    /// Multi-face extraction; zero faces is a valid empty result.
    ExtractAll {
        image: RgbImage,
        reply: oneshot::Sender<Result<Vec<Detection>, ExtractError>>,
    },
}

/// Clone-safe handle to the engine thread that owns the extractor.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Extract exactly one face, failing with `NoFaceDetected` on zero faces.
    pub async fn extract_single(&self, image: RgbImage) -> Result<Detection, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::ExtractSingle {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }

    /// Extract every face in the image; an empty vector is a valid result.
    pub async fn extract_all(&self, image: RgbImage) -> Result<Vec<Detection>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::ExtractAll {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }
}

/// Spawn the extraction engine on a dedicated OS thread.
///
/// The extractor (and its inference session) lives on that thread for its
/// whole lifetime; D-Bus handlers reach it through the returned handle.
pub fn spawn_engine(mut extractor: Box<dyn EmbeddingExtractor + Send>) -> EngineHandle {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("reception-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::ExtractSingle { image, reply } => {
                        let _ = reply.send(extractor.extract_single(&image));
                    }
                    EngineRequest::ExtractAll { image, reply } => {
                        let _ = reply.send(extractor.extract(&image));
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    EngineHandle { tx }
}
