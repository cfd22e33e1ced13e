//! D-Bus interface for the reception daemon.
//!
//! Bus name: org.autoclient.Reception1
//! Object path: /org/autoclient/Reception1
//!
//! Image arguments are filesystem paths; the daemon and its clients share
//! the kiosk filesystem. Method replies are JSON strings.

use crate::engine::{EngineError, EngineHandle};
use image::RgbImage;
use reception_core::{recommend, Detection, LinearScanMatcher, MatchResult, Matcher};
use reception_store::{NewCar, NewClient, Store, StoreError};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use zbus::fdo;
use zbus::interface;

/// Purpose string stamped on visits auto-logged by recognition.
const AUTO_VISIT_PURPOSE: &str = "Auto detected by face recognition";

pub struct ReceptionService {
    engine: EngineHandle,
    store: Arc<Mutex<Store>>,
    tolerance: f32,
    top_k: usize,
}

impl ReceptionService {
    pub fn new(engine: EngineHandle, store: Arc<Mutex<Store>>, tolerance: f32, top_k: usize) -> Self {
        Self {
            engine,
            store,
            tolerance,
            top_k,
        }
    }

    /// Match one detection against the gallery and, on a match, rank the
    /// catalog and log the visit. The no-match reply carries no distance.
    async fn handle_detection(&self, detection: &Detection) -> fdo::Result<serde_json::Value> {
        let store = self.store.lock().await;
        let gallery = store.gallery_snapshot().map_err(store_err)?;
        let result =
            LinearScanMatcher.match_embedding(&detection.embedding, &gallery, self.tolerance);

        match result {
            MatchResult::NoMatch => Ok(json!({
                "recognized": false,
                "face_location": detection.bounding_box.as_array(),
            })),
            MatchResult::Match {
                client_id,
                distance,
                confidence,
            } => {
                let client = store.get_client(client_id).map_err(store_err)?;
                let catalog = store.catalog_snapshot().map_err(store_err)?;
                let ranked = recommend(&client.profile(), &catalog, self.top_k);
                let visit_id = store
                    .record_visit(client_id, AUTO_VISIT_PURPOSE, &ranked)
                    .map_err(store_err)?;

                tracing::info!(client_id, confidence, visit_id = %visit_id, "client recognized");

                Ok(json!({
                    "recognized": true,
                    "client_id": client_id,
                    "client_name": client.full_name(),
                    "confidence": confidence,
                    "distance": distance,
                    "face_location": detection.bounding_box.as_array(),
                    "visit_id": visit_id,
                    "recommendations": recommendations_payload(&ranked),
                }))
            }
        }
    }

    async fn recognize_image(&self, image: RgbImage) -> fdo::Result<serde_json::Value> {
        match self.engine.extract_single(image).await {
            Ok(detection) => self.handle_detection(&detection).await,
            Err(e) if e.is_no_face() => Ok(json!({
                "recognized": false,
                "reason": "no_face",
            })),
            Err(e) => Err(engine_err(e)),
        }
    }

    async fn recognize_all_image(&self, image: RgbImage) -> fdo::Result<serde_json::Value> {
        let detections = self.engine.extract_all(image).await.map_err(engine_err)?;
        let mut faces = Vec::with_capacity(detections.len());
        for detection in &detections {
            faces.push(self.handle_detection(detection).await?);
        }
        Ok(json!({ "faces": faces }))
    }
}

#[interface(name = "org.autoclient.Reception1")]
impl ReceptionService {
    /// Recognize the single face in an image, auto-logging a visit with
    /// recommendations on a match. Zero faces is a negative reply, not an
    /// error.
    async fn recognize(&self, image_path: &str) -> fdo::Result<String> {
        tracing::info!(image_path, "recognize requested");
        let image = load_image(image_path)?;
        Ok(self.recognize_image(image).await?.to_string())
    }

    /// Recognize every face in an image. An image with zero faces yields an
    /// empty list.
    async fn recognize_all(&self, image_path: &str) -> fdo::Result<String> {
        tracing::info!(image_path, "recognize_all requested");
        let image = load_image(image_path)?;
        Ok(self.recognize_all_image(image).await?.to_string())
    }

    /// Register an additional face embedding for an existing client.
    async fn register_face(&self, client_id: i64, image_path: &str) -> fdo::Result<String> {
        tracing::info!(client_id, image_path, "register_face requested");
        let image = load_image(image_path)?;

        let detection = match self.engine.extract_single(image).await {
            Ok(d) => d,
            Err(e) if e.is_no_face() => {
                return Err(fdo::Error::InvalidArgs(
                    "no face found in the provided image".into(),
                ))
            }
            Err(e) => return Err(engine_err(e)),
        };

        let store = self.store.lock().await;
        let embedding_id = store
            .append_embedding(client_id, &detection.embedding, Some(image_path))
            .map_err(store_err)?;

        Ok(json!({
            "client_id": client_id,
            "embedding_id": embedding_id,
            "face_location": detection.bounding_box.as_array(),
        })
        .to_string())
    }

    /// Rank the catalog for a known client without logging a visit.
    async fn recommend(&self, client_id: i64, limit: u32) -> fdo::Result<String> {
        let store = self.store.lock().await;
        let client = store.get_client(client_id).map_err(store_err)?;
        let catalog = store.catalog_snapshot().map_err(store_err)?;
        let ranked = recommend(&client.profile(), &catalog, limit as usize);
        Ok(recommendations_payload(&ranked).to_string())
    }

    /// Create a client from a JSON payload; returns the stored record.
    async fn create_client(&self, client_json: &str) -> fdo::Result<String> {
        let new: NewClient = serde_json::from_str(client_json)
            .map_err(|e| fdo::Error::InvalidArgs(format!("invalid client payload: {e}")))?;
        let store = self.store.lock().await;
        let client = store.create_client(&new).map_err(store_err)?;
        to_json(&client)
    }

    /// Replace a client's profile fields; returns the updated record.
    async fn update_client(&self, client_id: i64, client_json: &str) -> fdo::Result<String> {
        let new: NewClient = serde_json::from_str(client_json)
            .map_err(|e| fdo::Error::InvalidArgs(format!("invalid client payload: {e}")))?;
        let store = self.store.lock().await;
        let client = store.update_client(client_id, &new).map_err(store_err)?;
        to_json(&client)
    }

    async fn list_clients(&self) -> fdo::Result<String> {
        let store = self.store.lock().await;
        let clients = store.list_clients().map_err(store_err)?;
        to_json(&clients)
    }

    /// Remove a client and their embeddings and visits.
    async fn remove_client(&self, client_id: i64) -> fdo::Result<bool> {
        tracing::info!(client_id, "remove_client requested");
        let store = self.store.lock().await;
        store.remove_client(client_id).map_err(store_err)
    }

    /// Add a car to the catalog from a JSON payload; returns the stored record.
    async fn add_car(&self, car_json: &str) -> fdo::Result<String> {
        let new: NewCar = serde_json::from_str(car_json)
            .map_err(|e| fdo::Error::InvalidArgs(format!("invalid car payload: {e}")))?;
        let store = self.store.lock().await;
        let car = store.add_car(&new).map_err(store_err)?;
        to_json(&car)
    }

    async fn list_cars(&self) -> fdo::Result<String> {
        let store = self.store.lock().await;
        let cars = store.catalog_snapshot().map_err(store_err)?;
        to_json(&cars)
    }

    async fn remove_car(&self, car_id: i64) -> fdo::Result<bool> {
        tracing::info!(car_id, "remove_car requested");
        let store = self.store.lock().await;
        store.remove_car(car_id).map_err(store_err)
    }

    /// Visits that have not been closed yet.
    async fn open_visits(&self) -> fdo::Result<String> {
        let store = self.store.lock().await;
        let visits = store.open_visits().map_err(store_err)?;
        to_json(&visits)
    }

    /// Close a visit. Returns false when the visit id is unknown.
    async fn record_exit(&self, visit_id: &str) -> fdo::Result<bool> {
        let store = self.store.lock().await;
        match store.record_exit(visit_id) {
            Ok(()) => Ok(true),
            Err(StoreError::VisitNotFound(_)) => Ok(false),
            Err(e) => Err(store_err(e)),
        }
    }

    /// Visit analytics over a trailing window of days.
    async fn analytics(&self, days: u32) -> fdo::Result<String> {
        let store = self.store.lock().await;
        Ok(json!({
            "days": days,
            "visit_count": store.visit_count(days).map_err(store_err)?,
            "by_gender": store.visits_by_gender(days).map_err(store_err)?,
            "by_age": store.visits_by_age(days).map_err(store_err)?,
            "most_recommended": store.most_recommended_cars(days, 5).map_err(store_err)?,
        })
        .to_string())
    }

    /// Daemon status information.
    async fn status(&self) -> fdo::Result<String> {
        let store = self.store.lock().await;
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "gallery_size": store.gallery_size().map_err(store_err)?,
            "catalog_size": store.car_count().map_err(store_err)?,
            "tolerance": self.tolerance,
            "top_k": self.top_k,
        })
        .to_string())
    }
}

/// Decode an image from disk. Undecodable input is rejected before any
/// matching is attempted.
fn load_image(path: &str) -> fdo::Result<RgbImage> {
    let image = image::open(path)
        .map_err(|e| fdo::Error::InvalidArgs(format!("invalid image '{path}': {e}")))?;
    Ok(image.to_rgb8())
}

fn recommendations_payload(ranked: &[reception_core::ScoredCar]) -> serde_json::Value {
    json!(ranked
        .iter()
        .map(|s| json!({
            "car_id": s.car.id,
            "name": s.car.name,
            "brand": s.car.brand,
            "model": s.car.model,
            "price": s.car.price,
            "year": s.car.year,
            "category": s.car.category,
            "image_url": s.car.image_url,
            "interest_score": s.score,
        }))
        .collect::<Vec<_>>())
}

fn to_json<T: serde::Serialize>(value: &T) -> fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| fdo::Error::Failed(format!("serialize reply: {e}")))
}

fn store_err(e: StoreError) -> fdo::Error {
    match e {
        StoreError::ClientNotFound(_)
        | StoreError::CarNotFound(_)
        | StoreError::VisitNotFound(_) => fdo::Error::InvalidArgs(e.to_string()),
        other => fdo::Error::Failed(other.to_string()),
    }
}

fn engine_err(e: EngineError) -> fdo::Error {
    fdo::Error::Failed(format!("extraction engine: {e}"))
}
