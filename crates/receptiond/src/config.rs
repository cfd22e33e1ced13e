use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Path to the face-embedding ONNX model.
    pub model_path: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Euclidean distance tolerance for a positive identity match.
    pub tolerance: f32,
    /// Number of cars returned per recommendation.
    pub top_k: usize,
    /// Whether to seed the catalog with sample stock when empty.
    pub seed_catalog: bool,
    /// Serve on the system bus instead of the session bus.
    pub system_bus: bool,
}

impl Config {
    /// Load configuration from `RECEPTION_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("reception");

        let db_path = std::env::var("RECEPTION_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("reception.db"));

        let model_path = std::env::var("RECEPTION_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("models/face_embedder.onnx"));

        Self {
            model_path,
            db_path,
            tolerance: env_f32("RECEPTION_TOLERANCE", reception_core::DEFAULT_TOLERANCE),
            top_k: env_usize("RECEPTION_TOP_K", 3),
            seed_catalog: std::env::var("RECEPTION_SEED_CATALOG")
                .map(|v| v != "0")
                .unwrap_or(true),
            system_bus: std::env::var("RECEPTION_SYSTEM_BUS")
                .map(|v| v == "1")
                .unwrap_or(false),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
