//! SQLite store for clients, gallery embeddings, cars and visits.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reception_core::{
    Car, ClientProfile, CreditHistory, Embedding, GalleryEntry, Gender, ScoredCar, EMBEDDING_DIM,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("client not found: {0}")]
    ClientNotFound(i64),
    #[error("car not found: {0}")]
    CarNotFound(i64),
    #[error("visit not found: {0}")]
    VisitNotFound(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    BadEmbedding { expected: usize, actual: usize },
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A registered client record.
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub age: i32,
    pub phone: Option<String>,
    pub interests: Option<String>,
    pub budget: Option<f64>,
    pub marital_status: String,
    pub job_title: String,
    pub has_car: bool,
    pub has_credit: CreditHistory,
    pub family_members: i32,
    pub is_student: bool,
    pub workplace: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Project the record onto the attributes the recommendation core scores.
    pub fn profile(&self) -> ClientProfile {
        ClientProfile {
            client_id: self.id,
            age: self.age,
            gender: self.gender,
            family_members: self.family_members,
            marital_status: self.marital_status.clone(),
            job_title: self.job_title.clone(),
            has_car: self.has_car,
            has_credit: self.has_credit,
            is_student: self.is_student,
            budget: self.budget,
        }
    }
}

/// Fields for creating (or fully replacing) a client record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub age: i32,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub marital_status: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub has_car: bool,
    #[serde(default)]
    pub has_credit: CreditHistory,
    #[serde(default)]
    pub family_members: i32,
    #[serde(default)]
    pub is_student: bool,
    #[serde(default)]
    pub workplace: Option<String>,
}

/// Fields for adding a catalog car.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCar {
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

/// One line of the recommendation snapshot stored with a visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitSummary {
    pub car_id: i64,
    pub name: String,
    pub interest_score: f64,
}

/// A recorded showroom visit.
#[derive(Debug, Clone, Serialize)]
pub struct Visit {
    pub id: String,
    pub client_id: i64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub purpose: Option<String>,
    pub recommendations: Option<Vec<VisitSummary>>,
}

/// Visit count for one gender value.
#[derive(Debug, Clone, Serialize)]
pub struct GenderCount {
    pub gender: Gender,
    pub count: i64,
}

/// Visit count for one age range.
#[derive(Debug, Clone, Serialize)]
pub struct AgeBucket {
    pub age_range: String,
    pub count: i64,
}

/// Recommendation frequency for one car.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedCount {
    pub car_id: i64,
    pub name: String,
    pub count: i64,
}

/// Age ranges used by the visit analytics, inclusive on both ends.
const AGE_RANGES: [(i32, i32, &str); 6] = [
    (0, 18, "0-18"),
    (19, 25, "19-25"),
    (26, 35, "26-35"),
    (36, 45, "36-45"),
    (46, 55, "46-55"),
    (56, 100, "56+"),
];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS clients (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    gender          TEXT NOT NULL,
    age             INTEGER NOT NULL,
    phone           TEXT,
    interests       TEXT,
    budget          REAL,
    marital_status  TEXT NOT NULL DEFAULT '',
    job_title       TEXT NOT NULL DEFAULT '',
    has_car         INTEGER NOT NULL DEFAULT 0,
    has_credit      TEXT,
    family_members  INTEGER NOT NULL DEFAULT 0,
    is_student      INTEGER NOT NULL DEFAULT 0,
    workplace       TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS face_embeddings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id   INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    vector      TEXT NOT NULL,
    image_path  TEXT,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_face_embeddings_client ON face_embeddings(client_id);

CREATE TABLE IF NOT EXISTS cars (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    brand       TEXT NOT NULL,
    model       TEXT NOT NULL,
    price       REAL NOT NULL,
    year        INTEGER NOT NULL,
    category    TEXT NOT NULL,
    features    TEXT NOT NULL DEFAULT '{}',
    image_url   TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS visits (
    id               TEXT PRIMARY KEY,
    client_id        INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    entry_time       TEXT NOT NULL,
    exit_time        TEXT,
    purpose          TEXT,
    recommendations  TEXT
);
CREATE INDEX IF NOT EXISTS idx_visits_entry ON visits(entry_time);
";

/// SQLite-backed store. Not `Sync`; the daemon wraps it in an async mutex.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at the given path and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Timestamps are RFC 3339 UTC with fixed precision, so string
    /// comparison in SQL matches chronological order.
    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    // --- clients ---

    pub fn create_client(&self, new: &NewClient) -> Result<Client, StoreError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO clients (first_name, last_name, gender, age, phone, interests, budget,
                                  marital_status, job_title, has_car, has_credit, family_members,
                                  is_student, workplace, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
            params![
                new.first_name,
                new.last_name,
                new.gender.to_string(),
                new.age,
                new.phone,
                new.interests,
                new.budget,
                new.marital_status,
                new.job_title,
                new.has_car,
                credit_to_db(new.has_credit),
                new.family_members,
                new.is_student,
                new.workplace,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(client_id = id, "client created");
        self.get_client(id)
    }

    pub fn get_client(&self, id: i64) -> Result<Client, StoreError> {
        self.conn
            .query_row(
                &format!("{CLIENT_SELECT} WHERE id = ?1"),
                params![id],
                row_to_client,
            )
            .optional()?
            .ok_or(StoreError::ClientNotFound(id))
    }

    pub fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CLIENT_SELECT} ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_client)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Full replace of a client's mutable fields; bumps `updated_at`.
    pub fn update_client(&self, id: i64, new: &NewClient) -> Result<Client, StoreError> {
        let changed = self.conn.execute(
            "UPDATE clients SET first_name = ?2, last_name = ?3, gender = ?4, age = ?5,
                    phone = ?6, interests = ?7, budget = ?8, marital_status = ?9,
                    job_title = ?10, has_car = ?11, has_credit = ?12, family_members = ?13,
                    is_student = ?14, workplace = ?15, updated_at = ?16
             WHERE id = ?1",
            params![
                id,
                new.first_name,
                new.last_name,
                new.gender.to_string(),
                new.age,
                new.phone,
                new.interests,
                new.budget,
                new.marital_status,
                new.job_title,
                new.has_car,
                credit_to_db(new.has_credit),
                new.family_members,
                new.is_student,
                new.workplace,
                Self::now(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::ClientNotFound(id));
        }
        self.get_client(id)
    }

    /// Remove a client and, via cascade, their embeddings and visits.
    pub fn remove_client(&self, id: i64) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM clients WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // --- gallery ---

    /// Append one embedding registration for a client.
    pub fn append_embedding(
        &self,
        client_id: i64,
        embedding: &Embedding,
        image_path: Option<&str>,
    ) -> Result<i64, StoreError> {
        if embedding.values.len() != EMBEDDING_DIM {
            return Err(StoreError::BadEmbedding {
                expected: EMBEDDING_DIM,
                actual: embedding.values.len(),
            });
        }
        // Verify the owner exists up front for a typed error instead of a
        // foreign key violation.
        self.get_client(client_id)?;

        let vector = serde_json::to_string(&embedding.values)?;
        self.conn.execute(
            "INSERT INTO face_embeddings (client_id, vector, image_path, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![client_id, vector, image_path, Self::now()],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(client_id, embedding_id = id, "embedding registered");
        Ok(id)
    }

    /// Immutable gallery snapshot in the matcher's documented iteration
    /// order: ascending client id, then ascending registration id.
    pub fn gallery_snapshot(&self) -> Result<Vec<GalleryEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT client_id, vector FROM face_embeddings ORDER BY client_id, id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut gallery = Vec::new();
        for row in rows {
            let (client_id, vector) = row?;
            let values: Vec<f32> = serde_json::from_str(&vector)?;
            gallery.push(GalleryEntry {
                client_id,
                embedding: Embedding::new(values),
            });
        }
        Ok(gallery)
    }

    pub fn gallery_size(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM face_embeddings", [], |r| r.get(0))?)
    }

    // --- cars ---

    pub fn add_car(&self, new: &NewCar) -> Result<Car, StoreError> {
        let features = serde_json::to_string(&new.features)?;
        self.conn.execute(
            "INSERT INTO cars (name, brand, model, price, year, category, features, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                new.name,
                new.brand,
                new.model,
                new.price,
                new.year,
                new.category,
                features,
                new.image_url,
                Self::now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_car(id)
    }

    pub fn get_car(&self, id: i64) -> Result<Car, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("{CAR_SELECT} WHERE id = ?1"),
                params![id],
                row_to_raw_car,
            )
            .optional()?
            .ok_or(StoreError::CarNotFound(id))?;
        raw_car_to_car(row)
    }

    /// Immutable catalog snapshot in ascending car id order.
    pub fn catalog_snapshot(&self) -> Result<Vec<Car>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("{CAR_SELECT} ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_raw_car)?;
        let mut cars = Vec::new();
        for row in rows {
            cars.push(raw_car_to_car(row?)?);
        }
        Ok(cars)
    }

    pub fn remove_car(&self, id: i64) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM cars WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn car_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM cars", [], |r| r.get(0))?)
    }

    // --- visits ---

    /// Record a visit with its recommendation snapshot. Returns the opaque
    /// visit event id.
    pub fn record_visit(
        &self,
        client_id: i64,
        purpose: &str,
        recommendations: &[ScoredCar],
    ) -> Result<String, StoreError> {
        self.get_client(client_id)?;

        let summary: Vec<VisitSummary> = recommendations
            .iter()
            .map(|s| VisitSummary {
                car_id: s.car.id,
                name: format!("{} {}", s.car.brand, s.car.model),
                interest_score: s.score,
            })
            .collect();

        let id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO visits (id, client_id, entry_time, purpose, recommendations)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                client_id,
                Self::now(),
                purpose,
                serde_json::to_string(&summary)?,
            ],
        )?;
        tracing::info!(client_id, visit_id = %id, "visit recorded");
        Ok(id)
    }

    /// Close a visit by stamping its exit time. Idempotent on already
    /// closed visits.
    pub fn record_exit(&self, visit_id: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE visits SET exit_time = ?2 WHERE id = ?1",
            params![visit_id, Self::now()],
        )?;
        if changed == 0 {
            return Err(StoreError::VisitNotFound(visit_id.to_string()));
        }
        Ok(())
    }

    /// Visits without an exit time, oldest first.
    pub fn open_visits(&self) -> Result<Vec<Visit>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{VISIT_SELECT} WHERE exit_time IS NULL ORDER BY entry_time"
        ))?;
        let rows = stmt.query_map([], row_to_raw_visit)?;
        let mut visits = Vec::new();
        for row in rows {
            visits.push(raw_visit_to_visit(row?)?);
        }
        Ok(visits)
    }

    // --- analytics ---

    fn window_start(days: u32) -> String {
        (Utc::now() - Duration::days(days as i64)).to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Total visits over the trailing window.
    pub fn visit_count(&self, days: u32) -> Result<i64, StoreError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM visits WHERE entry_time >= ?1",
            params![Self::window_start(days)],
            |r| r.get(0),
        )?)
    }

    /// Visits over the trailing window grouped by client gender.
    pub fn visits_by_gender(&self, days: u32) -> Result<Vec<GenderCount>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.gender, COUNT(v.id) FROM visits v
             JOIN clients c ON c.id = v.client_id
             WHERE v.entry_time >= ?1
             GROUP BY c.gender ORDER BY c.gender",
        )?;
        let rows = stmt.query_map(params![Self::window_start(days)], |row| {
            let gender: String = row.get(0)?;
            let gender = gender
                .parse::<Gender>()
                .map_err(|e| conversion_err(0, e))?;
            Ok(GenderCount {
                gender,
                count: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Visits over the trailing window bucketed into the standard age ranges.
    pub fn visits_by_age(&self, days: u32) -> Result<Vec<AgeBucket>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.age, COUNT(v.id) FROM visits v
             JOIN clients c ON c.id = v.client_id
             WHERE v.entry_time >= ?1
             GROUP BY c.id",
        )?;
        let rows = stmt.query_map(params![Self::window_start(days)], |row| {
            Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = [0i64; AGE_RANGES.len()];
        for row in rows {
            let (age, visits) = row?;
            if let Some(i) = AGE_RANGES.iter().position(|(lo, hi, _)| age >= *lo && age <= *hi) {
                counts[i] += visits;
            }
        }
        Ok(AGE_RANGES
            .iter()
            .zip(counts)
            .map(|((_, _, label), count)| AgeBucket {
                age_range: label.to_string(),
                count,
            })
            .collect())
    }

    /// Most frequently recommended cars over the trailing window, by count
    /// descending, ties by ascending car id.
    pub fn most_recommended_cars(
        &self,
        days: u32,
        limit: usize,
    ) -> Result<Vec<RecommendedCount>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT recommendations FROM visits
             WHERE entry_time >= ?1 AND recommendations IS NOT NULL",
        )?;
        let rows = stmt.query_map(params![Self::window_start(days)], |row| {
            row.get::<_, String>(0)
        })?;

        let mut counts: BTreeMap<i64, (String, i64)> = BTreeMap::new();
        for row in rows {
            let summaries: Vec<VisitSummary> = serde_json::from_str(&row?)?;
            for s in summaries {
                let entry = counts.entry(s.car_id).or_insert((s.name, 0));
                entry.1 += 1;
            }
        }

        let mut ranked: Vec<RecommendedCount> = counts
            .into_iter()
            .map(|(car_id, (name, count))| RecommendedCount {
                car_id,
                name,
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.car_id.cmp(&b.car_id)));
        ranked.truncate(limit);
        Ok(ranked)
    }
}

const CLIENT_SELECT: &str = "SELECT id, first_name, last_name, gender, age, phone, interests,
    budget, marital_status, job_title, has_car, has_credit, family_members, is_student,
    workplace, created_at, updated_at FROM clients";

const CAR_SELECT: &str =
    "SELECT id, name, brand, model, price, year, category, features, image_url FROM cars";

const VISIT_SELECT: &str =
    "SELECT id, client_id, entry_time, exit_time, purpose, recommendations FROM visits";

fn credit_to_db(credit: CreditHistory) -> Option<&'static str> {
    match credit {
        CreditHistory::Yes => Some("Yes"),
        CreditHistory::No => Some("No"),
        CreditHistory::Unknown => None,
    }
}

fn credit_from_db(value: Option<String>) -> CreditHistory {
    match value.as_deref() {
        Some("Yes") => CreditHistory::Yes,
        Some("No") => CreditHistory::No,
        _ => CreditHistory::Unknown,
    }
}

fn conversion_err(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
}

fn parse_timestamp(idx: usize, raw: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn row_to_client(row: &Row<'_>) -> rusqlite::Result<Client> {
    let gender: String = row.get(3)?;
    let gender = gender.parse::<Gender>().map_err(|e| conversion_err(3, e))?;
    Ok(Client {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        gender,
        age: row.get(4)?,
        phone: row.get(5)?,
        interests: row.get(6)?,
        budget: row.get(7)?,
        marital_status: row.get(8)?,
        job_title: row.get(9)?,
        has_car: row.get(10)?,
        has_credit: credit_from_db(row.get(11)?),
        family_members: row.get(12)?,
        is_student: row.get(13)?,
        workplace: row.get(14)?,
        created_at: parse_timestamp(15, row.get(15)?)?,
        updated_at: parse_timestamp(16, row.get(16)?)?,
    })
}

/// Car row with the features column still serialized; JSON decoding happens
/// outside the rusqlite row callback so it can surface as a `StoreError`.
struct RawCar {
    car: Car,
    features_json: String,
}

fn row_to_raw_car(row: &Row<'_>) -> rusqlite::Result<RawCar> {
    Ok(RawCar {
        car: Car {
            id: row.get(0)?,
            name: row.get(1)?,
            brand: row.get(2)?,
            model: row.get(3)?,
            price: row.get(4)?,
            year: row.get(5)?,
            category: row.get(6)?,
            features: BTreeMap::new(),
            image_url: row.get(8)?,
        },
        features_json: row.get(7)?,
    })
}

fn raw_car_to_car(raw: RawCar) -> Result<Car, StoreError> {
    let mut car = raw.car;
    car.features = serde_json::from_str(&raw.features_json)?;
    Ok(car)
}

struct RawVisit {
    visit: Visit,
    recommendations_json: Option<String>,
}

fn row_to_raw_visit(row: &Row<'_>) -> rusqlite::Result<RawVisit> {
    let exit_time: Option<String> = row.get(3)?;
    Ok(RawVisit {
        visit: Visit {
            id: row.get(0)?,
            client_id: row.get(1)?,
            entry_time: parse_timestamp(2, row.get(2)?)?,
            exit_time: exit_time.map(|t| parse_timestamp(3, t)).transpose()?,
            purpose: row.get(4)?,
            recommendations: None,
        },
        recommendations_json: row.get(5)?,
    })
}

fn raw_visit_to_visit(raw: RawVisit) -> Result<Visit, StoreError> {
    let mut visit = raw.visit;
    visit.recommendations = raw
        .recommendations_json
        .map(|json| serde_json::from_str(&json))
        .transpose()?;
    Ok(visit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_client(first: &str, gender: Gender, age: i32) -> NewClient {
        NewClient {
            first_name: first.to_string(),
            last_name: "Test".to_string(),
            gender,
            age,
            phone: None,
            interests: None,
            budget: None,
            marital_status: String::new(),
            job_title: String::new(),
            has_car: false,
            has_credit: CreditHistory::Unknown,
            family_members: 0,
            is_student: false,
            workplace: None,
        }
    }

    fn new_car(name: &str, price: f64) -> NewCar {
        NewCar {
            name: name.to_string(),
            brand: "Testa".to_string(),
            model: name.to_string(),
            price,
            year: 2023,
            category: "sedan".to_string(),
            features: [("comfort".to_string(), true)].into_iter().collect(),
            image_url: None,
        }
    }

    fn embedding(first: f32) -> Embedding {
        let mut values = vec![0.0f32; EMBEDDING_DIM];
        values[0] = first;
        Embedding::new(values)
    }

    fn scored(car: Car, score: f64) -> ScoredCar {
        ScoredCar { car, score }
    }

    #[test]
    fn test_client_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let mut new = new_client("Anna", Gender::Female, 28);
        new.has_credit = CreditHistory::Yes;
        new.marital_status = "Married".to_string();
        let created = store.create_client(&new).unwrap();

        let fetched = store.get_client(created.id).unwrap();
        assert_eq!(fetched.first_name, "Anna");
        assert_eq!(fetched.gender, Gender::Female);
        assert_eq!(fetched.has_credit, CreditHistory::Yes);
        assert_eq!(fetched.full_name(), "Anna Test");
        assert_eq!(fetched.profile().marital_status, "Married");

        assert_eq!(store.list_clients().unwrap().len(), 1);
    }

    #[test]
    fn test_get_missing_client() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.get_client(42),
            Err(StoreError::ClientNotFound(42))
        ));
    }

    #[test]
    fn test_update_client() {
        let store = Store::open_in_memory().unwrap();
        let created = store
            .create_client(&new_client("Bek", Gender::Male, 30))
            .unwrap();

        let mut updated = new_client("Bek", Gender::Male, 31);
        updated.job_title = "Sales Manager".to_string();
        let client = store.update_client(created.id, &updated).unwrap();
        assert_eq!(client.age, 31);
        assert_eq!(client.job_title, "Sales Manager");
        assert!(client.updated_at >= client.created_at);
    }

    #[test]
    fn test_remove_client_cascades() {
        let store = Store::open_in_memory().unwrap();
        let client = store
            .create_client(&new_client("Nilu", Gender::Female, 24))
            .unwrap();
        store
            .append_embedding(client.id, &embedding(0.5), None)
            .unwrap();

        assert!(store.remove_client(client.id).unwrap());
        assert!(!store.remove_client(client.id).unwrap());
        assert_eq!(store.gallery_size().unwrap(), 0);
    }

    #[test]
    fn test_gallery_snapshot_order_and_content() {
        let store = Store::open_in_memory().unwrap();
        let a = store
            .create_client(&new_client("A", Gender::Male, 30))
            .unwrap();
        let b = store
            .create_client(&new_client("B", Gender::Female, 25))
            .unwrap();

        // Insert out of client order; snapshot must come back sorted.
        store.append_embedding(b.id, &embedding(0.2), None).unwrap();
        store
            .append_embedding(a.id, &embedding(0.1), Some("faces/a.jpg"))
            .unwrap();
        store.append_embedding(a.id, &embedding(0.3), None).unwrap();

        let gallery = store.gallery_snapshot().unwrap();
        let ids: Vec<i64> = gallery.iter().map(|e| e.client_id).collect();
        assert_eq!(ids, vec![a.id, a.id, b.id]);
        assert_eq!(gallery[0].embedding.values[0], 0.1);
        assert_eq!(gallery[0].embedding.values.len(), EMBEDDING_DIM);
    }

    #[test]
    fn test_append_embedding_checks_dimension_and_owner() {
        let store = Store::open_in_memory().unwrap();
        let client = store
            .create_client(&new_client("A", Gender::Male, 30))
            .unwrap();

        let short = Embedding::new(vec![0.0; 4]);
        assert!(matches!(
            store.append_embedding(client.id, &short, None),
            Err(StoreError::BadEmbedding {
                expected: EMBEDDING_DIM,
                actual: 4
            })
        ));

        assert!(matches!(
            store.append_embedding(999, &embedding(0.1), None),
            Err(StoreError::ClientNotFound(999))
        ));
    }

    #[test]
    fn test_car_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let car = store.add_car(&new_car("Onix", 18_000.0)).unwrap();
        assert!(car.has_feature("comfort"));
        assert!(!car.has_feature("luxury"));

        let catalog = store.catalog_snapshot().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].id, car.id);

        assert!(store.remove_car(car.id).unwrap());
        assert_eq!(store.car_count().unwrap(), 0);
    }

    #[test]
    fn test_visit_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        let client = store
            .create_client(&new_client("A", Gender::Male, 30))
            .unwrap();
        let car = store.add_car(&new_car("Tracker", 25_000.0)).unwrap();

        let visit_id = store
            .record_visit(client.id, "Auto detected by face recognition", &[scored(car, 75.0)])
            .unwrap();

        let open = store.open_visits().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, visit_id);
        let recs = open[0].recommendations.as_ref().unwrap();
        assert_eq!(recs[0].name, "Testa Tracker");
        assert_eq!(recs[0].interest_score, 75.0);

        store.record_exit(&visit_id).unwrap();
        assert!(store.open_visits().unwrap().is_empty());

        assert!(matches!(
            store.record_exit("no-such-visit"),
            Err(StoreError::VisitNotFound(_))
        ));
    }

    #[test]
    fn test_analytics_counts() {
        let store = Store::open_in_memory().unwrap();
        let young = store
            .create_client(&new_client("Y", Gender::Female, 22))
            .unwrap();
        let older = store
            .create_client(&new_client("O", Gender::Male, 48))
            .unwrap();
        let car = store.add_car(&new_car("Malibu", 32_000.0)).unwrap();

        store
            .record_visit(young.id, "walk-in", &[scored(car.clone(), 80.0)])
            .unwrap();
        store
            .record_visit(young.id, "walk-in", &[scored(car.clone(), 80.0)])
            .unwrap();
        store.record_visit(older.id, "walk-in", &[]).unwrap();

        assert_eq!(store.visit_count(30).unwrap(), 3);

        let by_gender = store.visits_by_gender(30).unwrap();
        let female = by_gender.iter().find(|g| g.gender == Gender::Female).unwrap();
        let male = by_gender.iter().find(|g| g.gender == Gender::Male).unwrap();
        assert_eq!(female.count, 2);
        assert_eq!(male.count, 1);

        let by_age = store.visits_by_age(30).unwrap();
        let bucket = |label: &str| {
            by_age
                .iter()
                .find(|b| b.age_range == label)
                .map(|b| b.count)
                .unwrap()
        };
        assert_eq!(bucket("19-25"), 2);
        assert_eq!(bucket("46-55"), 1);
        assert_eq!(bucket("0-18"), 0);

        let top = store.most_recommended_cars(30, 5).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].car_id, car.id);
        assert_eq!(top[0].count, 2);
    }
}
