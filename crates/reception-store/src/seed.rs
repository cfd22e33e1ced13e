//! Catalog seeding.
//!
//! The sample showroom stock is embedded at compile time from
//! `contrib/seed/catalog.toml` and inserted once, when the cars table is
//! empty.

use crate::store::{NewCar, Store, StoreError};
use serde::Deserialize;

const CATALOG_TOML: &str = include_str!("../../../contrib/seed/catalog.toml");

#[derive(Debug, Deserialize)]
struct SeedFile {
    car: Vec<NewCar>,
}

/// Insert the embedded sample catalog if the cars table is empty.
/// Returns the number of cars inserted (zero when already populated).
pub fn seed_catalog(store: &Store) -> Result<usize, StoreError> {
    if store.car_count()? > 0 {
        return Ok(0);
    }

    let seed: SeedFile = toml::from_str(CATALOG_TOML)?;

    for car in &seed.car {
        store.add_car(car)?;
    }
    tracing::info!(count = seed.car.len(), "catalog seeded with sample stock");
    Ok(seed.car.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_parses() {
        let seed: SeedFile = toml::from_str(CATALOG_TOML).unwrap();
        assert!(!seed.car.is_empty());
        for car in &seed.car {
            assert!(car.price > 0.0, "car {} has no price", car.name);
            assert!(!car.category.is_empty());
        }
    }

    #[test]
    fn test_seed_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let first = seed_catalog(&store).unwrap();
        assert!(first > 0);
        assert_eq!(store.car_count().unwrap(), first as i64);

        let second = seed_catalog(&store).unwrap();
        assert_eq!(second, 0);
        assert_eq!(store.car_count().unwrap(), first as i64);
    }
}
