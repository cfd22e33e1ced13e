//! reception-store — SQLite-backed persistence for the reception daemon.
//!
//! Owns the client records, the append-only face gallery, the car catalog
//! and the visit log. The algorithmic core never touches this crate; the
//! daemon materializes immutable snapshots here and hands them to the core.

mod seed;
mod store;

pub use seed::seed_catalog;
pub use store::{
    AgeBucket, Client, GenderCount, NewCar, NewClient, RecommendedCount, Store, StoreError, Visit,
    VisitSummary,
};
