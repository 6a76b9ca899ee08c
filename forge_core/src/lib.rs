#![forbid(unsafe_code)]

//! Core domain model and business logic for the Forge training engine.
//!
//! This crate provides:
//! - Domain types (workout logs, fatigue, volume landmarks, plans)
//! - Exercise catalog
//! - Fatigue, load, volume, periodization and deload components
//! - Repository ports with in-memory and file-backed stores
//! - Configuration, logging and CSV export

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod memory;
pub mod workout_log;
pub mod state;
pub mod context;
pub mod fatigue;
pub mod muscle_fatigue;
pub mod load;
pub mod volume;
pub mod planner;
pub mod deload;
pub mod export;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, ExerciseCatalog};
pub use config::Config;
pub use store::Store;
pub use memory::MemoryStore;
pub use state::FileStore;
pub use context::TrainingLoadContext;
pub use deload::DeloadSchedule;
pub use planner::{ActivePlan, PlanBundle, PlanOptions, PlanRequest};
pub use engine::{LoggedWorkout, PlanStatus, TrainingEngine};
