//! Seismic sources, recurrence laws, and event catalog generation.
//!
//! This crate turns source definitions into the immutable event catalog and
//! the matching [`EventActivity`] array that every later stage reads.
//!
//! # Modules
//!
//! - [`activity`] -- Per-event annual rates shaped by recurrence bins and
//!   logic-tree branch weights.
//! - [`error`] -- Error types for source operations.
//! - [`generator`] -- [`EventGenerator`]: scenario and synthetic catalogs.
//! - [`polygon`] -- Zone polygons with containment tests.
//! - [`recurrence`] -- Truncated Gutenberg-Richter magnitude-frequency law.
//! - [`scaling`] -- Empirical rupture dimensions from magnitude.
//! - [`source`] -- Source definitions and the memoised event assignment.
//!
//! [`EventActivity`]: quake_types::EventActivity
//! [`EventGenerator`]: generator::EventGenerator

pub mod activity;
pub mod error;
pub mod generator;
pub mod polygon;
pub mod recurrence;
pub mod scaling;
pub mod source;

// Re-export primary types at crate root.
pub use activity::{DEFAULT_MAGNITUDE_BINS, build_event_activity};
pub use error::SourceError;
pub use generator::{EventGenerator, GenerationMode, MagnitudeSampling};
pub use polygon::Polygon;
pub use recurrence::{GutenbergRichter, RecurrenceSet};
pub use scaling::ScalingConfig;
pub use source::{BranchDefinition, ScenarioRupture, Source, SourceDefinition, SourceKind};
