//! Shared type definitions for the Quake hazard pipeline.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. Every downstream crate consumes and produces the types
//! defined here.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe index wrappers for sources, events, sites, models
//! - [`geo`] -- Geodesy on a spherical Earth (haversine, bearings, offsets)
//! - [`logic_tree`] -- Sparse per-source branch mapping ([`LogicTree`])
//! - [`event`] -- Rupture events and the immutable event catalog
//! - [`site`] -- Sites and their physical attributes
//! - [`tensor`] -- The named-axis five-dimensional motion tensor
//! - [`activity`] -- Per-event annual occurrence rates ([`EventActivity`])
//! - [`results`] -- Hazard, motion, and loss result arrays
//! - [`weights`] -- Logic-tree weight validation and normalisation
//!
//! # Axis convention
//!
//! Ground-motion samples are always shaped
//! `[spawn, branch, site, event, period]`. [`MotionTensor`] enforces the
//! convention by construction; [`EventActivity`] shares the `spawn`,
//! `branch`, and `event` axes with it.

pub mod activity;
pub mod event;
pub mod geo;
pub mod ids;
pub mod logic_tree;
pub mod results;
pub mod site;
pub mod tensor;
pub mod weights;

// Re-export all public types at crate root for convenience.
pub use activity::{ActivityError, EventActivity};
pub use event::{Event, EventCatalog, RuptureGeometry, Trace};
pub use geo::GeoPoint;
pub use ids::{EventId, ModelId, SiteId, SourceId};
pub use logic_tree::{Branch, BranchSet, LogicTree};
pub use results::{HazardResult, LossResult, MotionRecord};
pub use site::{Site, StructureInventory};
pub use tensor::{MotionShape, MotionTensor, ShapeError};
pub use weights::{WeightError, normalize_weights};
