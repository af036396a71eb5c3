//! Sites at which ground motion is evaluated.
//!
//! Sites are processed independently; nothing in the pipeline couples one
//! site to another.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::ids::SiteId;

/// Opaque structural inventory attached to a site.
///
/// The hazard pipeline never interprets these attributes; they are handed
/// through to the external loss engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureInventory {
    /// Structure classification label understood by the loss engine.
    #[serde(default)]
    pub structure_class: String,
    /// Free-form numeric attributes (replacement value, floor area, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
}

/// A location with physical attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Position in the global site list.
    pub id: SiteId,
    /// Location of the site.
    pub location: GeoPoint,
    /// Site class label used by the amplification model.
    #[serde(default)]
    pub site_class: String,
    /// Time-averaged shear-wave velocity in the top 30 m, m/s.
    #[serde(default)]
    pub vs30: Option<f64>,
    /// Optional structural inventory for loss runs.
    #[serde(default)]
    pub inventory: Option<StructureInventory>,
}

impl Site {
    /// Create a bare site with a location and site class.
    pub fn new(id: SiteId, location: GeoPoint, site_class: &str) -> Self {
        Self {
            id,
            location,
            site_class: site_class.to_owned(),
            vs30: None,
            inventory: None,
        }
    }
}
