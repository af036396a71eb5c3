//! Type-safe index wrappers.
//!
//! Every entity in the pipeline is addressed by its position in a dense
//! array (sources in configuration order, events in catalog order, sites in
//! global site order). Wrapping the raw `usize` prevents an event index from
//! being used where a site index is expected.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a dense `usize` index with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            /// Create an identifier from a dense array position.
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Return the dense array position.
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<usize> for $name {
            fn from(index: usize) -> Self {
                Self(index)
            }
        }
    };
}

define_id! {
    /// Identifier for a seismic source (position in the configured source list).
    SourceId
}

define_id! {
    /// Identifier for an event (position in the event catalog).
    EventId
}

define_id! {
    /// Identifier for a site (position in the global, selected site list).
    SiteId
}

define_id! {
    /// Identifier for a ground-motion model (position in the run's model registry).
    ModelId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_their_index() {
        assert_eq!(SiteId::new(7).to_string(), "7");
        assert_eq!(EventId::from(3).index(), 3);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&SourceId::new(4)).ok();
        assert_eq!(json.as_deref(), Some("4"));
    }
}
