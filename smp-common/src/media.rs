//! Media item identity

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One playable resource on the media server
///
/// Immutable once constructed. The item never knows where it sits in a
/// playlist; position is always looked up by `id` or index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaItem {
    id: Uuid,
    locator: String,
}

impl MediaItem {
    /// Create a new item with a fresh identity
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            locator: locator.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Opaque locator handed to the stream transport (e.g. `sim://media/a.flv`)
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Last path segment of the locator without query, for display
    pub fn display_name(&self) -> &str {
        let without_query = self.locator.split('?').next().unwrap_or(&self.locator);
        without_query
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(without_query)
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.locator)
    }
}
