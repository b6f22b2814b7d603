//! Activity payload schema.
//!
//! Only the fields the annotator reads are declared; anything else the
//! activity source sends is ignored. `id` is the only required field.

use serde::{Deserialize, Serialize};

use crate::{Result, RouteEffortsError};

/// One GPS-tracked exercise session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    pub name: Option<String>,
    /// ISO 8601 local start time, used to order batch reprocessing
    pub start_date_local: Option<String>,
    pub map: Option<ActivityMap>,
    pub average_heartrate: Option<f64>,
    /// Upstream count of earlier efforts on the same route
    pub similar_activities: Option<SimilarActivities>,
}

/// Encoded track polylines of an activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMap {
    /// Full-resolution track
    pub polyline: Option<String>,
    /// Lower-resolution summary track
    pub summary_polyline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarActivities {
    #[serde(default)]
    pub effort_count: u64,
}

impl Activity {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Parse an activity payload, rejecting it if required fields are missing.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RouteEffortsError::InvalidPayload {
            message: format!("activity: {}", e),
        })
    }

    pub fn with_polyline(mut self, encoded: impl Into<String>) -> Self {
        self.map.get_or_insert_with(ActivityMap::default).polyline = Some(encoded.into());
        self
    }

    pub fn with_summary_polyline(mut self, encoded: impl Into<String>) -> Self {
        self.map
            .get_or_insert_with(ActivityMap::default)
            .summary_polyline = Some(encoded.into());
        self
    }

    pub fn with_average_heartrate(mut self, bpm: f64) -> Self {
        self.average_heartrate = Some(bpm);
        self
    }

    pub fn with_effort_count(mut self, effort_count: u64) -> Self {
        self.similar_activities = Some(SimilarActivities { effort_count });
        self
    }

    pub fn with_start_date_local(mut self, start: impl Into<String>) -> Self {
        self.start_date_local = Some(start.into());
        self
    }

    /// The encoded track to match: full resolution preferred over the summary.
    ///
    /// Empty strings count as absent.
    pub fn track_polyline(&self) -> Option<&str> {
        let map = self.map.as_ref()?;
        map.polyline
            .as_deref()
            .filter(|p| !p.is_empty())
            .or_else(|| map.summary_polyline.as_deref().filter(|p| !p.is_empty()))
    }

    /// Already-known effort count on the same route (0 when unknown).
    pub fn effort_count(&self) -> u64 {
        self.similar_activities
            .as_ref()
            .map_or(0, |s| s.effort_count)
    }
}
