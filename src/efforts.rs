//! Effort counting, titles and heart-rate annotations.
//!
//! All functions here are pure: a route's stored prior count is read, never
//! written back. Persisting a new count belongs to whoever owns the catalog.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Activity, MatchConfig, Route};

/// Marker for a prior effort count embedded in a route description.
static PREVIOUS_EFFORTS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"Previous Efforts: ([0-9]+)").ok());

/// New name and description for an identified activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityAnnotation {
    pub name: String,
    /// Heart-rate summary; omitted entirely when the activity has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Prior completions stored on the route.
///
/// Uses the numeric field when present, otherwise the first number after
/// "Previous Efforts: " in the description, otherwise 0.
pub fn prior_efforts(route: &Route) -> u64 {
    if let Some(previous) = route.previous_efforts {
        return previous;
    }

    route
        .description
        .as_deref()
        .and_then(parse_previous_efforts)
        .unwrap_or(0)
}

fn parse_previous_efforts(text: &str) -> Option<u64> {
    let pattern = PREVIOUS_EFFORTS.as_ref()?;
    pattern.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Route's prior count plus the activity's own already-known effort count.
pub fn effort_count(route: &Route, activity: Option<&Activity>) -> u64 {
    prior_efforts(route).saturating_add(activity.map_or(0, Activity::effort_count))
}

/// Activity title: `"<route name> #<effort count>"`.
///
/// # Example
/// ```
/// use route_efforts::{title, Activity, Route};
///
/// let route = Route::new("Route", "??").with_previous_efforts(10);
/// let activity = Activity::new(1).with_effort_count(2);
/// assert_eq!(title(&route, &activity), "Route #12");
/// ```
pub fn title(route: &Route, activity: &Activity) -> String {
    format_title(route, effort_count(route, Some(activity)))
}

fn format_title(route: &Route, count: u64) -> String {
    format!("{} #{}", route.name, count)
}

/// Heart-rate description, `None` when there is no usable average.
///
/// Averages at or below `maf_threshold` are tagged "MAF". The threshold is
/// compared against the raw average, the displayed value is floored.
pub fn heart_rate_annotation(average_heartrate: Option<f64>, maf_threshold: f64) -> Option<String> {
    let bpm = average_heartrate.filter(|hr| hr.is_finite() && *hr > 0.0)?;
    let floored = bpm.floor() as u32;

    if bpm <= maf_threshold {
        Some(format!("MAF ❤️ {} bpm", floored))
    } else {
        Some(format!("❤️ {} bpm", floored))
    }
}

/// Title and heart-rate description for an activity on `route`.
pub fn annotate(route: &Route, activity: &Activity, config: &MatchConfig) -> ActivityAnnotation {
    ActivityAnnotation {
        name: title(route, activity),
        description: heart_rate_annotation(activity.average_heartrate, config.maf_threshold),
    }
}

/// Per-run effort counter for batch reprocessing.
///
/// Activities are replayed oldest first; each one on a route takes the next
/// number after the route's stored prior count. The tally is owned by the
/// caller and lives for one run only.
#[derive(Debug, Clone, Default)]
pub struct EffortTally {
    counts: HashMap<String, u64>,
}

impl EffortTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more effort on `route` and return its effort number.
    pub fn record(&mut self, route: &Route) -> u64 {
        let count = self.counts.entry(route.name.clone()).or_insert(0);
        *count += 1;
        prior_efforts(route).saturating_add(*count)
    }

    /// Efforts recorded on the named route during this run.
    pub fn count(&self, route_name: &str) -> u64 {
        self.counts.get(route_name).copied().unwrap_or(0)
    }

    /// Record an effort and build the annotation for it.
    pub fn annotate_next(
        &mut self,
        route: &Route,
        activity: &Activity,
        config: &MatchConfig,
    ) -> ActivityAnnotation {
        let count = self.record(route);
        ActivityAnnotation {
            name: format_title(route, count),
            description: heart_rate_annotation(activity.average_heartrate, config.maf_threshold),
        }
    }
}
