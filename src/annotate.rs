//! Orchestration over the activity, route and update collaborators.
//!
//! The matching core is pure; this module wires it to whatever fetches
//! activities, supplies the route catalog and persists the new title:
//! - [`handle_event`] annotates one newly created activity
//! - [`reprocess_activities`] replays recent activities oldest first,
//!   numbering efforts with an [`EffortTally`]
//!
//! Collaborators are generic parameters, so tests drive the flow with
//! in-memory fakes and production code plugs in the HTTP client.

use log::{info, warn};

use crate::efforts::annotate as annotate_activity;
use crate::{
    identify_route, Activity, ActivityAnnotation, EffortTally, MatchConfig, Result, Route,
    RouteCatalog, WebhookEvent,
};

/// Supplies activities by id and the athlete's recent activities.
#[allow(async_fn_in_trait)]
pub trait ActivitySource {
    async fn get_activity(&self, id: u64) -> Result<Activity>;

    async fn list_activities(&self, per_page: u32) -> Result<Vec<Activity>>;
}

/// Supplies the ordered route catalog for one matching run.
#[allow(async_fn_in_trait)]
pub trait RouteSource {
    async fn routes(&self) -> Result<Vec<Route>>;
}

/// Persists a new name/description against an activity.
#[allow(async_fn_in_trait)]
pub trait ActivityUpdater {
    async fn update_activity(&self, id: u64, annotation: &ActivityAnnotation) -> Result<()>;
}

/// A fixed catalog loaded at configuration time.
#[derive(Debug, Clone, Default)]
pub struct StaticRoutes(pub RouteCatalog);

impl RouteSource for StaticRoutes {
    async fn routes(&self) -> Result<Vec<Route>> {
        Ok(self.0.routes().to_vec())
    }
}

/// Result of handling one webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not an activity creation
    Ignored,
    /// The activity follows no catalog route (or has no track)
    NoRoute,
    /// The activity was renamed
    Annotated(ActivityAnnotation),
}

/// Counts from one reprocessing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReprocessSummary {
    pub processed: usize,
    pub annotated: usize,
    pub unmatched: usize,
    /// Activities whose polyline could not be decoded
    pub skipped: usize,
}

/// Annotate the activity a webhook event refers to.
pub async fn handle_event<S, R, U>(
    event: &WebhookEvent,
    activities: &S,
    routes: &R,
    updater: &U,
    config: &MatchConfig,
) -> Result<EventOutcome>
where
    S: ActivitySource,
    R: RouteSource,
    U: ActivityUpdater,
{
    if !event.is_activity_create() {
        info!(
            "[EventHandler] Ignoring {:?} {:?} event for {}",
            event.aspect_type, event.object_type, event.object_id
        );
        return Ok(EventOutcome::Ignored);
    }

    let activity = activities.get_activity(event.object_id).await?;
    if activity.track_polyline().is_none() {
        info!("[EventHandler] Activity {} has no track", activity.id);
        return Ok(EventOutcome::NoRoute);
    }
    let catalog = routes.routes().await?;

    let Some(route) = identify_route(&activity, &catalog, config)? else {
        info!(
            "[EventHandler] Activity {} matches none of {} routes",
            activity.id,
            catalog.len()
        );
        return Ok(EventOutcome::NoRoute);
    };

    let annotation = annotate_activity(route, &activity, config);
    updater.update_activity(event.object_id, &annotation).await?;

    info!(
        "[EventHandler] Activity {} renamed to '{}'",
        activity.id, annotation.name
    );
    Ok(EventOutcome::Annotated(annotation))
}

/// Re-title recent activities, numbering efforts within this run.
///
/// Activities are processed oldest first. Each matched activity gets the
/// route's stored prior count plus its position among this run's efforts on
/// that route; the upstream effort count is not used here.
pub async fn reprocess_activities<S, R, U>(
    activities: &S,
    routes: &R,
    updater: &U,
    per_page: u32,
    config: &MatchConfig,
) -> Result<ReprocessSummary>
where
    S: ActivitySource,
    R: RouteSource,
    U: ActivityUpdater,
{
    let mut recent = activities.list_activities(per_page).await?;
    recent.sort_by(|a, b| a.start_date_local.cmp(&b.start_date_local));
    let catalog = routes.routes().await?;

    info!(
        "[Reprocess] Matching {} activities against {} routes",
        recent.len(),
        catalog.len()
    );

    #[cfg(feature = "parallel")]
    let matches = crate::identify_routes_parallel(&recent, &catalog, config);
    #[cfg(not(feature = "parallel"))]
    let matches: Vec<_> = recent
        .iter()
        .map(|activity| identify_route(activity, &catalog, config))
        .collect();

    let mut tally = EffortTally::new();
    let mut summary = ReprocessSummary::default();

    for (activity, matched) in recent.iter().zip(matches) {
        summary.processed += 1;

        let route = match matched {
            Ok(Some(route)) => route,
            Ok(None) => {
                summary.unmatched += 1;
                continue;
            }
            Err(e) => {
                warn!("[Reprocess] Skipping activity {}: {}", activity.id, e);
                summary.skipped += 1;
                continue;
            }
        };

        let annotation = tally.annotate_next(route, activity, config);
        updater.update_activity(activity.id, &annotation).await?;
        summary.annotated += 1;
    }

    info!(
        "[Reprocess] Completed: {}/{} annotated, {} unmatched, {} skipped",
        summary.annotated, summary.processed, summary.unmatched, summary.skipped
    );

    Ok(summary)
}
