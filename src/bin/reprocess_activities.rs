//! Re-title the athlete's recent activities against the route catalog.
//!
//! Reads Strava credentials from the environment. When `ROUTE_CATALOG_PATH`
//! is set the catalog is loaded from that JSON file, otherwise the athlete's
//! saved routes are used.

use std::process::ExitCode;

use log::{error, info};
use route_efforts::{
    reprocess_activities, MatchConfig, ReprocessSummary, Result, RouteCatalog, StaticRoutes,
    StravaClient, StravaConfig,
};

const RECENT_ACTIVITIES: u32 = 100;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("[Reprocess] Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(summary) => {
            info!(
                "[Reprocess] Done: {} annotated, {} unmatched, {} skipped",
                summary.annotated, summary.unmatched, summary.skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("[Reprocess] {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ReprocessSummary> {
    let config = StravaConfig::from_env()?;
    let client = StravaClient::connect(&config).await?;
    let match_config = MatchConfig::default();

    match &config.catalog_path {
        Some(path) => {
            let routes = StaticRoutes(RouteCatalog::from_json_file(path)?);
            reprocess_activities(&client, &routes, &client, RECENT_ACTIVITIES, &match_config).await
        }
        None => {
            reprocess_activities(&client, &client, &client, RECENT_ACTIVITIES, &match_config).await
        }
    }
}
