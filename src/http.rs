//! HTTP client for the Strava API.
//!
//! This module provides the network collaborators for annotation:
//! - OAuth access token refresh (once per client)
//! - Activity fetch, listing and update
//! - Saved-route listing, mapped into catalog [`Route`]s
//! - Automatic retry with exponential backoff on 429

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client, Method, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::annotate::{ActivitySource, ActivityUpdater, RouteSource};
use crate::{Activity, ActivityAnnotation, ActivityMap, Result, Route, RouteEffortsError, StravaConfig};

const API_BASE_URL: &str = "https://www.strava.com/api/v3";
const TOKEN_URL: &str = "https://www.strava.com/oauth/token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const ROUTES_PER_PAGE: u32 = 200;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Saved route as returned by the routes endpoint
#[derive(Debug, Deserialize)]
struct StravaRoute {
    name: String,
    description: Option<String>,
    map: Option<ActivityMap>,
}

impl From<StravaRoute> for Route {
    fn from(route: StravaRoute) -> Self {
        let encoded_polyline = route.map.and_then(|map| {
            map.polyline
                .filter(|p| !p.is_empty())
                .or(map.summary_polyline.filter(|p| !p.is_empty()))
        });

        Route {
            name: route.name,
            encoded_polyline,
            previous_efforts: None,
            description: route.description,
        }
    }
}

/// Body of an activity update
#[derive(Debug, Serialize)]
struct ActivityUpdate<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> From<&'a ActivityAnnotation> for ActivityUpdate<'a> {
    fn from(annotation: &'a ActivityAnnotation) -> Self {
        Self {
            name: &annotation.name,
            description: annotation.description.as_deref(),
        }
    }
}

fn http_error(message: String, status_code: Option<u16>) -> RouteEffortsError {
    RouteEffortsError::Http {
        message,
        status_code,
    }
}

/// Exponential backoff after consecutive 429s: 2s, 4s, 8s, 16s.
fn backoff_for(retry: u32) -> Duration {
    Duration::from_millis(1000 * (1 << retry.min(4)))
}

/// Authenticated Strava API client
pub struct StravaClient {
    client: Client,
    access_token: String,
}

impl StravaClient {
    /// Refresh the access token and create a client using it.
    pub async fn connect(config: &StravaConfig) -> Result<Self> {
        let client = build_client()?;
        let access_token = refresh_access_token(&client, config).await?;
        Ok(Self {
            client,
            access_token,
        })
    }

    /// Create a client from an already valid access token.
    pub fn with_access_token(access_token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            access_token: access_token.into(),
        })
    }

    pub async fn get_activity(&self, id: u64) -> Result<Activity> {
        self.request::<Activity, ()>(Method::GET, &format!("activities/{}", id), &[], None)
            .await
    }

    /// Most recent activities, newest first.
    pub async fn list_activities(&self, per_page: u32) -> Result<Vec<Activity>> {
        self.request::<Vec<Activity>, ()>(
            Method::GET,
            "athlete/activities",
            &[("per_page", per_page.to_string())],
            None,
        )
        .await
    }

    /// The athlete's saved routes, in the order the API returns them.
    pub async fn list_routes(&self) -> Result<Vec<Route>> {
        let routes = self
            .request::<Vec<StravaRoute>, ()>(
                Method::GET,
                "athlete/routes",
                &[("per_page", ROUTES_PER_PAGE.to_string())],
                None,
            )
            .await?;

        debug!("[StravaClient] Fetched {} saved routes", routes.len());
        Ok(routes.into_iter().map(Route::from).collect())
    }

    pub async fn update_activity(&self, id: u64, annotation: &ActivityAnnotation) -> Result<()> {
        let body = ActivityUpdate::from(annotation);
        self.request::<IgnoredAny, _>(
            Method::PUT,
            &format!("activities/{}", id),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = format!("{}/{}", API_BASE_URL, endpoint.trim_start_matches('/'));
        let mut retries = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.access_token)
                .query(query);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|e| {
                http_error(format!("{} {} failed: {}", method, endpoint, e), None)
            })?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RETRIES {
                    return Err(http_error(
                        "Max retries exceeded (429)".to_string(),
                        Some(status.as_u16()),
                    ));
                }

                let backoff = backoff_for(retries);
                warn!(
                    "[StravaClient] 429 for {} {}, retry {} after {:?}",
                    method, endpoint, retries, backoff
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(http_error(
                    format!("{} {}: {}", method, endpoint, text),
                    Some(status.as_u16()),
                ));
            }

            return response.json::<T>().await.map_err(|e| {
                http_error(format!("failed to parse {} response: {}", endpoint, e), None)
            });
        }
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| http_error(format!("failed to create HTTP client: {}", e), None))
}

async fn refresh_access_token(client: &Client, config: &StravaConfig) -> Result<String> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("grant_type", "refresh_token"),
        ("refresh_token", config.refresh_token.as_str()),
    ];

    let response = client
        .post(TOKEN_URL)
        .form(&params)
        .send()
        .await
        .map_err(|e| http_error(format!("token refresh failed: {}", e), None))?;

    let status = response.status();
    if !status.is_success() {
        return Err(http_error(
            "token refresh rejected".to_string(),
            Some(status.as_u16()),
        ));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| http_error(format!("failed to parse token response: {}", e), None))?;

    info!("[StravaClient] Access token refreshed");
    Ok(token.access_token)
}

impl ActivitySource for StravaClient {
    async fn get_activity(&self, id: u64) -> Result<Activity> {
        StravaClient::get_activity(self, id).await
    }

    async fn list_activities(&self, per_page: u32) -> Result<Vec<Activity>> {
        StravaClient::list_activities(self, per_page).await
    }
}

impl RouteSource for StravaClient {
    async fn routes(&self) -> Result<Vec<Route>> {
        self.list_routes().await
    }
}

impl ActivityUpdater for StravaClient {
    async fn update_activity(&self, id: u64, annotation: &ActivityAnnotation) -> Result<()> {
        StravaClient::update_activity(self, id, annotation).await
    }
}
