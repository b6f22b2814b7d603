//! Webhook event schema and subscription verification.
//!
//! Push notifications are validated here before anything else looks at them:
//! recognised fields are typed, unknown fields are ignored and missing
//! required fields reject the payload.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Result, RouteEffortsError};

const SUBSCRIBE_MODE: &str = "subscribe";

/// What happened to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectType {
    Create,
    Update,
    Delete,
}

/// Kind of object the event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Activity,
    Athlete,
}

/// A push notification about an activity or athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub aspect_type: AspectType,
    /// Unix timestamp (seconds since epoch)
    pub event_time: i64,
    pub object_id: u64,
    pub object_type: ObjectType,
    pub owner_id: u64,
    pub subscription_id: u64,
    pub updates: EventUpdates,
}

/// Changed fields of an update event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventUpdates {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub private: Option<bool>,
}

/// Accept `true`/`false` both as booleans and as strings.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Bool(value)) => Ok(Some(value)),
        Some(Flag::Text(text)) => match text.as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!(
                "expected \"true\" or \"false\", got {:?}",
                other
            ))),
        },
    }
}

impl WebhookEvent {
    /// Parse and validate an event body.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| RouteEffortsError::InvalidPayload {
            message: format!("webhook event: {}", e),
        })
    }

    /// Only newly created activities are annotated.
    pub fn is_activity_create(&self) -> bool {
        self.aspect_type == AspectType::Create && self.object_type == ObjectType::Activity
    }
}

/// Subscription validation request (`hub.*` query parameters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    #[serde(rename = "hub.mode")]
    pub mode: String,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: String,
    #[serde(rename = "hub.challenge")]
    pub challenge: String,
}

impl SubscriptionRequest {
    /// Build a request from query parameters, `None` if any `hub.*` field is missing.
    pub fn from_params<'a, I>(params: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut mode = None;
        let mut verify_token = None;
        let mut challenge = None;

        for (key, value) in params {
            match key {
                "hub.mode" => mode = Some(value.to_string()),
                "hub.verify_token" => verify_token = Some(value.to_string()),
                "hub.challenge" => challenge = Some(value.to_string()),
                _ => {}
            }
        }

        Some(Self {
            mode: mode?,
            verify_token: verify_token?,
            challenge: challenge?,
        })
    }
}

/// Echo of the challenge, serialized as `{"hub.challenge": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionChallenge {
    #[serde(rename = "hub.challenge")]
    pub challenge: String,
}

/// Answer a subscription request, or `None` if it must be refused.
pub fn verify_subscription(
    request: &SubscriptionRequest,
    verify_token: &str,
) -> Option<SubscriptionChallenge> {
    if request.mode != SUBSCRIBE_MODE || request.verify_token != verify_token {
        log::warn!("[Webhook] Rejected subscription request");
        return None;
    }

    Some(SubscriptionChallenge {
        challenge: request.challenge.clone(),
    })
}
