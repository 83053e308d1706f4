//! Event webhooks.
//!
//! A room created with an events webhook gets a delivery task that POSTs
//! every decided round to the caller's endpoint as JSON. Deliveries for
//! one room are sent one after another, in round order. A failed delivery
//! is logged and skipped; the match never waits on the endpoint.

use std::time::Duration;

use jokenpo_protocol::WebhookConfig;
use jokenpo_room::{Event, Subscription};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde::Serialize;

use crate::provision::ProvisionError;

/// Per-request timeout for webhook deliveries.
pub(crate) const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// A webhook target whose URL and headers have been checked.
#[derive(Debug, Clone)]
pub(crate) struct Webhook {
    url: Url,
    headers: HeaderMap,
}

impl Webhook {
    /// Validates `config` so that bad targets are refused at room creation
    /// instead of failing on every delivery.
    pub(crate) fn parse(config: &WebhookConfig) -> Result<Self, ProvisionError> {
        let url = Url::parse(&config.url)
            .map_err(|e| ProvisionError::InvalidWebhook(format!("url {:?}: {e}", config.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProvisionError::InvalidWebhook(format!(
                "url scheme {} is not http or https",
                url.scheme()
            )));
        }

        let mut headers = HeaderMap::with_capacity(config.headers.len());
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProvisionError::InvalidWebhook(format!("header {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ProvisionError::InvalidWebhook(format!("header {name:?}: {e}")))?;
            headers.insert(header_name, header_value);
        }

        Ok(Self { url, headers })
    }
}

/// Body of one delivery.
#[derive(Debug, Serialize)]
struct Delivery<'a> {
    external_id: Option<&'a str>,
    event: &'a Event,
}

/// Builds the HTTP client shared by every delivery task.
pub(crate) fn client() -> Client {
    Client::builder()
        .timeout(DELIVERY_TIMEOUT)
        .user_agent(concat!("jokenpo/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Forwards the events of `events` to `webhook` until the match finishes
/// or the room is gone.
pub(crate) async fn deliver_events(
    client: Client,
    webhook: Webhook,
    external_id: Option<String>,
    mut events: Subscription,
) {
    while let Some(event) = events.recv().await {
        let delivery = Delivery {
            external_id: external_id.as_deref(),
            event: &event,
        };
        let result = client
            .post(webhook.url.clone())
            .headers(webhook.headers.clone())
            .json(&delivery)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match result {
            Ok(response) => tracing::debug!(
                room_id = %event.room_id,
                round = event.current_round,
                status = %response.status(),
                "webhook delivered"
            ),
            Err(e) => tracing::warn!(
                room_id = %event.room_id,
                round = event.current_round,
                error = %e,
                "webhook delivery failed"
            ),
        }

        if event.state.is_finished() {
            break;
        }
    }
}
