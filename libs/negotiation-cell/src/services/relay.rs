// libs/negotiation-cell/src/services/relay.rs
use reqwest::Client;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::NotificationIntent;

/// Best-effort delivery of notification intents to the push gateway.
///
/// Delivery happens after the transition is committed and never feeds back
/// into it: a gateway outage is logged and swallowed, the appointment state
/// stands either way.
pub struct NotificationRelayService {
    client: Client,
    gateway_url: String,
}

impl NotificationRelayService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            gateway_url: config.push_gateway_url.clone(),
        }
    }

    pub async fn deliver_all(&self, intents: Vec<NotificationIntent>) {
        if self.gateway_url.is_empty() {
            debug!(
                "Push gateway not configured, dropping {} notification intent(s)",
                intents.len()
            );
            return;
        }

        for intent in intents {
            self.deliver(&intent).await;
        }
    }

    async fn deliver(&self, intent: &NotificationIntent) {
        let result = self
            .client
            .post(&self.gateway_url)
            .json(intent)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(
                    "Delivered {} for appointment {} to {} {}",
                    intent.event, intent.appointment_id, intent.recipient_role, intent.recipient_id
                );
            }
            Ok(response) => {
                warn!(
                    "Push gateway returned {} for {} on appointment {}",
                    response.status(),
                    intent.event,
                    intent.appointment_id
                );
            }
            Err(e) => {
                warn!(
                    "Failed to deliver {} for appointment {}: {}",
                    intent.event, intent.appointment_id, e
                );
            }
        }
    }
}
