use std::sync::Arc;

use chrono::Utc;
use mockall::automock;
use serde::Serialize;
use tracing::{debug, error, info};

pub type DynNotificationSink = Arc<dyn NotificationSink + Send + Sync>;

/// receives "now serving" status lines, nothing waits on it
#[automock]
pub trait NotificationSink {
    fn notify(&self, text: &str);
}

pub fn now_serving(description: &str) -> String {
    format!("Now serving: {}", description)
}

/// default sink, the status just goes to the log
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, text: &str) {
        info!(target: "notification", "{}", now_serving(text));
    }
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    status: String,
    timestamp: String,
}

/// posts every status to a webhook, failures only make it to the log
pub struct WebhookNotificationSink {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotificationSink {
    pub fn new(http: reqwest::Client, url: String) -> Self {
        Self { http, url }
    }
}

impl NotificationSink for WebhookNotificationSink {
    fn notify(&self, text: &str) {
        let payload = StatusPayload {
            status: now_serving(text),
            timestamp: Utc::now().to_rfc3339(),
        };
        let http = self.http.clone();
        let url = self.url.clone();

        // needs a runtime, which every caller of this has
        tokio::spawn(async move {
            match http.post(&url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("notification delivered to {}", url);
                }
                Ok(response) => error!("notification webhook answered {}", response.status()),
                Err(e) => error!("failed to deliver notification: {}", e),
            }
        });
    }
}

/// hands every status to each inner sink
pub struct FanoutNotificationSink {
    sinks: Vec<DynNotificationSink>,
}

impl FanoutNotificationSink {
    pub fn new(sinks: Vec<DynNotificationSink>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanoutNotificationSink {
    fn notify(&self, text: &str) {
        for sink in &self.sinks {
            sink.notify(text);
        }
    }
}
