//! Chat webhook notifier (Discord-compatible `{"content": ...}` payload).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{Notifier, PhaseNotification};
use crate::error::NotifyError;

pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_phase_change(
        &self,
        notification: &PhaseNotification,
    ) -> Result<(), NotifyError> {
        if self.webhook_url.is_empty() {
            return Err(NotifyError::NotConfigured("webhook URL is empty".into()));
        }

        let body = json!({
            "content": format!("**{}**\n{}", notification.title, notification.body),
        });
        let resp = self.client.post(&self.webhook_url).json(&body).send().await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(NotifyError::Http {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::{CycleDurations, Phase};

    #[tokio::test]
    async fn empty_url_is_not_configured() {
        let notifier = WebhookNotifier::new("");
        let n = PhaseNotification::for_transition(
            Phase::ShortBreak,
            Phase::Focus,
            1,
            &CycleDurations::default(),
        );
        let err = notifier.notify_phase_change(&n).await.unwrap_err();
        assert!(matches!(err, NotifyError::NotConfigured(_)));
    }
}
