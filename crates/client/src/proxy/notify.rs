//! Push notification display and click handling.

use schemars::JsonSchema;
use serde::Serialize;

use swcache_core::location;

use super::OfflineProxy;

const EXPLORE_ACTION: &str = "explore";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch when the push arrived.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// A notification ready to be shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// What the host does after a notification is clicked. The notification is
/// closed in every case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickOutcome {
    OpenWindow { url: String },
    Dismiss,
}

impl OfflineProxy {
    /// Build the notification for a push event.
    pub fn build_notification(&self, payload: Option<&str>) -> Notification {
        let template = &self.config.notification;
        let body = payload.map(str::to_string).unwrap_or_else(|| template.default_body.clone());
        tracing::info!(has_payload = payload.is_some(), "push received");

        Notification {
            title: template.title.clone(),
            body,
            icon: template.icon.clone(),
            badge: template.badge.clone(),
            vibrate: template.vibrate.clone(),
            data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: 1 },
            actions: template
                .actions
                .iter()
                .map(|a| NotificationAction { action: a.action.clone(), title: a.title.clone(), icon: a.icon.clone() })
                .collect(),
        }
    }

    /// Handle a notification click.
    pub fn click_outcome(&self, action: Option<&str>) -> ClickOutcome {
        tracing::info!(action = action.unwrap_or_default(), "notification clicked");
        if action != Some(EXPLORE_ACTION) {
            return ClickOutcome::Dismiss;
        }

        let target = &self.config.notification.explore_url;
        match location::resolve(target, Some(&self.config.origin)) {
            Ok(url) => ClickOutcome::OpenWindow { url: url.to_string() },
            Err(e) => {
                tracing::warn!(url = %target, error = %e, "cannot resolve explore url");
                ClickOutcome::Dismiss
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::testing::{ORIGIN, proxy};

    #[tokio::test]
    async fn test_push_uses_payload_text() {
        let (proxy, _, _) = proxy().await;
        let notification = proxy.build_notification(Some("Vessel arrived at Tanjung Priok"));

        assert_eq!(notification.title, "Dharma Putra Maritime");
        assert_eq!(notification.body, "Vessel arrived at Tanjung Priok");
        assert_eq!(notification.vibrate, vec![100, 50, 100]);
        assert_eq!(notification.data.primary_key, 1);
        assert!(notification.data.date_of_arrival > 0);
        let actions: Vec<&str> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["explore", "close"]);
    }

    #[tokio::test]
    async fn test_push_without_payload_uses_default_body() {
        let (proxy, _, _) = proxy().await;
        let notification = proxy.build_notification(None);
        assert_eq!(notification.body, "New notification from Dharma Putra Maritime");
    }

    #[tokio::test]
    async fn test_explore_opens_origin() {
        let (proxy, _, _) = proxy().await;
        assert_eq!(proxy.click_outcome(Some("explore")), ClickOutcome::OpenWindow { url: format!("{ORIGIN}/") });
    }

    #[tokio::test]
    async fn test_other_actions_dismiss() {
        let (proxy, _, _) = proxy().await;
        assert_eq!(proxy.click_outcome(Some("close")), ClickOutcome::Dismiss);
        assert_eq!(proxy.click_outcome(None), ClickOutcome::Dismiss);
    }
}
