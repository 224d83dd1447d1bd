//! Outcome notifications.
//!
//! One structured message per update cycle, delivered fire-and-forget to an
//! optional webhook endpoint. Delivery failures are the caller's to log and
//! swallow; they never change the cycle result.

use anyhow::Context;
use serde::Serialize;
use url::Url;

use crate::revision::CommitMeta;
use crate::updater::Outcome;

/// Color rendered for a successful update (green).
pub const SUCCESS_COLOR: u32 = 3_066_993;
/// Color rendered for a failed update (red).
pub const FAILURE_COLOR: u32 = 15_158_332;

/// One name/value pair attached to a success notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// The webhook payload: one object per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Notification {
    /// Build the notification for an outcome, or `None` when there is
    /// nothing to report (an up-to-date cycle changes no state).
    pub fn for_outcome(
        outcome: &Outcome,
        meta: Option<&CommitMeta>,
        repo_url: Option<&Url>,
    ) -> Option<Self> {
        match outcome {
            Outcome::UpToDate => None,
            Outcome::Updated { old, new } => {
                let mut fields = Vec::new();
                if let Some(meta) = meta {
                    fields.push(Field {
                        name: "Commit Message".to_string(),
                        value: meta.summary.clone(),
                    });
                    fields.push(Field {
                        name: "Author".to_string(),
                        value: meta.author.clone(),
                    });
                }
                let url = repo_url.map(|base| {
                    format!("{}/commit/{}", base.as_str().trim_end_matches('/'), new)
                });
                Some(Self {
                    title: "Stack updated".to_string(),
                    description: format!("Redeployed {} -> {}", old.short(), new.short()),
                    color: SUCCESS_COLOR,
                    fields,
                    url,
                })
            }
            Outcome::Failed { detail, .. } => Some(Self {
                title: "Update failed".to_string(),
                description: detail.clone(),
                color: FAILURE_COLOR,
                fields: Vec::new(),
                url: None,
            }),
        }
    }
}

/// Capability for delivering one notification.
#[allow(async_fn_in_trait)]
pub trait Notify {
    async fn send(&self, note: &Notification) -> anyhow::Result<()>;
}

/// Default notifier when no endpoint is configured.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notify for NoopNotifier {
    async fn send(&self, _note: &Notification) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Notifier selected from configuration: webhook when an endpoint is
/// configured, no-op otherwise. An absent endpoint is not an error.
pub enum Notifier {
    Webhook(WebhookNotifier),
    Noop(NoopNotifier),
}

impl Notifier {
    pub fn from_settings(settings: &crate::settings::Settings) -> anyhow::Result<Self> {
        match &settings.webhook_url {
            Some(url) => Ok(Self::Webhook(WebhookNotifier::new(url.clone())?)),
            None => Ok(Self::Noop(NoopNotifier)),
        }
    }
}

impl Notify for Notifier {
    async fn send(&self, note: &Notification) -> anyhow::Result<()> {
        match self {
            Self::Webhook(webhook) => webhook.send(note).await,
            Self::Noop(noop) => noop.send(note).await,
        }
    }
}

/// Real notifier POSTing JSON to a webhook endpoint.
#[derive(Debug)]
pub struct WebhookNotifier {
    endpoint: Url,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(endpoint: Url) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("restack/0.1.0")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { endpoint, client })
    }
}

impl Notify for WebhookNotifier {
    async fn send(&self, note: &Notification) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(note)
            .send()
            .await
            .with_context(|| format!("Failed to post notification to {}", self.endpoint))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Webhook rejected notification: HTTP {} from {}",
                response.status(),
                self.endpoint
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::Revision;

    fn updated() -> Outcome {
        Outcome::Updated {
            old: Revision::new("abc1234def5678abc1234def5678abc1234def56"),
            new: Revision::new("def5678abc1234def5678abc1234def5678abc12"),
        }
    }

    #[test]
    fn up_to_date_produces_no_notification() {
        assert!(Notification::for_outcome(&Outcome::UpToDate, None, None).is_none());
    }

    #[test]
    fn success_carries_fields_and_commit_link() {
        let meta = CommitMeta {
            summary: "Fix scoring window".to_string(),
            author: "Ada".to_string(),
        };
        let base = Url::parse("https://github.com/acme/stack").unwrap();
        let note = Notification::for_outcome(&updated(), Some(&meta), Some(&base)).unwrap();

        assert_eq!(note.color, SUCCESS_COLOR);
        assert!(note.description.contains("abc1234"));
        assert!(note.description.contains("def5678"));
        assert_eq!(note.fields[0].name, "Commit Message");
        assert_eq!(note.fields[0].value, "Fix scoring window");
        assert_eq!(note.fields[1].name, "Author");
        assert_eq!(note.fields[1].value, "Ada");
        assert_eq!(
            note.url.as_deref(),
            Some("https://github.com/acme/stack/commit/def5678abc1234def5678abc1234def5678abc12")
        );
    }

    #[test]
    fn failure_uses_distinct_color_and_omits_fields() {
        let outcome = Outcome::Failed {
            old: Some(Revision::new("abc1234def5678abc1234def5678abc1234def56")),
            new: Some(Revision::new("def5678abc1234def5678abc1234def5678abc12")),
            detail: "pull failed: connection reset".to_string(),
        };
        let note = Notification::for_outcome(&outcome, None, None).unwrap();

        assert_eq!(note.color, FAILURE_COLOR);
        assert_ne!(SUCCESS_COLOR, FAILURE_COLOR);
        assert!(note.fields.is_empty());
        assert!(note.url.is_none());

        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("fields").is_none(), "empty fields list is omitted");
        assert!(json.get("url").is_none());
        assert_eq!(json["color"], FAILURE_COLOR);
    }
}
