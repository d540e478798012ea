//! Outbound alert notifications

use super::recommendation::{Recommendation, Severity};
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub const ALERT_SUBJECT: &str = "PensionGuard Pro: Fondo E alert";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

pub fn alert_body(recommendation: &Recommendation) -> String {
    format!(
        "Recommendation: {}\nSeverity: {}\nReason: {}\n",
        recommendation.headline(),
        recommendation.severity,
        recommendation.rationale
    )
}

/// Sends an alert for `Severity::Alert` recommendations. Delivery failures are
/// logged and swallowed. Returns whether a message was delivered.
pub async fn notify_alert(notifier: &dyn Notifier, recommendation: &Recommendation) -> bool {
    if recommendation.severity != Severity::Alert {
        debug!(severity = %recommendation.severity, "No alert to send");
        return false;
    }

    match notifier
        .notify(ALERT_SUBJECT, &alert_body(recommendation))
        .await
    {
        Ok(()) => {
            info!("Alert notification sent");
            true
        }
        Err(e) => {
            warn!(error = %e, "Failed to send alert notification");
            false
        }
    }
}
