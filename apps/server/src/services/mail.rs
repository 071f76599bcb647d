//! Outbound mail collaborator.
//!
//! The server only ever needs `send(to, subject, body)`; delivery is an
//! external concern. `HttpRelayMailer` posts the message as JSON to a
//! configured relay endpoint, `NoopMailer` logs and drops it when mail is
//! disabled. Failures are logged and surfaced, never retried.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::{config::MailConfig, Error, Result};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

pub fn from_config(config: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    if !config.enabled {
        return Ok(Arc::new(NoopMailer));
    }

    let relay_url = config
        .relay_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("mail.relay_url is required when mail is enabled"))?;

    Ok(Arc::new(HttpRelayMailer::new(
        relay_url,
        config.from.clone(),
    )?))
}

/// Mail disabled: record the attempt and move on.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        tracing::info!(to, subject, "Mail disabled, dropping outbound message");
        Ok(())
    }
}

/// Posts `{from, to, subject, body}` to an HTTP relay.
pub struct HttpRelayMailer {
    http: reqwest::Client,
    relay_url: String,
    from: String,
}

impl HttpRelayMailer {
    pub fn new(relay_url: String, from: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            relay_url,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let response = self
            .http
            .post(&self.relay_url)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Mail relay request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "Mail relay returned HTTP {}",
                response.status()
            )));
        }

        tracing::info!(to, subject, "Outbound mail accepted by relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_mail_gets_the_noop_mailer() {
        let mailer = from_config(&MailConfig {
            enabled: false,
            relay_url: None,
            from: "no-reply@ward.local".to_string(),
        })
        .unwrap();

        tokio_test::block_on(async {
            assert!(mailer.send("a@b.c", "subject", "body").await.is_ok());
        });
    }

    #[test]
    fn enabled_mail_without_relay_is_a_config_error() {
        let result = from_config(&MailConfig {
            enabled: true,
            relay_url: None,
            from: "no-reply@ward.local".to_string(),
        });
        assert!(result.is_err());
    }
}
