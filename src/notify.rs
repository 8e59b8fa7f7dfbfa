//! # Notifications
//!
//! Outbound notifications for backup and restore outcomes. The
//! contract is advisory: implementations never return errors and
//! never panic, because a lost email must not fail the operation
//! that triggered it.
//!
//! `EmailNotifier` consults the settings store on every send, so
//! enabling notifications or changing recipients takes effect without
//! a restart. Without SMTP configuration the process degrades to
//! `LogNotifier`.

use crate::config::{AppConfig, ConfigError};
use crate::settings::SettingsStore;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Advisory notification seam
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send an outbound notification. Failures are swallowed.
    async fn notify(&self, subject: &str, message: &str);

    /// Record an operational error with its context
    async fn log_error(&self, kind: &str, message: &str, context: &str);
}

/// Notifier that only writes to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, message: &str) {
        info!(subject, message, "notification");
    }

    async fn log_error(&self, kind: &str, message: &str, context: &str) {
        error!(kind, context, "{}", message);
    }
}

/// SMTP notifier backed by lettre
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject_prefix: String,
    settings: Arc<dyn SettingsStore>,
}

impl EmailNotifier {
    pub fn from_config(
        config: &AppConfig,
        settings: Arc<dyn SettingsStore>,
    ) -> Result<Self, ConfigError> {
        let url = config
            .smtp_url
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("smtp_url is required for email".into()))?;
        let from = config
            .smtp_from
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("smtp_from is required for email".into()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(url)
            .map_err(|e| ConfigError::Invalid(format!("invalid smtp_url: {}", e)))?
            .build();
        let from: Mailbox = from
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid smtp_from: {}", e)))?;

        Ok(Self {
            transport,
            from,
            subject_prefix: config.notify_subject_prefix.clone(),
            settings,
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, subject: &str, message: &str) {
        let settings = match self.settings.get_settings().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "skipping notification, settings unavailable");
                return;
            }
        };
        if !settings.notifications_enabled {
            debug!(subject, "notifications disabled, not sending");
            return;
        }
        if settings.notify_recipients.is_empty() {
            debug!(subject, "no recipients configured, not sending");
            return;
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(format!("{} {}", self.subject_prefix, subject));
        let mut any_recipient = false;
        for recipient in &settings.notify_recipients {
            match recipient.parse::<Mailbox>() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    any_recipient = true;
                }
                Err(e) => warn!(recipient, error = %e, "skipping unparsable recipient"),
            }
        }
        if !any_recipient {
            return;
        }

        let email = match builder.body(message.to_string()) {
            Ok(email) => email,
            Err(e) => {
                warn!(error = %e, "failed to build notification mail");
                return;
            }
        };

        if let Err(e) = self.transport.send(email).await {
            warn!(error = %e, subject, "failed to send notification mail");
        }
    }

    async fn log_error(&self, kind: &str, message: &str, context: &str) {
        error!(kind, context, "{}", message);
    }
}

/// Pick the notifier the configuration supports
pub fn build_notifier(
    config: &AppConfig,
    settings: Arc<dyn SettingsStore>,
) -> Result<Arc<dyn Notifier>, ConfigError> {
    if config.smtp_url.is_some() && config.smtp_from.is_some() {
        Ok(Arc::new(EmailNotifier::from_config(config, settings)?))
    } else {
        if config.notifications_enabled {
            warn!("notifications enabled without smtp configuration, falling back to log only");
        }
        Ok(Arc::new(LogNotifier))
    }
}
