//! # Operational Settings
//!
//! Runtime-adjustable knobs: retention window and notification
//! targets. Settings are seeded from configuration and can change
//! without a restart through the PATCH endpoint, so retention cleanup
//! and the notifier read them through this seam on every use.

use crate::config::AppConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;

/// Errors from reading or updating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Current operational settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalSettings {
    /// Days a backup is retained before cleanup deletes it
    pub retention_days: u32,
    /// Whether success/failure notifications are sent
    pub notifications_enabled: bool,
    /// Notification recipients
    pub notify_recipients: Vec<String>,
}

impl Default for OperationalSettings {
    fn default() -> Self {
        Self {
            retention_days: 30,
            notifications_enabled: false,
            notify_recipients: Vec::new(),
        }
    }
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Default, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub retention_days: Option<u32>,
    #[serde(default)]
    pub notifications_enabled: Option<bool>,
    #[serde(default)]
    pub notify_recipients: Option<Vec<String>>,
}

impl SettingsPatch {
    /// Reject values the orchestrators cannot operate with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(days) = self.retention_days {
            if days == 0 {
                return Err(SettingsError::Invalid(
                    "retention_days must be greater than 0".to_string(),
                ));
            }
            if days > 3650 {
                return Err(SettingsError::Invalid(
                    "retention_days must be at most 3650".to_string(),
                ));
            }
        }
        if let Some(recipients) = &self.notify_recipients {
            for r in recipients {
                if !r.contains('@') {
                    return Err(SettingsError::Invalid(format!(
                        "recipient '{}' is not an email address",
                        r
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Seam for settings consumers
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_settings(&self) -> Result<OperationalSettings, SettingsError>;
    async fn update_settings(&self, patch: SettingsPatch) -> Result<OperationalSettings, SettingsError>;
}

/// Process-local settings state
pub struct InMemorySettingsStore {
    inner: RwLock<OperationalSettings>,
}

impl InMemorySettingsStore {
    pub fn new(initial: OperationalSettings) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// Seed from startup configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(OperationalSettings {
            retention_days: config.retention_days,
            notifications_enabled: config.notifications_enabled,
            notify_recipients: config.notify_recipients.clone(),
        })
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get_settings(&self) -> Result<OperationalSettings, SettingsError> {
        Ok(self.inner.read().expect("settings lock poisoned").clone())
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<OperationalSettings, SettingsError> {
        patch.validate()?;

        let mut settings = self.inner.write().expect("settings lock poisoned");
        if let Some(days) = patch.retention_days {
            settings.retention_days = days;
        }
        if let Some(enabled) = patch.notifications_enabled {
            settings.notifications_enabled = enabled;
        }
        if let Some(recipients) = patch.notify_recipients {
            settings.notify_recipients = recipients;
        }
        Ok(settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_from_config() {
        let mut config = AppConfig::default();
        config.retention_days = 14;
        config.notify_recipients = vec!["ops@example.com".to_string()];

        let store = InMemorySettingsStore::from_config(&config);
        let settings = store.get_settings().await.unwrap();
        assert_eq!(settings.retention_days, 14);
        assert_eq!(settings.notify_recipients.len(), 1);
    }

    #[tokio::test]
    async fn test_patch_updates_only_present_fields() {
        let store = InMemorySettingsStore::new(OperationalSettings::default());

        let updated = store
            .update_settings(SettingsPatch {
                retention_days: Some(7),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.retention_days, 7);
        assert!(!updated.notifications_enabled);
    }

    #[tokio::test]
    async fn test_patch_rejects_zero_retention() {
        let store = InMemorySettingsStore::new(OperationalSettings::default());

        let err = store
            .update_settings(SettingsPatch {
                retention_days: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));

        // Nothing changed.
        assert_eq!(store.get_settings().await.unwrap().retention_days, 30);
    }

    #[tokio::test]
    async fn test_patch_rejects_bad_recipient() {
        let store = InMemorySettingsStore::new(OperationalSettings::default());

        let err = store
            .update_settings(SettingsPatch {
                notify_recipients: Some(vec!["not-an-address".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }
}
