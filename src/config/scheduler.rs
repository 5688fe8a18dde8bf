//! Scheduler and retry settings
//!
//! Plain seconds and counts here; [`SchedulerSettings::scheduler_config`] and
//! [`RetrySettings::retry_policy`] turn them into the runtime types.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::{RetryPolicy, SchedulerConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_pending_requests_interval")]
    pub pending_requests_interval_secs: u64,

    #[serde(default = "default_batch")]
    pub pending_requests_batch: u32,

    #[serde(default = "default_failed_requests_interval")]
    pub failed_requests_interval_secs: u64,

    #[serde(default = "default_batch")]
    pub failed_requests_batch: u32,

    #[serde(default = "default_max_request_retries")]
    pub max_request_retries: u32,

    #[serde(default = "default_ten_minutes")]
    pub pending_invoices_interval_secs: u64,

    #[serde(default = "default_lookback_hours")]
    pub pending_invoices_lookback_hours: u64,

    #[serde(default = "default_ten_minutes")]
    pub expiry_interval_secs: u64,

    /// Run the schedulers in this process
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SchedulerSettings {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            pending_requests_interval: Duration::from_secs(self.pending_requests_interval_secs),
            pending_requests_batch: self.pending_requests_batch,
            failed_requests_interval: Duration::from_secs(self.failed_requests_interval_secs),
            failed_requests_batch: self.failed_requests_batch,
            max_request_retries: self.max_request_retries,
            pending_invoices_interval: Duration::from_secs(self.pending_invoices_interval_secs),
            pending_invoices_lookback: Duration::from_secs(
                self.pending_invoices_lookback_hours * 60 * 60,
            ),
            expiry_interval: Duration::from_secs(self.expiry_interval_secs),
            ..SchedulerConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let intervals = [
            ("scheduler.pending_requests_interval_secs", self.pending_requests_interval_secs),
            ("scheduler.failed_requests_interval_secs", self.failed_requests_interval_secs),
            ("scheduler.pending_invoices_interval_secs", self.pending_invoices_interval_secs),
            ("scheduler.expiry_interval_secs", self.expiry_interval_secs),
        ];
        for (name, secs) in intervals {
            if secs == 0 {
                return Err(ValidationError::MustBePositive(name));
            }
        }
        if self.pending_requests_batch == 0 {
            return Err(ValidationError::MustBePositive("scheduler.pending_requests_batch"));
        }
        if self.failed_requests_batch == 0 {
            return Err(ValidationError::MustBePositive("scheduler.failed_requests_batch"));
        }
        Ok(())
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            pending_requests_interval_secs: default_pending_requests_interval(),
            pending_requests_batch: default_batch(),
            failed_requests_interval_secs: default_failed_requests_interval(),
            failed_requests_batch: default_batch(),
            max_request_retries: default_max_request_retries(),
            pending_invoices_interval_secs: default_ten_minutes(),
            pending_invoices_lookback_hours: default_lookback_hours(),
            expiry_interval_secs: default_ten_minutes(),
            enabled: default_enabled(),
        }
    }
}

/// Publish retry bounds
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl RetrySettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::MustBePositive("retry.max_attempts"));
        }
        Ok(())
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_pending_requests_interval() -> u64 {
    5
}

fn default_failed_requests_interval() -> u64 {
    60
}

fn default_batch() -> u32 {
    5
}

fn default_max_request_retries() -> u32 {
    3
}

fn default_ten_minutes() -> u64 {
    600
}

fn default_lookback_hours() -> u64 {
    24
}

fn default_enabled() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_runtime_defaults() {
        assert_eq!(
            SchedulerSettings::default().scheduler_config(),
            SchedulerConfig::default()
        );
        assert_eq!(RetrySettings::default().retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let settings = SchedulerSettings {
            expiry_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ValidationError::MustBePositive("scheduler.expiry_interval_secs"))
        );
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let settings = RetrySettings {
            max_attempts: 0,
            base_delay_ms: 10,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization() {
        let settings: SchedulerSettings =
            serde_json::from_str(r#"{"pending_requests_batch": 20, "enabled": false}"#).unwrap();
        assert_eq!(settings.pending_requests_batch, 20);
        assert!(!settings.enabled);
        assert_eq!(settings.scheduler_config().expiry_interval, Duration::from_secs(600));
    }
}
