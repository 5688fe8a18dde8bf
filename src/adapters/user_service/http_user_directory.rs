//! HTTP client for the user service.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{UserDirectory, UserInfo};

/// Default lookup timeout.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Looks users up with `GET {base_url}/users/{user_id}`.
pub struct HttpUserDirectory {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::new(ErrorCode::ExternalServiceError, e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn user_url(&self, user_id: UserId) -> String {
        format!("{}/users/{}", self.base_url, user_id)
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn user_info(&self, user_id: UserId) -> Result<UserInfo, DomainError> {
        let response = self
            .http_client
            .get(self.user_url(user_id))
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() { "timed out" } else { "unreachable" };
                DomainError::new(
                    ErrorCode::ExternalServiceError,
                    format!("user service {}: {}", reason, e),
                )
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User {} not found", user_id),
            ));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(user_id = %user_id, status = %status, "User lookup failed");
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                format!("user service returned {}: {}", status, body),
            ));
        }

        response.json::<UserInfo>().await.map_err(|e| {
            DomainError::new(
                ErrorCode::ExternalServiceError,
                format!("invalid user service response: {}", e),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_url_joins_base_and_id() {
        let directory =
            HttpUserDirectory::new("http://users.internal/", DEFAULT_LOOKUP_TIMEOUT).unwrap();
        assert_eq!(directory.user_url(UserId::new(5)), "http://users.internal/users/5");
    }

    #[tokio::test]
    async fn unreachable_service_is_external_error() {
        let directory =
            HttpUserDirectory::new("http://127.0.0.1:1", Duration::from_millis(200)).unwrap();
        let err = directory.user_info(UserId::new(5)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
    }
}
