//! Fixed user table, for tests and local runs without the user service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{UserDirectory, UserInfo};

#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: Arc<RwLock<HashMap<UserId, UserInfo>>>,
    fallback_email: Option<String>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer unknown users with a generated profile using `email`.
    pub fn with_fallback_email(email: impl Into<String>) -> Self {
        Self {
            fallback_email: Some(email.into()),
            ..Self::default()
        }
    }

    pub async fn insert(&self, user: UserInfo) {
        self.users.write().await.insert(user.user_id, user);
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn user_info(&self, user_id: UserId) -> Result<UserInfo, DomainError> {
        if let Some(user) = self.users.read().await.get(&user_id) {
            return Ok(user.clone());
        }

        match &self.fallback_email {
            Some(email) => Ok(UserInfo {
                user_id,
                name: format!("User {}", user_id),
                email: email.clone(),
                role: String::new(),
            }),
            None => Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User {} not found", user_id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_user_is_returned() {
        let directory = StaticUserDirectory::new();
        directory
            .insert(UserInfo {
                user_id: UserId::new(5),
                name: "Budi".to_string(),
                email: "budi@example.com".to_string(),
                role: "customer".to_string(),
            })
            .await;

        let user = directory.user_info(UserId::new(5)).await.unwrap();
        assert_eq!(user.name, "Budi");
    }

    #[tokio::test]
    async fn unknown_user_without_fallback_is_not_found() {
        let err = StaticUserDirectory::new()
            .user_info(UserId::new(1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn fallback_email_covers_unknown_users() {
        let directory = StaticUserDirectory::with_fallback_email("ops@example.com");
        let user = directory.user_info(UserId::new(9)).await.unwrap();
        assert_eq!(user.email, "ops@example.com");
    }
}
