//! UserDirectory port - lookup of the payer's contact details.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, UserId};

/// Contact details needed to address an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(alias = "id")]
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
}

/// Port for the user service.
///
/// Lookups are bounded by a short timeout in the adapters; a missing user
/// is reported as `ErrorCode::UserNotFound`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_info(&self, user_id: UserId) -> Result<UserInfo, DomainError>;
}
