use async_trait::async_trait;

use crate::domain::{CustomerId, User};

use super::LookupError;

/// Resolves gateway customers to internal users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_customer_id(&self, customer_id: &CustomerId) -> Result<User, LookupError>;
}
