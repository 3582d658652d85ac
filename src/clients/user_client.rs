use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::domain::{CustomerId, User, UserCreate, UserId, UserPatch};
use crate::gateway::PaymentGateway;
use crate::impl_basic_client;
use crate::ports::{LookupError, StoreError, UserDirectory};
use crate::user_actor::{RegistrationError, UserError};

/// Client for interacting with the User actor.
#[derive(Clone)]
pub struct UserClient {
    inner: ResourceClient<User>,
}

impl_basic_client!(UserClient, User, user);

impl UserClient {
    #[instrument(skip(self, params), fields(email = %params.email))]
    pub async fn create_user(&self, params: UserCreate) -> Result<UserId, FrameworkError<UserError>> {
        debug!("Sending request");
        self.inner.create(None, params).await
    }

    #[instrument(skip(self))]
    pub async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, FrameworkError<UserError>> {
        debug!("Sending request");
        self.inner.update(None, id, patch).await
    }

    #[instrument(skip(self))]
    pub async fn link_customer(&self, id: UserId, customer_id: CustomerId) -> Result<User, FrameworkError<UserError>> {
        debug!("Sending request");
        let patch = UserPatch { customer_id: Some(customer_id), ..Default::default() };
        self.inner.update(None, id, patch).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, FrameworkError<UserError>> {
        debug!("Sending request");
        let email = email.trim().to_lowercase();
        let found = self.inner.find(move |user: &User| user.email.to_lowercase() == email).await?;
        Ok(found.into_iter().next())
    }

    /// Creates the account, then its gateway customer, then links the two.
    ///
    /// The account is removed again if the gateway customer cannot be created.
    #[instrument(skip(self, credential_hash, gateway))]
    pub async fn register(
        &self,
        email: &str,
        credential_hash: &str,
        gateway: &dyn PaymentGateway,
    ) -> Result<User, RegistrationError> {
        let user_id = self.create_user(UserCreate::customer(email, credential_hash)).await?;

        let customer_id = match gateway.create_customer(email).await {
            Ok(customer_id) => customer_id,
            Err(e) => {
                warn!(%user_id, error = %e, "Gateway customer creation failed, removing account");
                if let Err(cleanup) = self.inner.delete(None, user_id).await {
                    warn!(%user_id, error = %cleanup, "Could not remove half-registered account");
                }
                return Err(e.into());
            }
        };

        let user = self.link_customer(user_id, customer_id).await?;
        info!(%user_id, customer_id = ?user.customer_id, "User registered");
        Ok(user)
    }
}

#[async_trait]
impl UserDirectory for UserClient {
    #[instrument(skip(self))]
    async fn find_by_customer_id(&self, customer_id: &CustomerId) -> Result<User, LookupError> {
        debug!("Sending request");
        let wanted = customer_id.clone();
        let found = self
            .inner
            .find(move |user: &User| user.customer_id.as_ref() == Some(&wanted))
            .await
            .map_err(StoreError::from)?;
        found
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::not_found("user", customer_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::gateway::{GatewayError, MockPaymentGateway};
    use crate::mock_framework::{create_mock_client, expect_create, expect_delete};

    #[tokio::test]
    async fn test_register_removes_account_when_gateway_fails() {
        let (inner, mut receiver) = create_mock_client::<User>(10);
        let client = UserClient::new(inner);
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_customer()
            .returning(|_| Err(GatewayError::Request("gateway down".into())));

        let task = tokio::spawn(async move { client.register("ana@example.com", "hash", &gateway).await });

        let (params, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(params.email, "ana@example.com");
        assert_eq!(params.role, Role::Customer);
        let user_id = UserId::random();
        responder.send(Ok(user_id)).unwrap();

        let (deleted, responder) = expect_delete(&mut receiver).await.expect("Expected Delete request");
        assert_eq!(deleted, user_id);
        responder.send(Ok(())).unwrap();

        let result = task.await.unwrap();
        assert_eq!(result, Err(RegistrationError::Gateway(GatewayError::Request("gateway down".into()))));
    }
}
