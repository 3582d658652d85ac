use crate::actor_framework::Entity;
use crate::domain::{User, UserCreate, UserId, UserPatch};

use super::error::UserError;

fn validate_email(email: &str) -> Result<String, UserError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email.to_string()),
        _ => Err(UserError::Validation(format!("invalid email address: {email}"))),
    }
}

impl Entity for User {
    type Id = UserId;
    type CreateParams = UserCreate;
    type Patch = UserPatch;
    type Action = ();
    type ActionResult = ();
    type Error = UserError;

    const KIND: &'static str = "user";

    fn id(&self) -> &UserId {
        &self.id
    }

    /// Creates a new User from creation parameters.
    ///
    /// # Errors
    /// Rejects malformed email addresses and empty credential hashes.
    fn from_create_params(id: UserId, params: UserCreate) -> Result<Self, UserError> {
        if params.credential_hash.is_empty() {
            return Err(UserError::Validation("credential hash must not be empty".into()));
        }
        Ok(Self {
            id,
            email: validate_email(&params.email)?,
            credential_hash: params.credential_hash,
            customer_id: params.customer_id,
            role: params.role,
        })
    }

    /// Updates email, role, or links the gateway customer.
    ///
    /// A customer id can be linked once; relinking to a different id fails.
    fn on_update(&mut self, patch: UserPatch) -> Result<(), UserError> {
        if let Some(customer_id) = patch.customer_id {
            match &self.customer_id {
                Some(existing) if *existing != customer_id => {
                    return Err(UserError::CustomerAlreadyLinked {
                        user_id: self.id,
                        existing: existing.clone(),
                    });
                }
                _ => self.customer_id = Some(customer_id),
            }
        }
        if let Some(email) = patch.email {
            self.email = validate_email(&email)?;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), UserError> {
        Ok(())
    }

    fn unique_keys(&self) -> Vec<String> {
        let mut keys = vec![format!("email:{}", self.email.to_lowercase())];
        if let Some(customer_id) = &self.customer_id {
            keys.push(format!("customer:{customer_id}"));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerId, Role};

    fn user() -> User {
        User::from_create_params(UserId::random(), UserCreate::customer("ana@example.com", "hash"))
            .unwrap()
    }

    #[test]
    fn test_rejects_malformed_email() {
        let err = User::from_create_params(UserId::random(), UserCreate::customer("nobody", "hash"))
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));
    }

    #[test]
    fn test_customer_link_is_set_once() {
        let mut user = user();
        let first = CustomerId::new("cus_1");
        user.on_update(UserPatch { customer_id: Some(first.clone()), ..Default::default() })
            .unwrap();
        // relinking the same id is a no-op
        user.on_update(UserPatch { customer_id: Some(first.clone()), ..Default::default() })
            .unwrap();

        let err = user
            .on_update(UserPatch { customer_id: Some(CustomerId::new("cus_2")), ..Default::default() })
            .unwrap_err();
        assert_eq!(err, UserError::CustomerAlreadyLinked { user_id: user.id, existing: first });
        assert_eq!(user.role, Role::Customer);
    }

    #[test]
    fn test_unique_keys_cover_email_and_customer() {
        let mut user = user();
        assert_eq!(user.unique_keys(), vec!["email:ana@example.com".to_string()]);
        user.customer_id = Some(CustomerId::new("cus_9"));
        assert_eq!(user.unique_keys().len(), 2);
    }
}
