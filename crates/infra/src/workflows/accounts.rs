use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use shopdesk_auth::{PasswordError, Role, User, hash_password, verify_password};
use shopdesk_core::{DomainError, Email, UserId};
use shopdesk_customers::{Customer, NewCustomer};

use super::{Shop, WorkflowError, WorkflowResult};

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: Email,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Shop {
    /// Register a shopper account and its customer record.
    ///
    /// An existing customer with the same email and no linked account is
    /// adopted; otherwise a new customer is created. If the customer write
    /// fails, the freshly created user is removed again.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> WorkflowResult<(User, Customer)> {
        let hash = hash_password(&request.password)?;
        let user = User::register(&request.name, request.email.clone(), hash, Role::Customer, Utc::now())?;
        self.users.insert(&user).await?;

        match self.attach_customer(&user, request.phone).await {
            Ok(customer) => {
                info!(user_id = %user.id, customer_id = %customer.id, "user signed up");
                Ok((user, customer))
            }
            Err(err) => {
                warn!(user_id = %user.id, error = %err, "customer write failed; removing new user");
                if let Err(cleanup) = self.users.delete(user.id).await {
                    error!(user_id = %user.id, error = %cleanup, "failed to remove user after signup failure");
                }
                Err(err)
            }
        }
    }

    async fn attach_customer(&self, user: &User, phone: Option<String>) -> WorkflowResult<Customer> {
        let existing = self
            .customers
            .find_one_by("email", user.email.as_str())
            .await?;

        if let Some(customer) = existing {
            let user_id = user.id;
            let (customer, ()) = self
                .customers
                .update(customer.id, move |c| c.link_user(user_id))
                .await?;
            return Ok(customer);
        }

        let mut customer = Customer::create(
            NewCustomer {
                name: user.name.clone(),
                email: user.email.clone(),
                phone,
                address: None,
                notes: None,
            },
            Utc::now(),
        )?;
        customer.link_user(user.id)?;
        self.customers.insert(&customer).await?;
        Ok(customer)
    }

    /// Check credentials. Unknown email and wrong password are indistinguishable.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> WorkflowResult<User> {
        let email = Email::parse(email).map_err(|_| WorkflowError::InvalidCredentials)?;
        let user = self
            .users
            .find_one_by("email", email.as_str())
            .await?
            .ok_or(WorkflowError::InvalidCredentials)?;

        verify_password(password, &user.password_hash).map_err(|_| WorkflowError::InvalidCredentials)?;

        if !user.can_authenticate() {
            warn!(user_id = %user.id, "login attempt by suspended user");
            return Err(WorkflowError::Suspended);
        }
        Ok(user)
    }

    #[instrument(skip(self, current, new_password))]
    pub async fn change_password(&self, user_id: UserId, current: &str, new_password: &str) -> WorkflowResult<()> {
        let user = self.users.require(user_id).await?;
        verify_password(current, &user.password_hash).map_err(|e| match e {
            PasswordError::Mismatch => WorkflowError::InvalidCredentials,
            other => WorkflowError::Password(other),
        })?;

        let hash = hash_password(new_password)?;
        self.users
            .update(user_id, move |u| {
                u.set_password_hash(hash);
                Ok(())
            })
            .await?;
        info!(user_id = %user_id, "password changed");
        Ok(())
    }

    /// Bootstrap an administrator. An existing account with the email is
    /// promoted instead of duplicated.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, name: &str, email: &Email, password: &str) -> WorkflowResult<User> {
        if let Some(existing) = self.users.find_one_by("email", email.as_str()).await? {
            if existing.role == Role::Admin {
                return Ok(existing);
            }
            let (user, ()) = self
                .users
                .update(existing.id, |u| {
                    u.set_role(Role::Admin);
                    Ok(())
                })
                .await?;
            info!(user_id = %user.id, "promoted existing user to admin");
            return Ok(user);
        }

        let user = User::register(name, email.clone(), hash_password(password)?, Role::Admin, Utc::now())?;
        self.users.insert(&user).await?;
        info!(user_id = %user.id, "created admin user");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn set_user_role(&self, actor: UserId, target: UserId, role: Role) -> WorkflowResult<User> {
        if actor == target && role != Role::Admin {
            return Err(DomainError::conflict("you cannot remove your own admin role").into());
        }
        let (user, ()) = self
            .users
            .update(target, move |u| {
                u.set_role(role);
                Ok(())
            })
            .await?;
        info!(user_id = %user.id, role = %role, "user role changed");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn suspend_user(&self, actor: UserId, target: UserId) -> WorkflowResult<User> {
        if actor == target {
            return Err(DomainError::conflict("you cannot suspend your own account").into());
        }
        let (user, ()) = self.users.update(target, |u| u.suspend()).await?;
        info!(user_id = %user.id, "user suspended");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn activate_user(&self, target: UserId) -> WorkflowResult<User> {
        let (user, ()) = self.users.update(target, |u| u.activate()).await?;
        info!(user_id = %user.id, "user activated");
        Ok(user)
    }

    /// The customer record linked to a login account, if any.
    pub async fn customer_for_user(&self, user_id: UserId) -> WorkflowResult<Option<Customer>> {
        Ok(self
            .customers
            .find_one_by("user_id", &user_id.to_string())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value as JsonValue;
    use uuid::Uuid;

    use super::*;
    use crate::store::{DocumentStore, InMemoryDocumentStore, StoreError, UniqueKey, UpdateFn};
    use crate::workflows::test_support::{seed_customer, test_shop};

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            name: "Ada".to_string(),
            email: Email::parse(email).unwrap(),
            password: "correct horse".to_string(),
            phone: None,
        }
    }

    /// Store whose `customers` collection refuses every insert.
    struct CustomerWritesFail(InMemoryDocumentStore);

    #[async_trait]
    impl DocumentStore for CustomerWritesFail {
        async fn insert(
            &self,
            collection: &str,
            id: Uuid,
            body: JsonValue,
            keys: Vec<UniqueKey>,
        ) -> Result<(), StoreError> {
            if collection == "customers" {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.0.insert(collection, id, body, keys).await
        }

        async fn get(&self, collection: &str, id: Uuid) -> Result<Option<JsonValue>, StoreError> {
            self.0.get(collection, id).await
        }

        async fn list(&self, collection: &str) -> Result<Vec<JsonValue>, StoreError> {
            self.0.list(collection).await
        }

        async fn find_by_key(
            &self,
            collection: &str,
            key: &str,
            value: &str,
        ) -> Result<Option<JsonValue>, StoreError> {
            self.0.find_by_key(collection, key, value).await
        }

        async fn update<'a>(
            &'a self,
            collection: &'a str,
            id: Uuid,
            f: UpdateFn<'a>,
        ) -> Result<JsonValue, StoreError> {
            self.0.update(collection, id, f).await
        }

        async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
            self.0.delete(collection, id).await
        }
    }

    #[tokio::test]
    async fn signup_creates_linked_customer() {
        let shop = test_shop();
        let (user, customer) = shop.signup(signup_request("ada@example.com")).await.unwrap();

        assert_eq!(user.role, Role::Customer);
        assert_eq!(customer.user_id, Some(user.id));
        assert_eq!(shop.customer_for_user(user.id).await.unwrap(), Some(customer));
    }

    #[tokio::test]
    async fn signup_adopts_unlinked_customer() {
        let shop = test_shop();
        let existing = seed_customer(&shop, "ada@example.com").await;

        let (user, customer) = shop.signup(signup_request("ada@example.com")).await.unwrap();
        assert_eq!(customer.id, existing);
        assert_eq!(customer.user_id, Some(user.id));
        assert_eq!(shop.customers.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let shop = test_shop();
        shop.signup(signup_request("ada@example.com")).await.unwrap();
        let err = shop.signup(signup_request("ADA@example.com")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn failed_customer_write_leaves_no_user_behind() {
        let shop = Shop::new(Arc::new(CustomerWritesFail(InMemoryDocumentStore::new())));
        let err = shop.signup(signup_request("ada@example.com")).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Store(StoreError::Backend(_))));
        assert!(shop.users.list().await.unwrap().is_empty());
        assert!(shop.users.find_one_by("email", "ada@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn weak_password_is_rejected_before_any_write() {
        let shop = test_shop();
        let mut request = signup_request("ada@example.com");
        request.password = "short".to_string();

        let err = shop.signup(request).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Password(PasswordError::TooShort)));
        assert!(shop.users.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_checks_password_and_status() {
        let shop = test_shop();
        let (user, _) = shop.signup(signup_request("ada@example.com")).await.unwrap();

        assert_eq!(shop.login(" Ada@Example.com ", "correct horse").await.unwrap().id, user.id);
        assert!(matches!(
            shop.login("ada@example.com", "wrong horse").await,
            Err(WorkflowError::InvalidCredentials)
        ));
        assert!(matches!(
            shop.login("nobody@example.com", "correct horse").await,
            Err(WorkflowError::InvalidCredentials)
        ));

        let admin = UserId::new();
        shop.suspend_user(admin, user.id).await.unwrap();
        assert!(matches!(
            shop.login("ada@example.com", "correct horse").await,
            Err(WorkflowError::Suspended)
        ));
    }

    #[tokio::test]
    async fn change_password_requires_current() {
        let shop = test_shop();
        let (user, _) = shop.signup(signup_request("ada@example.com")).await.unwrap();

        assert!(matches!(
            shop.change_password(user.id, "not it at all", "new password").await,
            Err(WorkflowError::InvalidCredentials)
        ));
        shop.change_password(user.id, "correct horse", "battery staple").await.unwrap();
        shop.login("ada@example.com", "battery staple").await.unwrap();
    }

    #[tokio::test]
    async fn admins_cannot_demote_or_suspend_themselves() {
        let shop = test_shop();
        let email = Email::parse("admin@example.com").unwrap();
        let admin = shop.ensure_admin("Admin", &email, "admin-password").await.unwrap();
        let again = shop.ensure_admin("Admin", &email, "ignored-password").await.unwrap();
        assert_eq!(admin.id, again.id);

        assert!(shop.set_user_role(admin.id, admin.id, Role::Customer).await.is_err());
        assert!(shop.suspend_user(admin.id, admin.id).await.is_err());
    }
}
