//! In-process identity provider.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::debug;

use torodo_core::{AccountId, Email};

use super::{AuthError, IdentityProvider, User, UserProfile, hash_password, verify_password};

#[derive(Debug)]
struct Account {
    user: User,
    password_hash: String,
}

/// An identity provider that keeps accounts in memory, with Argon2id
/// password hashes. Used by tests and offline sessions.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn login_key(login: &Email) -> String {
    login.as_str().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(
        &self,
        login: &Email,
        password: &SecretString,
        profile: UserProfile,
    ) -> Result<User, AuthError> {
        let key = login_key(login);
        if self.lock().contains_key(&key) {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;
        let user = User {
            id: AccountId::generate(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            phone: profile.phone,
            email: profile.email,
            address: profile.address,
        };

        let mut accounts = self.lock();
        if accounts.contains_key(&key) {
            return Err(AuthError::UserAlreadyExists);
        }
        accounts.insert(
            key,
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        debug!(account_id = %user.id, "Account stored");
        Ok(user)
    }

    async fn sign_in(&self, login: &Email, password: &SecretString) -> Result<User, AuthError> {
        let (user, password_hash) = {
            let accounts = self.lock();
            let account = accounts
                .get(&login_key(login))
                .ok_or(AuthError::InvalidCredentials)?;
            (account.user.clone(), account.password_hash.clone())
        };
        verify_password(password, &password_hash)?;
        Ok(user)
    }

    async fn sign_out(&self, _user: &User) -> Result<(), AuthError> {
        Ok(())
    }
}
