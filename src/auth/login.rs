//! Login collaborator.
//!
//! The gate never checks passwords. Whoever owns account storage implements
//! [`Authenticator`]; the login route calls it and, on success, asks the
//! token codec for a token.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::UserId;

/// Login failures, mapped to distinct HTTP statuses by the login route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// No account registered under this e-mail
    UnknownEmail,
    /// Account exists but the password does not match
    WrongPassword,
    /// Storage or other backend failure
    Backend(String),
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEmail => write!(f, "Email is not registered"),
            Self::WrongPassword => write!(f, "Password is incorrect"),
            Self::Backend(msg) => write!(f, "Login backend error: {}", msg),
        }
    }
}

impl std::error::Error for LoginError {}

/// Checks login credentials and resolves them to an account.
pub trait Authenticator: Send + Sync {
    fn authenticate<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UserId, LoginError>> + Send + 'a>>;
}

/// A configured development account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevAccount {
    pub email: String,
    /// Hex SHA-256 of the password (never the raw password)
    pub password_sha256: String,
    pub user_id: UserId,
}

/// In-memory accounts for local development.
///
/// Deployments with real account storage plug in their own
/// [`Authenticator`] instead.
#[derive(Debug, Clone, Default)]
pub struct DevAccounts {
    by_email: HashMap<String, DevAccount>,
}

impl DevAccounts {
    pub fn new(accounts: impl IntoIterator<Item = DevAccount>) -> Self {
        let by_email = accounts
            .into_iter()
            .map(|account| (account.email.to_ascii_lowercase(), account))
            .collect();
        Self { by_email }
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }

    fn check(&self, email: &str, password: &str) -> Result<UserId, LoginError> {
        let account = self
            .by_email
            .get(&email.to_ascii_lowercase())
            .ok_or(LoginError::UnknownEmail)?;

        if !account
            .password_sha256
            .eq_ignore_ascii_case(&hash_password(password))
        {
            return Err(LoginError::WrongPassword);
        }

        Ok(account.user_id)
    }
}

impl Authenticator for DevAccounts {
    fn authenticate<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<UserId, LoginError>> + Send + 'a>> {
        Box::pin(async move { self.check(email, password) })
    }
}

/// Hex SHA-256 digest of a password, the format stored in dev accounts.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> DevAccounts {
        DevAccounts::new([DevAccount {
            email: "Kate@Example.com".to_string(),
            password_sha256: hash_password("hunter2"),
            user_id: UserId::new(7),
        }])
    }

    #[test]
    fn test_hash_password() {
        let hash1 = hash_password("secret123");
        let hash2 = hash_password("secret123");
        let hash3 = hash_password("different");

        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }

    #[tokio::test]
    async fn test_dev_accounts_accept_valid_login() {
        let accounts = accounts();
        let id = accounts
            .authenticate("kate@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(id, UserId::new(7));
    }

    #[tokio::test]
    async fn test_dev_accounts_reject_bad_login() {
        let accounts = accounts();
        assert_eq!(
            accounts
                .authenticate("nobody@example.com", "hunter2")
                .await
                .unwrap_err(),
            LoginError::UnknownEmail
        );
        assert_eq!(
            accounts
                .authenticate("kate@example.com", "wrong")
                .await
                .unwrap_err(),
            LoginError::WrongPassword
        );
    }

    #[test]
    fn test_dev_account_deserialization() {
        let json = r#"{
            "email": "kate@example.com",
            "passwordSha256": "abc",
            "userId": 3
        }"#;

        let account: DevAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.email, "kate@example.com");
        assert_eq!(account.password_sha256, "abc");
        assert_eq!(account.user_id, UserId::new(3));
    }

    #[test]
    fn test_empty_accounts() {
        assert!(DevAccounts::default().is_empty());
        assert_eq!(accounts().len(), 1);
    }
}
