//! Client configuration and per-account preferences
//!
//! Configuration is an explicit value handed to the client. Per-account
//! preferences live in a [`Preferences`] store owned by the caller and keyed
//! by [`account_key`], a SHA-256 digest of the account's access token.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::auth::Authorization;
use crate::error::{Error, Result};

/// Default `User-Agent` header
pub const DEFAULT_USER_AGENT: &str = concat!("mastokit/", env!("CARGO_PKG_VERSION"));

/// Default overall request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for talking to one instance
#[derive(Debug, Clone)]
pub struct ClientConfig {
    instance: Url,
    authorization: Authorization,
    user_agent: String,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration for an instance
    ///
    /// Accepts a full URL or a bare domain such as `mastodon.social`, which
    /// is assumed to be served over HTTPS.
    pub fn new(instance: &str) -> Result<Self> {
        let instance = instance.trim();
        let url = if instance.contains("://") {
            Url::parse(instance)?
        } else {
            Url::parse(&format!("https://{}", instance))?
        };
        match url.scheme() {
            "https" | "http" => {}
            other => {
                return Err(Error::config(format!("unsupported instance scheme: {}", other)))
            }
        }
        if url.host_str().is_none() {
            return Err(Error::config("instance URL has no host"));
        }

        Ok(Self {
            instance: url,
            authorization: Authorization::None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            connect_timeout: None,
        })
    }

    /// Set the access token
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.authorization = Authorization::bearer(token);
        self
    }

    /// Set the authorization
    pub fn authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the overall request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the overall request timeout
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Get the instance base URL
    pub fn instance(&self) -> &Url {
        &self.instance
    }

    pub fn get_authorization(&self) -> &Authorization {
        &self.authorization
    }

    pub fn get_user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn get_connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Storage key for the configured account, if authenticated
    pub fn account_key(&self) -> Option<String> {
        self.authorization.token().map(account_key)
    }
}

/// Derive the per-account storage key from a credential
pub fn account_key(credential: &str) -> String {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

/// Preferences for one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPreferences {
    /// Notifications received but not yet seen
    #[serde(default)]
    pub unread_notifications: u64,
    /// Free-form settings
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

/// Per-account preference store
///
/// Accounts are looked up by credential and stored under [`account_key`],
/// so tokens themselves are never kept. Serializable so the caller can
/// persist it wherever it likes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    accounts: HashMap<String, AccountPreferences>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an account's preferences
    pub fn account(&self, credential: &str) -> Option<&AccountPreferences> {
        self.accounts.get(&account_key(credential))
    }

    /// Get an account's preferences, creating them if missing
    pub fn account_mut(&mut self, credential: &str) -> &mut AccountPreferences {
        self.accounts.entry(account_key(credential)).or_default()
    }

    /// Forget an account
    pub fn remove_account(&mut self, credential: &str) -> Option<AccountPreferences> {
        self.accounts.remove(&account_key(credential))
    }

    /// Add `count` unread notifications, returning the new total
    pub fn add_unread_notifications(&mut self, credential: &str, count: u64) -> u64 {
        let account = self.account_mut(credential);
        account.unread_notifications = account.unread_notifications.saturating_add(count);
        account.unread_notifications
    }

    /// Mark all of an account's notifications as seen
    pub fn clear_unread_notifications(&mut self, credential: &str) {
        if let Some(account) = self.accounts.get_mut(&account_key(credential)) {
            account.unread_notifications = 0;
        }
    }

    /// Unread notifications for one account
    pub fn unread_notifications(&self, credential: &str) -> u64 {
        self.account(credential)
            .map(|a| a.unread_notifications)
            .unwrap_or(0)
    }

    /// Unread notifications across all accounts
    pub fn total_unread_notifications(&self) -> u64 {
        self.accounts
            .values()
            .fold(0u64, |sum, a| sum.saturating_add(a.unread_notifications))
    }

    /// Set a named setting
    pub fn set(&mut self, credential: &str, name: impl Into<String>, value: impl Into<String>) {
        self.account_mut(credential)
            .settings
            .insert(name.into(), value.into());
    }

    /// Get a named setting
    pub fn get(&self, credential: &str, name: &str) -> Option<&str> {
        self.account(credential)
            .and_then(|a| a.settings.get(name))
            .map(String::as_str)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
