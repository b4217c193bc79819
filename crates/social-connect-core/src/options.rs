// ConnectOptions — configuration for the sign-in and linking flows.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    /// Where users go to sign in with local credentials (default: "/signin").
    #[serde(default = "default_sign_in_url")]
    pub sign_in_url: String,

    /// Where users are sent when a provider sign-in has no local account
    /// (default: "/signup").
    #[serde(default = "default_sign_up_url")]
    pub sign_up_url: String,

    /// Fallback destination after a successful provider sign-in (default: "/").
    #[serde(default = "default_post_sign_in_url")]
    pub post_sign_in_url: String,

    #[serde(default)]
    pub account: AccountOptions,
}

/// Connection ownership rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOptions {
    /// Allow one provider account to be linked to several local users.
    /// When false, linking an account already owned by another local user
    /// fails as a duplicate.
    #[serde(default)]
    pub allow_shared_provider_accounts: bool,
}

fn default_sign_in_url() -> String {
    "/signin".to_string()
}

fn default_sign_up_url() -> String {
    "/signup".to_string()
}

fn default_post_sign_in_url() -> String {
    "/".to_string()
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            sign_in_url: default_sign_in_url(),
            sign_up_url: default_sign_up_url(),
            post_sign_in_url: default_post_sign_in_url(),
            account: AccountOptions::default(),
        }
    }
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `SOCIAL_CONNECT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(crate::env::var)
    }

    /// Defaults overlaid with the `SOCIAL_CONNECT_*` values `get` returns.
    /// Empty values are ignored.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| get(name).filter(|v| !v.is_empty());
        let mut options = Self::default();
        if let Some(url) = get("SOCIAL_CONNECT_SIGN_IN_URL") {
            options.sign_in_url = url;
        }
        if let Some(url) = get("SOCIAL_CONNECT_SIGN_UP_URL") {
            options.sign_up_url = url;
        }
        if let Some(url) = get("SOCIAL_CONNECT_POST_SIGN_IN_URL") {
            options.post_sign_in_url = url;
        }
        if let Some(flag) = get("SOCIAL_CONNECT_ALLOW_SHARED_ACCOUNTS") {
            options.account.allow_shared_provider_accounts =
                matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        options
    }

    pub fn with_sign_up_url(mut self, url: impl Into<String>) -> Self {
        self.sign_up_url = url.into();
        self
    }

    pub fn with_sign_in_url(mut self, url: impl Into<String>) -> Self {
        self.sign_in_url = url.into();
        self
    }

    pub fn with_post_sign_in_url(mut self, url: impl Into<String>) -> Self {
        self.post_sign_in_url = url.into();
        self
    }

    pub fn with_shared_provider_accounts(mut self, allow: bool) -> Self {
        self.account.allow_shared_provider_accounts = allow;
        self
    }
}
