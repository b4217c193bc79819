// Connection model — the live binding between a local user and a provider
// account, plus the durable snapshot it can be rebuilt from.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Global identity of a provider account: `(provider id, provider user id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionKey {
    pub provider_id: String,
    pub provider_user_id: String,
}

impl ConnectionKey {
    pub fn new(provider_id: impl Into<String>, provider_user_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            provider_user_id: provider_user_id.into(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_id, self.provider_user_id)
    }
}

/// Durable snapshot of a connection.
///
/// Holds everything needed to rebuild a [`Connection`] without
/// re-authenticating with the provider. This is the only part of a sign-in
/// attempt that goes into session storage.
///
/// `Debug` output redacts the credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionData {
    pub provider_id: String,
    pub provider_user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// OAuth 1 token secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<DateTime<Utc>>,
}

impl fmt::Debug for ConnectionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redacted(value: &Option<String>) -> Option<&'static str> {
            value.as_ref().map(|_| "[redacted]")
        }

        f.debug_struct("ConnectionData")
            .field("key", &self.key())
            .field("display_name", &self.display_name)
            .field("access_token", &redacted(&self.access_token))
            .field("secret", &redacted(&self.secret))
            .field("refresh_token", &redacted(&self.refresh_token))
            .field("expire_time", &self.expire_time)
            .finish()
    }
}

impl ConnectionData {
    pub fn new(provider_id: impl Into<String>, provider_user_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            provider_user_id: provider_user_id.into(),
            display_name: None,
            profile_url: None,
            image_url: None,
            access_token: None,
            secret: None,
            refresh_token: None,
            expire_time: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = Some(url.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_expire_time(mut self, at: DateTime<Utc>) -> Self {
        self.expire_time = Some(at);
        self
    }

    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(&self.provider_id, &self.provider_user_id)
    }
}

/// Normalized user profile fetched from a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Per-provider seam for talking to the provider's API on behalf of a
/// connection.
#[async_trait]
pub trait ApiAdapter: Send + Sync + fmt::Debug {
    /// Fetch the provider user's profile.
    async fn fetch_user_profile(&self, data: &ConnectionData) -> Result<UserProfile>;

    /// Check whether the connection's credentials still work.
    async fn test(&self, _data: &ConnectionData) -> bool {
        true
    }
}

/// Adapter that answers from the snapshot alone, without calling the
/// provider. Useful for providers whose sign-in response already carries the
/// profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotApiAdapter;

#[async_trait]
impl ApiAdapter for SnapshotApiAdapter {
    async fn fetch_user_profile(&self, data: &ConnectionData) -> Result<UserProfile> {
        Ok(UserProfile {
            id: Some(data.provider_user_id.clone()),
            name: data.display_name.clone(),
            image: data.image_url.clone(),
            ..Default::default()
        })
    }
}

/// A live connection to a provider account.
#[derive(Debug, Clone)]
pub struct Connection {
    data: ConnectionData,
    api: Arc<dyn ApiAdapter>,
}

impl Connection {
    pub fn new(data: ConnectionData, api: Arc<dyn ApiAdapter>) -> Self {
        Self { data, api }
    }

    pub fn key(&self) -> ConnectionKey {
        self.data.key()
    }

    pub fn provider_id(&self) -> &str {
        &self.data.provider_id
    }

    pub fn provider_user_id(&self) -> &str {
        &self.data.provider_user_id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.data.display_name.as_deref()
    }

    pub fn profile_url(&self) -> Option<&str> {
        self.data.profile_url.as_deref()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.data.image_url.as_deref()
    }

    /// Connections without an expire time never expire.
    pub fn has_expired(&self) -> bool {
        self.data.expire_time.is_some_and(|at| at <= Utc::now())
    }

    /// Capture a durable snapshot of this connection.
    pub fn create_data(&self) -> ConnectionData {
        self.data.clone()
    }

    pub async fn fetch_user_profile(&self) -> Result<UserProfile> {
        self.api.fetch_user_profile(&self.data).await
    }

    pub async fn test(&self) -> bool {
        self.api.test(&self.data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> ConnectionData {
        ConnectionData::new("twitter", "1234")
            .with_display_name("@habuma")
            .with_image_url("https://pbs.example.com/habuma.png")
            .with_access_token("at-1")
    }

    #[test]
    fn test_connection_data_serde_camel_case() {
        let json = serde_json::to_value(sample_data()).unwrap();
        assert_eq!(json["providerId"], "twitter");
        assert_eq!(json["providerUserId"], "1234");
        assert_eq!(json["displayName"], "@habuma");
        assert!(json.get("refreshToken").is_none());
    }

    #[test]
    fn test_connection_data_minimal_deserialize() {
        let data: ConnectionData = serde_json::from_value(serde_json::json!({
            "providerId": "github",
            "providerUserId": "42"
        }))
        .unwrap();
        assert_eq!(data.key(), ConnectionKey::new("github", "42"));
        assert!(data.access_token.is_none());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let mut data = sample_data().with_refresh_token("rt-1");
        data.secret = Some("s3cret".into());
        let conn = Connection::new(data.clone(), Arc::new(SnapshotApiAdapter));

        for debug in [format!("{data:?}"), format!("{conn:?}")] {
            assert!(debug.contains("twitter:1234"));
            assert!(debug.contains("[redacted]"));
            assert!(!debug.contains("at-1"));
            assert!(!debug.contains("rt-1"));
            assert!(!debug.contains("s3cret"));
        }
    }

    #[test]
    fn test_create_data_matches_source() {
        let conn = Connection::new(sample_data(), Arc::new(SnapshotApiAdapter));
        assert_eq!(conn.create_data(), sample_data());
        assert_eq!(conn.display_name(), Some("@habuma"));
    }

    #[test]
    fn test_has_expired() {
        let past = Utc::now() - chrono::Duration::seconds(60);
        let future = Utc::now() + chrono::Duration::seconds(3600);
        let api: Arc<dyn ApiAdapter> = Arc::new(SnapshotApiAdapter);

        assert!(!Connection::new(sample_data(), api.clone()).has_expired());
        assert!(Connection::new(sample_data().with_expire_time(past), api.clone()).has_expired());
        assert!(!Connection::new(sample_data().with_expire_time(future), api).has_expired());
    }

    #[tokio::test]
    async fn test_snapshot_adapter_profile() {
        let conn = Connection::new(sample_data(), Arc::new(SnapshotApiAdapter));
        let profile = conn.fetch_user_profile().await.unwrap();
        assert_eq!(profile.id.as_deref(), Some("1234"));
        assert_eq!(profile.name.as_deref(), Some("@habuma"));
        assert!(profile.email.is_none());
        assert!(conn.test().await);
    }
}
