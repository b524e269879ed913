//! Remote multi-device session store reached over HTTP.
//!
//! The remote store is strictly best-effort: callers treat every failure as
//! non-fatal and rely on the local durable store for recovery.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable holding the remote store base URL.
pub const REMOTE_URL_ENV: &str = "MALA_REMOTE_URL";

/// Environment variable holding the remote store API key.
pub const REMOTE_API_KEY_ENV: &str = "MALA_REMOTE_API_KEY";

/// Logical table holding one row per `(user_id, date)`.
const SESSIONS_TABLE_PATH: &str = "rest/v1/japa_sessions";

/// Boxed async result used by [`RemoteStore`] trait methods.
pub type RemoteFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// One per-day row as stored remotely for a user.
///
/// Counts default to zero so a sparse remote row never aborts a load.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RemoteSessionRow {
    pub date: String,
    #[serde(default)]
    pub taps: i64,
    #[serde(default)]
    pub japs: i64,
}

/// Async remote session store boundary used by the session repository.
///
/// Production uses [`HttpRemoteStore`] (or [`OfflineRemoteStore`] when no
/// endpoint is configured), while tests inject `MockRemoteStore` to force
/// remote failures without network flakiness.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteStore: Send + Sync {
    /// Loads every per-day row owned by `user_id`, unordered.
    ///
    /// # Errors
    /// Returns an error when the store is unreachable, the caller is not
    /// authenticated, or the response cannot be decoded.
    fn load_sessions(&self, user_id: String) -> RemoteFuture<Result<Vec<RemoteSessionRow>, String>>;

    /// Upserts one row keyed by `(user_id, date)`.
    ///
    /// A conflicting row is replaced wholesale (last write wins, no merge).
    ///
    /// # Errors
    /// Returns an error when the store is unreachable or rejects the write.
    fn upsert_session(&self, user_id: String, row: RemoteSessionRow)
    -> RemoteFuture<Result<(), String>>;
}

#[derive(Serialize)]
struct UpsertPayload {
    user_id: String,
    date: String,
    taps: i64,
    japs: i64,
}

/// Remote session store speaking a PostgREST-style row API.
#[derive(Clone)]
pub struct HttpRemoteStore {
    api_key: Option<String>,
    base_url: Url,
    client: Client,
}

impl HttpRemoteStore {
    /// Creates a remote store with explicit configuration.
    ///
    /// # Errors
    /// Returns an error when `base_url` is not a valid URL.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, String> {
        let base_url =
            Url::parse(base_url).map_err(|err| format!("Invalid remote store URL: {err}"))?;

        Ok(Self {
            api_key,
            base_url,
            client: Client::new(),
        })
    }

    /// Loads configuration from `MALA_REMOTE_URL` and `MALA_REMOTE_API_KEY`.
    ///
    /// # Errors
    /// Returns an error when no remote URL is configured or it is invalid.
    pub fn try_from_env() -> Result<Self, String> {
        let Ok(base_url) = std::env::var(REMOTE_URL_ENV) else {
            return Err(format!("No remote store configured ({REMOTE_URL_ENV} is unset)"));
        };
        let api_key = std::env::var(REMOTE_API_KEY_ENV).ok();

        tracing::info!(
            url = %base_url,
            api_key = if api_key.is_some() { "present" } else { "none" },
            "remote session store configured"
        );

        Self::new(&base_url, api_key)
    }

    fn sessions_url(&self) -> Result<Url, String> {
        self.base_url
            .join(SESSIONS_TABLE_PATH)
            .map_err(|err| format!("Failed to build sessions URL: {err}"))
    }

    fn load_url(&self, user_id: &str) -> Result<Url, String> {
        let mut url = self.sessions_url()?;
        url.query_pairs_mut()
            .append_pair("select", "date,taps,japs")
            .append_pair("user_id", &format!("eq.{user_id}"));

        Ok(url)
    }

    fn upsert_url(&self) -> Result<Url, String> {
        let mut url = self.sessions_url()?;
        url.query_pairs_mut()
            .append_pair("on_conflict", "user_id,date");

        Ok(url)
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            request
                .header("apikey", api_key)
                .header("Authorization", format!("Bearer {api_key}"))
        } else {
            request
        }
    }

    async fn load_sessions_inner(&self, user_id: &str) -> Result<Vec<RemoteSessionRow>, String> {
        let url = self.load_url(user_id)?;

        let response = self
            .auth_request(self.client.get(url))
            .send()
            .await
            .map_err(|err| format!("Failed to reach remote session store: {err}"))?
            .error_for_status()
            .map_err(|err| format!("Remote session load rejected: {err}"))?;

        response
            .json::<Vec<RemoteSessionRow>>()
            .await
            .map_err(|err| format!("Failed to decode remote session rows: {err}"))
    }

    async fn upsert_session_inner(
        &self,
        user_id: &str,
        row: RemoteSessionRow,
    ) -> Result<(), String> {
        let url = self.upsert_url()?;
        let payload = UpsertPayload {
            user_id: user_id.to_string(),
            date: row.date,
            taps: row.taps,
            japs: row.japs,
        };

        self.auth_request(self.client.post(url))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[payload])
            .send()
            .await
            .map_err(|err| format!("Failed to reach remote session store: {err}"))?
            .error_for_status()
            .map_err(|err| format!("Remote session upsert rejected: {err}"))?;

        Ok(())
    }
}

impl RemoteStore for HttpRemoteStore {
    fn load_sessions(&self, user_id: String) -> RemoteFuture<Result<Vec<RemoteSessionRow>, String>> {
        let store = self.clone();
        Box::pin(async move { store.load_sessions_inner(&user_id).await })
    }

    fn upsert_session(
        &self,
        user_id: String,
        row: RemoteSessionRow,
    ) -> RemoteFuture<Result<(), String>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_session_inner(&user_id, row).await })
    }
}

/// Stand-in remote store used when no endpoint is configured.
///
/// Every operation fails, which the repository treats the same way as an
/// unreachable network: local persistence still succeeds.
pub struct OfflineRemoteStore;

impl RemoteStore for OfflineRemoteStore {
    fn load_sessions(
        &self,
        _user_id: String,
    ) -> RemoteFuture<Result<Vec<RemoteSessionRow>, String>> {
        Box::pin(async { Err("Remote session store is not configured".to_string()) })
    }

    fn upsert_session(
        &self,
        _user_id: String,
        _row: RemoteSessionRow,
    ) -> RemoteFuture<Result<(), String>> {
        Box::pin(async { Err("Remote session store is not configured".to_string()) })
    }
}
