//! REST adapter for the hosted sync backend.
//!
//! All routes hang off `{base}/v1/projects/{project_id}/clients/{client_id}`:
//!
//! | Method | Path                          | Body / response                      |
//! |--------|-------------------------------|--------------------------------------|
//! | GET    | `/profile`                    | profile object, `404` when absent    |
//! | PUT    | `/profile`                    | fields + `"last_updated": "server"`  |
//! | POST   | `/history`                    | [`NewRemoteEntry`] → `{"id": "…"}`   |
//! | GET    | `/history?limit=N&order=desc` | `{"entries": [RemoteEntry, …]}`      |
//!
//! Requests authenticate with the credential's API key as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use cachesync_config::RemoteCredentials;
use cachesync_store::{ClientId, LAST_UPDATED, ProfileRecord, RemoteId, is_reserved_key};

use crate::{NewRemoteEntry, RemoteEntry, RemoteError, RemoteStore, RemoteTimestamp};

#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: Url,
    project_id: String,
    api_key: String,
}

/// PUT body: the record's fields with `last_updated` replaced by the
/// server-timestamp marker.
fn profile_write_body(record: &ProfileRecord) -> Map<String, Value> {
    let mut body: Map<String, Value> = record
        .fields
        .iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    body.insert(
        LAST_UPDATED.to_string(),
        serde_json::to_value(RemoteTimestamp::Server).unwrap_or(Value::Null),
    );
    body
}

#[derive(Deserialize)]
struct AppendResponse {
    id: RemoteId,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    entries: Vec<RemoteEntry>,
}

impl HttpRemote {
    /// Build an adapter from validated credentials.  The credentials'
    /// own `base_url` wins over `default_base_url`.
    pub fn new(
        credentials: &RemoteCredentials,
        default_base_url: &str,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let raw_base = credentials.base_url.as_deref().unwrap_or(default_base_url);
        let base_url = Url::parse(raw_base)
            .map_err(|err| RemoteError::Decode(format!("invalid base url `{raw_base}`: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Decode(format!("`{raw_base}` cannot be used as a base url")));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            project_id: credentials.project_id.clone(),
            api_key: credentials.api_key.clone(),
        })
    }

    /// URL for `resource` under the client's route, with every segment
    /// percent-encoded.
    pub fn endpoint(&self, client: &ClientId, resource: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "clients",
                client.as_str(),
                resource,
            ]);
        }
        url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn get_profile(&self, client: &ClientId) -> Result<Option<ProfileRecord>, RemoteError> {
        let response = self
            .client
            .get(self.endpoint(client, "profile"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = Self::check(response).await?.json().await?;
        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|err| RemoteError::Decode(format!("profile: {err}")))
    }

    async fn put_profile(&self, client: &ClientId, record: &ProfileRecord) -> Result<(), RemoteError> {
        let body = profile_write_body(record);
        let response = self
            .client
            .put(self.endpoint(client, "profile"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn append_history(
        &self,
        client: &ClientId,
        entry: NewRemoteEntry,
    ) -> Result<RemoteId, RemoteError> {
        let response = self
            .client
            .post(self.endpoint(client, "history"))
            .bearer_auth(&self.api_key)
            .json(&entry)
            .send()
            .await?;
        let created: AppendResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|err| RemoteError::Decode(format!("append response: {err}")))?;
        Ok(created.id)
    }

    async fn list_recent_history(
        &self,
        client: &ClientId,
        limit: usize,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        let mut url = self.endpoint(client, "history");
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("order", "desc");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let listed: ListResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|err| RemoteError::Decode(format!("history listing: {err}")))?;
        Ok(listed.entries)
    }
}
