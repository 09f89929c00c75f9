//! Matrix client-server API client
//!
//! Thin HTTP wrapper over the handful of endpoints role sync needs.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client, RequestBuilder, Response,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ChatClient, SyncResponse};
use crate::config::HomeserverConfig;
use crate::models::{EventId, MembershipEvent, RawEvent, RoomEvent, RoomId, UserId};
use crate::{Error, Result};

/// RFC 3986 unreserved characters stay as-is, everything else in a path segment is escaped
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const API_PREFIX: &str = "/_matrix/client/v3";

/// Standard Matrix error body
#[derive(Debug, Deserialize)]
struct MatrixErrorBody {
    errcode: String,
    #[serde(default)]
    error: String,
}

#[derive(Debug, Deserialize)]
struct WhoAmI {
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    #[serde(default)]
    chunk: Vec<RawEvent>,
}

/// Matrix HTTP client acting as a single user
pub struct MatrixClient {
    client: Client,
    base_url: String,
    user_id: UserId,
}

impl MatrixClient {
    /// Build a client and resolve the identity behind the access token
    pub async fn connect(config: &HomeserverConfig) -> Result<Self> {
        let client = Self::build_http(config)?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let url = format!("{base_url}{API_PREFIX}/account/whoami");
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("whoami request failed: {e}")))?;
        let whoami: WhoAmI = check(response)
            .await
            .map_err(|e| Error::Fetch(format!("whoami: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("whoami: invalid response: {e}")))?;

        tracing::info!(user_id = %whoami.user_id, "Authenticated with homeserver");

        Ok(Self {
            client,
            base_url,
            user_id: whoami.user_id,
        })
    }

    /// Build a client for a known identity without contacting the homeserver
    pub fn with_identity(config: &HomeserverConfig, user_id: UserId) -> Result<Self> {
        Ok(Self {
            client: Self::build_http(config)?,
            base_url: config.url.trim_end_matches('/').to_string(),
            user_id,
        })
    }

    fn build_http(config: &HomeserverConfig) -> Result<Client> {
        let mut token = HeaderValue::from_str(&format!("Bearer {}", config.access_token))
            .map_err(|e| Error::Config(format!("invalid access token: {e}")))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))
    }

    /// Base URL of the homeserver
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint URL under the client-server prefix; each segment is percent-encoded
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = format!("{}{API_PREFIX}", self.base_url);
        for segment in segments {
            url.push('/');
            url.extend(utf8_percent_encode(segment, PATH_SEGMENT));
        }
        url
    }

    fn room_endpoint(&self, room_id: &RoomId, rest: &[&str]) -> String {
        let mut segments = vec!["rooms", room_id.as_str()];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    /// One `/sync` long-poll. `since` is `None` for the initial sync.
    pub async fn sync(&self, since: Option<&str>, timeout_ms: u64) -> Result<SyncResponse> {
        let mut request = self.client.get(self.endpoint(&["sync"]));
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }
        let request = request
            .query(&[("timeout", timeout_ms)])
            // Leave headroom above the server-side long-poll
            .timeout(Duration::from_millis(timeout_ms) + Duration::from_secs(30));

        let response = fetch(request, "sync").await?;
        response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("sync: invalid response: {e}")))
    }
}

impl std::fmt::Debug for MatrixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixClient")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Turn a non-2xx response into a readable error message
async fn check(response: Response) -> std::result::Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<MatrixErrorBody>().await {
        Ok(body) => Err(format!("{status}: {} {}", body.errcode, body.error)),
        Err(_) => Err(status.to_string()),
    }
}

async fn fetch(request: RequestBuilder, what: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::Fetch(format!("{what}: {e}")))?;
    check(response)
        .await
        .map_err(|e| Error::Fetch(format!("{what}: {e}")))
}

async fn send(request: RequestBuilder, what: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::Send(format!("{what}: {e}")))?;
    check(response)
        .await
        .map_err(|e| Error::Send(format!("{what}: {e}")))
}

#[async_trait]
impl ChatClient for MatrixClient {
    async fn get_state_event(
        &self,
        room_id: &RoomId,
        event_type: &str,
        state_key: &str,
    ) -> Result<Value> {
        let url = self.room_endpoint(room_id, &["state", event_type, state_key]);
        let response = fetch(self.client.get(url), event_type).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("{event_type}: invalid response: {e}")))
    }

    async fn send_state_event(
        &self,
        room_id: &RoomId,
        event_type: &str,
        state_key: &str,
        content: &Value,
    ) -> Result<()> {
        let url = self.room_endpoint(room_id, &["state", event_type, state_key]);
        send(self.client.put(url).json(content), event_type).await?;
        tracing::debug!(room_id = %room_id, event_type, "State event sent");
        Ok(())
    }

    async fn get_members(&self, room_id: &RoomId) -> Result<Vec<MembershipEvent>> {
        let request = self
            .client
            .get(self.room_endpoint(room_id, &["members"]))
            .query(&[("not_membership", "leave")]);
        let response: MembersResponse = fetch(request, "members")
            .await?
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("members: invalid response: {e}")))?;

        let mut members = Vec::with_capacity(response.chunk.len());
        for raw in response.chunk {
            if let Some(RoomEvent::Membership(member)) = raw.into_room_event(room_id)? {
                members.push(member);
            }
        }
        Ok(members)
    }

    async fn mark_read(&self, room_id: &RoomId, event_id: &EventId) -> Result<()> {
        let url = self.room_endpoint(room_id, &["receipt", "m.read", event_id.as_str()]);
        send(self.client.post(url).json(&json!({})), "receipt").await?;
        Ok(())
    }

    async fn send_notice(&self, room_id: &RoomId, body: &str) -> Result<()> {
        let txn_id = nanoid::nanoid!();
        let url = self.room_endpoint(room_id, &["send", "m.room.message", &txn_id]);
        let content = json!({"msgtype": "m.notice", "body": body});
        send(self.client.put(url).json(&content), "notice").await?;
        Ok(())
    }

    fn self_identity(&self) -> &UserId {
        &self.user_id
    }
}
