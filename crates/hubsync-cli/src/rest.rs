//! [`ContentHub`] over the hub's REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_config::HubProfile;
use hubsync_core::{
    ContentHub, Edition, Event, HubError, HubErrorItem, HubResult, NewSnapshot, ResourceKind,
    Slot, Snapshot,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const PAGE_SIZE: u32 = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    page: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    number: u32,
    total_pages: u32,
}

impl PageInfo {
    fn has_next(&self) -> bool {
        self.number + 1 < self.total_pages
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<HubErrorItem>,
}

/// Map a non-success response onto a [`HubError`].
pub fn decode_error(status: u16, body: &str, kind: ResourceKind, id: &str) -> HubError {
    if status == 404 {
        return HubError::not_found(kind, id);
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if !parsed.errors.is_empty() {
            return HubError::Rejected {
                status,
                errors: parsed.errors,
            };
        }
    }
    HubError::Http {
        status,
        body: body.chars().take(500).collect(),
    }
}

#[derive(Clone)]
pub struct RestHub {
    hub_id: String,
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl RestHub {
    pub fn new(profile: &HubProfile) -> HubResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("hubsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HubError::Transport(e.to_string()))?;

        Ok(Self {
            hub_id: profile.hub_id.clone(),
            base_url: profile.base_url.trim_end_matches('/').to_string(),
            token: profile.token.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn checked(
        &self,
        builder: RequestBuilder,
        kind: ResourceKind,
        id: &str,
    ) -> HubResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| HubError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(decode_error(status.as_u16(), &body, kind, id))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        kind: ResourceKind,
        id: &str,
    ) -> HubResult<T> {
        self.checked(builder, kind, id)
            .await?
            .json::<T>()
            .await
            .map_err(|e| HubError::Decode(e.to_string()))
    }

    /// Fetch every page of a list endpoint.
    async fn list_all<T: DeserializeOwned>(&self, path: &str, kind: ResourceKind) -> HubResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 0u32;
        loop {
            let builder = self
                .request(Method::GET, path)
                .query(&[("page", page), ("size", PAGE_SIZE)]);
            let body: Page<T> = self.send(builder, kind, path).await?;
            let fetched = body.data.len();
            items.extend(body.data);

            let more = body.page.as_ref().is_some_and(PageInfo::has_next);
            if !more || fetched == 0 {
                break;
            }
            page += 1;
        }
        debug!("Listed {} {}(s) from {}", items.len(), kind, path);
        Ok(items)
    }
}

#[async_trait]
impl ContentHub for RestHub {
    fn hub_id(&self) -> &str {
        &self.hub_id
    }

    async fn list_events(&self) -> HubResult<Vec<Event>> {
        self.list_all(&format!("hubs/{}/events", self.hub_id), ResourceKind::Event)
            .await
    }

    async fn get_event(&self, id: &str) -> HubResult<Event> {
        let builder = self.request(Method::GET, &format!("events/{}", id));
        self.send(builder, ResourceKind::Event, id).await
    }

    async fn create_event(&self, event: &Event) -> HubResult<Event> {
        let builder = self
            .request(Method::POST, &format!("hubs/{}/events", self.hub_id))
            .json(event);
        self.send(builder, ResourceKind::Event, &event.name).await
    }

    async fn update_event(&self, event: &Event) -> HubResult<Event> {
        let builder = self
            .request(Method::PATCH, &format!("events/{}", event.id))
            .json(event);
        self.send(builder, ResourceKind::Event, &event.id).await
    }

    async fn list_editions(&self, event_id: &str) -> HubResult<Vec<Edition>> {
        self.list_all(&format!("events/{}/editions", event_id), ResourceKind::Edition)
            .await
    }

    async fn get_edition(&self, id: &str) -> HubResult<Edition> {
        let builder = self.request(Method::GET, &format!("editions/{}", id));
        self.send(builder, ResourceKind::Edition, id).await
    }

    async fn create_edition(&self, event_id: &str, edition: &Edition) -> HubResult<Edition> {
        let builder = self
            .request(Method::POST, &format!("events/{}/editions", event_id))
            .json(edition);
        self.send(builder, ResourceKind::Event, event_id).await
    }

    async fn update_edition(&self, edition: &Edition) -> HubResult<Edition> {
        let builder = self
            .request(Method::PATCH, &format!("editions/{}", edition.id))
            .json(edition);
        self.send(builder, ResourceKind::Edition, &edition.id).await
    }

    async fn schedule_edition(
        &self,
        id: &str,
        ignore_warnings: bool,
        last_modified_date: Option<DateTime<Utc>>,
    ) -> HubResult<()> {
        let builder = self
            .request(Method::POST, &format!("editions/{}/schedule", id))
            .query(&[("ignoreWarnings", ignore_warnings)])
            .json(&json!({ "lastModifiedDate": last_modified_date }));
        self.checked(builder, ResourceKind::Edition, id).await?;
        Ok(())
    }

    async fn unschedule_edition(&self, id: &str) -> HubResult<()> {
        let builder = self.request(Method::DELETE, &format!("editions/{}/schedule", id));
        self.checked(builder, ResourceKind::Edition, id).await?;
        Ok(())
    }

    async fn list_slots(&self, edition_id: &str) -> HubResult<Vec<Slot>> {
        self.list_all(&format!("editions/{}/slots", edition_id), ResourceKind::Slot)
            .await
    }

    async fn get_slot(&self, edition_id: &str, slot_id: &str) -> HubResult<Slot> {
        let builder = self.request(
            Method::GET,
            &format!("editions/{}/slots/{}", edition_id, slot_id),
        );
        self.send(builder, ResourceKind::Slot, slot_id).await
    }

    async fn create_slot(&self, edition_id: &str, content_item_id: &str) -> HubResult<Slot> {
        let builder = self
            .request(Method::POST, &format!("editions/{}/slots", edition_id))
            .json(&json!({ "contentItemId": content_item_id }));
        self.send(builder, ResourceKind::Edition, edition_id).await
    }

    async fn update_slot(&self, edition_id: &str, slot: &Slot) -> HubResult<Slot> {
        let builder = self
            .request(
                Method::PUT,
                &format!("editions/{}/slots/{}", edition_id, slot.id),
            )
            .json(&json!({ "content": slot.content }));
        self.send(builder, ResourceKind::Slot, &slot.id).await
    }

    async fn get_snapshot(&self, id: &str) -> HubResult<Snapshot> {
        let builder = self.request(Method::GET, &format!("snapshots/{}", id));
        self.send(builder, ResourceKind::Snapshot, id).await
    }

    async fn create_snapshot(&self, snapshot: &NewSnapshot) -> HubResult<Snapshot> {
        let builder = self
            .request(Method::POST, &format!("hubs/{}/snapshots", self.hub_id))
            .json(snapshot);
        self.send(builder, ResourceKind::ContentItem, &snapshot.content_root)
            .await
    }

    async fn get_content_item(&self, id: &str) -> HubResult<Value> {
        let builder = self.request(Method::GET, &format!("content-items/{}", id));
        self.send(builder, ResourceKind::ContentItem, id).await
    }
}
