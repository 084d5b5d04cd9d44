use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use fitlog_core::models::{
    ChatConversation, DiaryEntry, FoodItem, Identity, MacroTargets, UserProfile, WeightEntry,
    WorkoutSession,
};
use fitlog_core::sync::{RemoteChange, RemoteStore, Subscription};

use crate::config::Config;

/// How often the live-update channel polls each collection for changes.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Emit the local-only warning once per process.
pub fn warn_local_only() {
    static WARNED: OnceLock<()> = OnceLock::new();
    WARNED.get_or_init(|| {
        log::warn!(
            "Remote sync is not configured. Set FITLOG_REMOTE_URL or run `fitlog sync configure --url <url>`. Continuing in local-only mode."
        );
    });
}

/// Client for the fitlog sync backend. Collections are fetched whole and
/// filtered by owner on this side; no server-side query scoping is assumed.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRemoteStore {
    /// `None` when no backend URL is configured.
    #[must_use]
    pub fn from_config(config: &Config) -> Option<Self> {
        let base_url = config.remote_url()?;
        Some(Self::new(&base_url, config.remote_api_key()))
    }

    #[must_use]
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("fitlog-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        HttpRemoteStore {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    // --- Identity gate ---

    pub async fn signup(&self, email: &str, password: &str) -> Result<Identity> {
        self.auth("/auth/signup", email, password).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        self.auth("/auth/login", email, password).await
    }

    async fn auth(&self, path: &str, email: &str, password: &str) -> Result<Identity> {
        let resp = self
            .request(reqwest::Method::POST, path)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Failed to reach sync backend")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body["error"].as_str().unwrap_or("authentication failed");
            bail!("{message} (HTTP {status})");
        }

        resp.json().await.context("Failed to parse identity response")
    }

    // --- Document operations ---

    async fn get_all(&self, collection: &str) -> Result<Vec<serde_json::Value>> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/api/{collection}"))
            .send()
            .await
            .context("Failed to reach sync backend")?
            .error_for_status()
            .with_context(|| format!("Failed to list {collection}"))?;
        resp.json()
            .await
            .with_context(|| format!("Failed to parse {collection} listing"))
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/api/{collection}/{id}"))
            .send()
            .await
            .context("Failed to reach sync backend")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp
            .error_for_status()
            .with_context(|| format!("Failed to fetch {collection}/{id}"))?;
        Ok(Some(resp.json().await.with_context(|| {
            format!("Failed to parse {collection}/{id}")
        })?))
    }

    async fn put_doc(&self, collection: &str, id: &str, body: &serde_json::Value) -> Result<()> {
        self.request(reqwest::Method::PUT, &format!("/api/{collection}/{id}"))
            .json(body)
            .send()
            .await
            .context("Failed to reach sync backend")?
            .error_for_status()
            .with_context(|| format!("Failed to store {collection}/{id}"))?;
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<()> {
        self.request(reqwest::Method::DELETE, &format!("/api/{collection}/{id}"))
            .send()
            .await
            .context("Failed to reach sync backend")?
            .error_for_status()
            .with_context(|| format!("Failed to delete {collection}/{id}"))?;
        Ok(())
    }

    async fn load_list<T: DeserializeOwned>(
        &self,
        collection: &str,
        user_id: &str,
    ) -> Result<Vec<T>> {
        let docs = self.get_all(collection).await?;
        docs.into_iter()
            .filter(|doc| doc["user_id"].as_str() == Some(user_id))
            .map(|doc| {
                serde_json::from_value(doc)
                    .with_context(|| format!("Malformed {collection} document"))
            })
            .collect()
    }

    async fn load_singleton<T: DeserializeOwned>(
        &self,
        collection: &str,
        user_id: &str,
    ) -> Result<Option<T>> {
        match self.get_one(collection, user_id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc).with_context(|| {
                format!("Malformed {collection} document")
            })?)),
            None => Ok(None),
        }
    }

    async fn push_singleton<T: Serialize>(
        &self,
        collection: &str,
        user_id: &str,
        value: Option<&T>,
    ) -> Result<()> {
        match value {
            Some(value) => {
                let body = tag_owner(serde_json::to_value(value)?, user_id)?;
                self.put_doc(collection, user_id, &body).await
            }
            None => self.delete_doc(collection, user_id).await,
        }
    }

    /// Delete remote documents whose id is no longer present locally, then
    /// upsert every local record.
    async fn replace_collection(
        &self,
        collection: &str,
        user_id: &str,
        entries: Vec<(String, serde_json::Value)>,
    ) -> Result<()> {
        let remote = self.get_all(collection).await?;
        let local_ids: HashSet<&str> = entries.iter().map(|(id, _)| id.as_str()).collect();

        for doc in &remote {
            if doc["user_id"].as_str() != Some(user_id) {
                continue;
            }
            if let Some(id) = doc["id"].as_str() {
                if !local_ids.contains(id) {
                    self.delete_doc(collection, id).await?;
                }
            }
        }

        for (id, body) in entries {
            self.put_doc(collection, &id, &body).await?;
        }

        Ok(())
    }
}

fn tag_owner(value: serde_json::Value, user_id: &str) -> Result<serde_json::Value> {
    let mut value = value;
    match value.as_object_mut() {
        Some(map) => {
            map.insert(
                "user_id".to_string(),
                serde_json::Value::String(user_id.to_string()),
            );
            Ok(value)
        }
        None => bail!("Document body must be a JSON object"),
    }
}

fn tagged_entries<T: Serialize>(
    entries: &[T],
    ids: impl Iterator<Item = String>,
    user_id: &str,
) -> Result<Vec<(String, serde_json::Value)>> {
    entries
        .iter()
        .zip(ids)
        .map(|(entry, id)| Ok((id, tag_owner(serde_json::to_value(entry)?, user_id)?)))
        .collect()
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.load_singleton("profile", user_id).await
    }

    async fn load_targets(&self, user_id: &str) -> Result<Option<MacroTargets>> {
        self.load_singleton("targets", user_id).await
    }

    async fn load_weights(&self, user_id: &str) -> Result<Vec<WeightEntry>> {
        self.load_list("weights", user_id).await
    }

    async fn load_foods(&self, user_id: &str) -> Result<Vec<FoodItem>> {
        self.load_list("foods", user_id).await
    }

    async fn load_diary(&self, user_id: &str) -> Result<Vec<DiaryEntry>> {
        self.load_list("diary", user_id).await
    }

    async fn load_workouts(&self, user_id: &str) -> Result<Vec<WorkoutSession>> {
        self.load_list("workouts", user_id).await
    }

    async fn push_profile(&self, user_id: &str, profile: Option<&UserProfile>) -> Result<()> {
        self.push_singleton("profile", user_id, profile).await
    }

    async fn push_targets(&self, user_id: &str, targets: Option<&MacroTargets>) -> Result<()> {
        self.push_singleton("targets", user_id, targets).await
    }

    async fn replace_weights(&self, user_id: &str, entries: &[WeightEntry]) -> Result<()> {
        let tagged = tagged_entries(entries, entries.iter().map(|e| e.id.clone()), user_id)?;
        self.replace_collection("weights", user_id, tagged).await
    }

    async fn replace_foods(&self, user_id: &str, entries: &[FoodItem]) -> Result<()> {
        let tagged = tagged_entries(entries, entries.iter().map(|e| e.id.clone()), user_id)?;
        self.replace_collection("foods", user_id, tagged).await
    }

    async fn replace_diary(&self, user_id: &str, entries: &[DiaryEntry]) -> Result<()> {
        let tagged = tagged_entries(entries, entries.iter().map(|e| e.id.clone()), user_id)?;
        self.replace_collection("diary", user_id, tagged).await
    }

    async fn replace_workouts(&self, user_id: &str, entries: &[WorkoutSession]) -> Result<()> {
        let tagged = tagged_entries(entries, entries.iter().map(|e| e.id.clone()), user_id)?;
        self.replace_collection("workouts", user_id, tagged).await
    }

    async fn load_conversation(&self, user_id: &str) -> Result<Option<ChatConversation>> {
        let docs = self.get_all("chat_conversations").await?;
        for doc in docs {
            if doc["user_id"].as_str() == Some(user_id) {
                return Ok(Some(
                    serde_json::from_value(doc).context("Malformed conversation document")?,
                ));
            }
        }
        Ok(None)
    }

    async fn save_conversation(
        &self,
        user_id: &str,
        conversation: &ChatConversation,
    ) -> Result<()> {
        // First-or-create: reuse the existing document id when this user
        // already has a conversation.
        let doc_id = self
            .load_conversation(user_id)
            .await?
            .map_or_else(|| conversation.id.clone(), |existing| existing.id);
        let body = tag_owner(serde_json::to_value(conversation)?, user_id)?;
        self.put_doc("chat_conversations", &doc_id, &body).await
    }

    fn subscribe(&self, user_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(32);
        let this = self.clone();
        let user_id = user_id.to_string();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut seen: [Option<String>; 6] = Default::default();

            loop {
                interval.tick().await;

                // Remote I/O failures skip the cycle; the next tick retries.
                let changes = [
                    poll(&mut seen[0], this.load_profile(&user_id).await, RemoteChange::Profile),
                    poll(&mut seen[1], this.load_targets(&user_id).await, RemoteChange::Targets),
                    poll(&mut seen[2], this.load_weights(&user_id).await, RemoteChange::Weights),
                    poll(&mut seen[3], this.load_foods(&user_id).await, RemoteChange::Foods),
                    poll(&mut seen[4], this.load_diary(&user_id).await, RemoteChange::Diary),
                    poll(&mut seen[5], this.load_workouts(&user_id).await, RemoteChange::Workouts),
                ];

                for change in changes.into_iter().flatten() {
                    if tx.send(change).await.is_err() {
                        return;
                    }
                }
            }
        });

        Subscription::with_task(rx, task)
    }
}

/// Turn a freshly polled collection into a change event when its serialized
/// form differs from the last delivered one.
fn poll<T: Serialize>(
    seen: &mut Option<String>,
    loaded: Result<T>,
    wrap: impl FnOnce(T) -> RemoteChange,
) -> Option<RemoteChange> {
    match loaded {
        Ok(value) => {
            let json = serde_json::to_string(&value).unwrap_or_default();
            if seen.as_deref() == Some(json.as_str()) {
                None
            } else {
                *seen = Some(json);
                Some(wrap(value))
            }
        }
        Err(e) => {
            log::debug!("Live-update poll failed: {e:#}");
            None
        }
    }
}
