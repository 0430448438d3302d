use crate::config::UpstreamConfig;
use crate::error::{AnidexError, Upstream};
use crate::types::community::{
    AiRecommendRequest, AnimeVote, InsertOutcome, ListEntry, MessageReply, NewComment, NewTopic,
    NewsItem, Topic, UserRecord, VoteCast, VotedAnime,
};
use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Which per-user list an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Wishlist,
    Watchlist,
}

impl ListKind {
    fn path(&self) -> &'static str {
        match self {
            ListKind::Wishlist => "wishList",
            ListKind::Watchlist => "watchList",
        }
    }
}

/// Application backend caller: thin typed wrappers over its REST resources.
#[derive(Clone)]
pub struct BackendApi {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendApi {
    pub fn new(client: reqwest::Client, upstream: &UpstreamConfig) -> Self {
        Self {
            client,
            base_url: upstream.backend_base_url.clone(),
        }
    }

    pub async fn get_user(&self, uid: &str) -> Result<UserRecord, AnidexError> {
        self.get_json(&format!("users/{}", encode(uid))).await
    }

    pub async fn create_user(&self, user: &UserRecord) -> Result<Value, AnidexError> {
        self.send_json(Method::POST, "users", user).await
    }

    pub async fn list_entries(&self, kind: ListKind, email: &str) -> Result<Vec<ListEntry>, AnidexError> {
        self.get_json(&format!("{}/{}", kind.path(), encode(email)))
            .await
    }

    pub async fn add_entry(&self, kind: ListKind, entry: &ListEntry) -> Result<InsertOutcome, AnidexError> {
        self.send_json(Method::POST, kind.path(), entry).await
    }

    pub async fn delete_entry(&self, kind: ListKind, id: &str) -> Result<Value, AnidexError> {
        self.delete(&format!("{}/{}", kind.path(), encode(id))).await
    }

    pub async fn vote_anime(&self, vote: &AnimeVote) -> Result<MessageReply, AnidexError> {
        self.send_json(Method::POST, "vote", vote).await
    }

    pub async fn top_voted(&self) -> Result<Vec<VotedAnime>, AnidexError> {
        self.get_json("top-voted").await
    }

    pub async fn community_vote(&self, vote: &AnimeVote) -> Result<MessageReply, AnidexError> {
        self.send_json(Method::POST, "community/vote", vote).await
    }

    pub async fn topics(&self) -> Result<Vec<Topic>, AnidexError> {
        self.get_json("api/topics").await
    }

    pub async fn topic(&self, id: &str) -> Result<Topic, AnidexError> {
        self.get_json(&format!("api/topics/{}", encode(id))).await
    }

    pub async fn create_topic(&self, topic: &NewTopic) -> Result<Value, AnidexError> {
        self.send_json(Method::POST, "api/topics", topic).await
    }

    pub async fn vote_topic(&self, id: &str, cast: &VoteCast) -> Result<Value, AnidexError> {
        self.send_json(Method::POST, &format!("api/topics/{}/vote", encode(id)), cast)
            .await
    }

    pub async fn add_comment(&self, topic_id: &str, comment: &NewComment) -> Result<Value, AnidexError> {
        self.send_json(
            Method::POST,
            &format!("api/topics/{}/comments", encode(topic_id)),
            comment,
        )
        .await
    }

    pub async fn vote_comment(&self, id: &str, cast: &VoteCast) -> Result<Value, AnidexError> {
        self.send_json(Method::POST, &format!("api/comments/{}/vote", encode(id)), cast)
            .await
    }

    pub async fn ai_recommend(&self, query: &str) -> Result<Vec<Value>, AnidexError> {
        let body = AiRecommendRequest {
            query: query.to_string(),
        };
        let reply: Value = self.send_json(Method::POST, "ai-recommend", &body).await?;
        // anything but an array counts as "no match"
        Ok(match reply {
            Value::Array(items) => items,
            _ => Vec::new(),
        })
    }

    pub async fn news(&self) -> Result<Vec<NewsItem>, AnidexError> {
        self.get_json("api/news").await
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, AnidexError>
    where
        T: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        debug!(url = %url, "GET backend");
        let resp = self.client.get(url).send().await?;
        Self::decode(resp).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, AnidexError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        debug!(url = %url, %method, "backend request");
        let resp = self.client.request(method, url).json(body).send().await?;
        Self::decode(resp).await
    }

    async fn delete(&self, path: &str) -> Result<Value, AnidexError> {
        let url = self.base_url.join(path)?;
        debug!(url = %url, "DELETE backend");
        let resp = self.client.delete(url).send().await?;
        Self::decode(resp).await
    }

    async fn decode<T>(resp: reqwest::Response) -> Result<T, AnidexError>
    where
        T: DeserializeOwned,
    {
        let status = resp.status();
        if !status.is_success() {
            return Err(AnidexError::UpstreamStatus {
                service: Upstream::Backend,
                status,
            });
        }
        let bytes = resp.bytes().await?;
        // some endpoints answer with an empty body
        if bytes.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
