//! Application backend records: users, list entries, votes, topics, comments, news.
//!
//! The backend speaks camelCase with Mongo-style `_id`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::jikan::Anime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(rename = "photoURL", default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Shared shape of wishlist and watchlist entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub anime_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListEntry {
    pub fn from_anime(anime: &Anime, user_email: &str, time: DateTime<Utc>) -> Self {
        Self {
            id: None,
            anime_id: anime.mal_id,
            title: anime.title.clone(),
            image: anime.image_url().map(str::to_string),
            rating: anime.score,
            episodes: anime.episodes,
            user_email: user_email.to_string(),
            time: Some(time),
            extra: Map::new(),
        }
    }

    /// Copy for the other list: no backend id, fresh timestamp.
    pub fn moved(&self, time: DateTime<Utc>) -> Self {
        Self {
            id: None,
            time: Some(time),
            extra: Map::new(),
            ..self.clone()
        }
    }
}

/// Backend reply to an insert. A missing `insertedId` means nothing was stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    #[serde(default)]
    pub inserted_id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InsertOutcome {
    pub fn inserted(&self) -> bool {
        self.inserted_id.as_ref().is_some_and(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeVote {
    pub anime_id: u64,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    pub user_email: String,
}

impl AnimeVote {
    pub fn from_anime(anime: &Anime, user_email: &str) -> Self {
        Self {
            anime_id: anime.mal_id,
            title: anime.title.clone(),
            image: anime.image_url().map(str::to_string),
            user_email: user_email.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const ALREADY_VOTED_MESSAGE: &str = "You already voted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Recorded,
    AlreadyVoted,
}

impl From<&MessageReply> for VoteOutcome {
    fn from(reply: &MessageReply) -> Self {
        match reply.message.as_deref() {
            Some(ALREADY_VOTED_MESSAGE) => VoteOutcome::AlreadyVoted,
            _ => VoteOutcome::Recorded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotedAnime {
    #[serde(default)]
    pub anime_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub votes: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCast {
    pub user_id: String,
    pub direction: VoteDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A topic as the discussion board shows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicView {
    #[serde(flatten)]
    pub topic: Topic,
    pub author: Option<String>,
    pub votes: i64,
}

impl From<Topic> for TopicView {
    fn from(topic: Topic) -> Self {
        Self {
            author: topic.author_id.clone(),
            votes: topic.upvotes - topic.downvotes,
            topic,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTopic {
    pub title: String,
    pub author_id: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    pub author_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub id: Option<Value>,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRecommendRequest {
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn topic_view_tallies_votes_and_keeps_fields() {
        let topic: Topic = serde_json::from_value(json!({
            "_id": "t1",
            "title": "Best opening?",
            "authorId": "a@b.c",
            "upvotes": 5,
            "downvotes": 2,
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(topic.comments.is_empty());

        let view = TopicView::from(topic);
        assert_eq!(view.votes, 3);
        assert_eq!(view.author.as_deref(), Some("a@b.c"));

        let out = serde_json::to_value(&view).unwrap();
        assert_eq!(out["_id"], "t1");
        assert_eq!(out["createdAt"], "2024-01-01T00:00:00Z");
        assert_eq!(out["votes"], 3);
    }

    #[test]
    fn vote_reply_detects_duplicate_votes() {
        let dup: MessageReply = serde_json::from_value(json!({"message": "You already voted"})).unwrap();
        assert_eq!(VoteOutcome::from(&dup), VoteOutcome::AlreadyVoted);
        let ok: MessageReply = serde_json::from_value(json!({"insertedId": "x"})).unwrap();
        assert_eq!(VoteOutcome::from(&ok), VoteOutcome::Recorded);
    }

    #[test]
    fn insert_outcome_requires_non_null_id() {
        let yes: InsertOutcome = serde_json::from_value(json!({"insertedId": "abc"})).unwrap();
        let no: InsertOutcome = serde_json::from_value(json!({"message": "exists"})).unwrap();
        let null: InsertOutcome = serde_json::from_value(json!({"insertedId": null})).unwrap();
        assert!(yes.inserted());
        assert!(!no.inserted());
        assert!(!null.inserted());
    }

    #[test]
    fn sparse_backend_records_still_decode() {
        let entries: Vec<ListEntry> = serde_json::from_value(json!([
            {"_id": "w1", "animeId": 5, "title": "Trigun", "userEmail": "a@b.c"},
            {"_id": "w2", "animeId": 6, "note": "legacy"}
        ]))
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].title.is_empty());
        assert_eq!(entries[1].extra["note"], "legacy");

        let voted: Vec<VotedAnime> = serde_json::from_value(json!([{"votes": 3}])).unwrap();
        assert_eq!(voted[0].votes, 3);
    }

    #[test]
    fn list_entry_serializes_camel_case_without_id() {
        let entry: ListEntry = serde_json::from_value(json!({
            "_id": "w1",
            "animeId": 20,
            "title": "Naruto",
            "userEmail": "a@b.c",
            "rating": 8.0
        }))
        .unwrap();
        let moved = entry.moved(Utc::now());
        let out = serde_json::to_value(&moved).unwrap();
        assert!(out.get("_id").is_none());
        assert_eq!(out["animeId"], 20);
        assert_eq!(out["userEmail"], "a@b.c");
    }
}
