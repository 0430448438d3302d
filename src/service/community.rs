use crate::api::{BackendApi, JikanApi};
use crate::error::AnidexError;
use crate::types::community::{
    AnimeVote, MessageReply, NewComment, NewTopic, NewsItem, TopicView, VoteCast, VoteDirection,
    VoteOutcome, VotedAnime,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsFeed {
    pub items: Vec<NewsItem>,
    /// True when the backend failed and the placeholder list was served.
    pub fallback: bool,
}

/// Votes, discussion board and news, all backed by the application backend.
#[derive(Clone)]
pub struct CommunityService {
    backend: BackendApi,
    jikan: JikanApi,
}

impl CommunityService {
    pub fn new(backend: BackendApi, jikan: JikanApi) -> Self {
        Self { backend, jikan }
    }

    pub async fn vote_anime(&self, anime_id: u64, email: &str) -> Result<VoteOutcome, AnidexError> {
        let anime = self.jikan.anime(anime_id).await?;
        let reply = self
            .backend
            .vote_anime(&AnimeVote::from_anime(&anime, email))
            .await?;
        let outcome = VoteOutcome::from(&reply);
        info!(anime_id, user = email, ?outcome, "anime vote");
        Ok(outcome)
    }

    pub async fn top_voted(&self) -> Result<Vec<VotedAnime>, AnidexError> {
        self.backend.top_voted().await
    }

    pub async fn community_vote(&self, vote: &AnimeVote) -> Result<MessageReply, AnidexError> {
        self.backend.community_vote(vote).await
    }

    pub async fn topics(&self) -> Result<Vec<TopicView>, AnidexError> {
        let topics = self.backend.topics().await?;
        Ok(topics.into_iter().map(TopicView::from).collect())
    }

    pub async fn topic(&self, id: &str) -> Result<TopicView, AnidexError> {
        Ok(self.backend.topic(id).await?.into())
    }

    pub async fn create_topic(&self, title: &str, author: &str) -> Result<Value, AnidexError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AnidexError::InvalidInput("topic title is empty".into()));
        }
        let topic = NewTopic {
            title: title.to_string(),
            author_id: author.to_string(),
            content: String::new(),
            tags: Vec::new(),
        };
        let created = self.backend.create_topic(&topic).await?;
        info!(author, title, "topic created");
        Ok(created)
    }

    pub async fn vote_topic(&self, id: &str, user: &str, direction: VoteDirection) -> Result<Value, AnidexError> {
        let cast = VoteCast {
            user_id: user.to_string(),
            direction,
        };
        self.backend.vote_topic(id, &cast).await
    }

    pub async fn add_comment(&self, topic_id: &str, content: &str, author: &str) -> Result<Value, AnidexError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AnidexError::InvalidInput("comment is empty".into()));
        }
        let comment = NewComment {
            content: content.to_string(),
            author_id: author.to_string(),
        };
        self.backend.add_comment(topic_id, &comment).await
    }

    pub async fn vote_comment(&self, id: &str, user: &str, direction: VoteDirection) -> Result<Value, AnidexError> {
        let cast = VoteCast {
            user_id: user.to_string(),
            direction,
        };
        self.backend.vote_comment(id, &cast).await
    }

    /// Never fails: a backend error yields the placeholder list.
    pub async fn news(&self) -> NewsFeed {
        match self.backend.news().await {
            Ok(items) => NewsFeed {
                items,
                fallback: false,
            },
            Err(e) => {
                warn!(error = %e, "news unavailable; serving placeholder");
                NewsFeed {
                    items: placeholder_news(),
                    fallback: true,
                }
            }
        }
    }
}

fn placeholder_news() -> Vec<NewsItem> {
    vec![NewsItem {
        id: Some(json!(1)),
        title: "Demon Slayer: Hashira Training Arc Anime Announced".to_string(),
        summary: Some(
            "Ufotable returns to animate the next arc of the hit series, premiering Spring 2024."
                .to_string(),
        ),
        date: Some(Utc::now().to_rfc3339()),
        source: Some("AnimeNewsNetwork".to_string()),
        url: Some("#".to_string()),
        image: Some(
            "https://via.placeholder.com/300x200/4a148c/ffffff?text=Demon+Slayer".to_string(),
        ),
        extra: Map::new(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RateLimitRetry;
    use crate::api::test_support::spawn_stub;
    use crate::config::UpstreamConfig;
    use axum::{
        Json, Router,
        extract::Path,
        http::StatusCode,
        routing::{get, post},
    };
    use std::time::Duration;

    async fn service(backend: Router) -> CommunityService {
        let jikan = Router::new().route(
            "/anime/{id}",
            get(|Path(id): Path<u64>| async move {
                Json(json!({"data": {"mal_id": id, "title": "Trigun"}}))
            }),
        );
        let upstream = UpstreamConfig {
            jikan_base_url: spawn_stub(jikan).await,
            backend_base_url: spawn_stub(backend).await,
            jikan_requests_per_second: 1000,
            ..Default::default()
        };
        let retry = RateLimitRetry {
            max_retries: 0,
            default_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let client = reqwest::Client::new();
        CommunityService::new(
            BackendApi::new(client.clone(), &upstream),
            JikanApi::new(client, &upstream, retry),
        )
    }

    #[tokio::test]
    async fn repeated_vote_reads_as_already_voted() {
        let backend = Router::new().route(
            "/vote",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["title"], "Trigun");
                if body["userEmail"] == "again@example.com" {
                    Json(json!({"message": "You already voted"}))
                } else {
                    Json(json!({"message": "Vote recorded"}))
                }
            }),
        );
        let svc = service(backend).await;
        assert_eq!(svc.vote_anime(6, "new@example.com").await.unwrap(), VoteOutcome::Recorded);
        assert_eq!(
            svc.vote_anime(6, "again@example.com").await.unwrap(),
            VoteOutcome::AlreadyVoted
        );
    }

    #[tokio::test]
    async fn topics_are_annotated_with_votes_and_author() {
        let backend = Router::new().route(
            "/api/topics",
            get(|| async {
                Json(json!([
                    {"_id": "a", "title": "Best villain", "authorId": "u1", "upvotes": 4, "downvotes": 1},
                    {"_id": "b", "title": "Hot take", "downvotes": 2}
                ]))
            }),
        );
        let svc = service(backend).await;
        let topics = svc.topics().await.unwrap();
        assert_eq!(topics[0].votes, 3);
        assert_eq!(topics[0].author.as_deref(), Some("u1"));
        assert_eq!(topics[1].votes, -2);
        assert!(topics[1].author.is_none());
    }

    #[tokio::test]
    async fn blank_topic_and_comment_are_rejected() {
        let svc = service(Router::new()).await;
        assert!(matches!(
            svc.create_topic("   ", "u1").await,
            Err(AnidexError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.add_comment("a", "", "u1").await,
            Err(AnidexError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn news_falls_back_to_placeholder() {
        let backend = Router::new().route(
            "/api/news",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let feed = service(backend).await.news().await;
        assert!(feed.fallback);
        assert_eq!(feed.items.len(), 1);
        assert!(feed.items[0].title.starts_with("Demon Slayer"));
    }
}
