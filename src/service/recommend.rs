use crate::api::{BackendApi, JikanApi};
use crate::db::HistoryStorage;
use crate::error::AnidexError;
use crate::service::title_extractor::extract_title;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

const FALLBACK_SEARCH_LIMIT: u32 = 20;

/// Which step of the chain produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendSource {
    /// Backend answered the query as typed.
    Backend,
    /// Backend answered `"I watched {title}"` for the extracted title.
    BackendExtracted,
    /// Metadata API title search.
    CatalogSearch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub query: String,
    pub extracted_title: Option<String>,
    pub source: RecommendSource,
    pub results: Vec<Value>,
}

#[derive(Clone)]
pub struct RecommendService {
    backend: BackendApi,
    jikan: JikanApi,
    history: HistoryStorage,
}

impl RecommendService {
    pub fn new(backend: BackendApi, jikan: JikanApi, history: HistoryStorage) -> Self {
        Self {
            backend,
            jikan,
            history,
        }
    }

    /// Backend recommendation for the raw query, then for the extracted title,
    /// then a plain title search on the metadata API.
    pub async fn recommend(&self, query: &str, user: Option<&str>) -> Result<Recommendation, AnidexError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AnidexError::InvalidInput("query is empty".into()));
        }

        if let Some(user) = user {
            // history is best effort
            if let Err(e) = self.history.record(user, query).await {
                warn!(user, error = %e, "failed to record search history");
            }
        }

        let direct = self.backend.ai_recommend(query).await?;
        if !direct.is_empty() {
            info!(query, count = direct.len(), "backend recommendation hit");
            return Ok(Recommendation {
                query: query.to_string(),
                extracted_title: None,
                source: RecommendSource::Backend,
                results: direct,
            });
        }

        let extracted = extract_title(query);
        if let Some(title) = extracted.as_deref() {
            debug!(query, title, "retrying recommendation with extracted title");
            let second = self
                .backend
                .ai_recommend(&format!("I watched {title}"))
                .await?;
            if !second.is_empty() {
                return Ok(Recommendation {
                    query: query.to_string(),
                    extracted_title: extracted,
                    source: RecommendSource::BackendExtracted,
                    results: second,
                });
            }
        }

        let search_term = extracted.as_deref().unwrap_or(query);
        let page = self.jikan.search(search_term, FALLBACK_SEARCH_LIMIT).await?;
        let results = page
            .data
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        info!(query, search_term, count = results.len(), "fell back to catalog search");

        Ok(Recommendation {
            query: query.to_string(),
            extracted_title: extracted,
            source: RecommendSource::CatalogSearch,
            results,
        })
    }

    pub async fn history(&self, user: &str) -> Result<Vec<String>, AnidexError> {
        self.history.list(user).await
    }
}
