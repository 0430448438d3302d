//! Anime metadata API (Jikan v4) payloads.
//!
//! Only the fields the gateway reads are typed; everything else is carried in
//! `extra` and serialized back out untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{ "data": [...], "pagination": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JikanPage<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// `{ "data": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JikanItem<T> {
    pub data: T,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub last_visible_page: Option<u32>,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anime {
    pub mal_id: u64,
    pub title: String,
    #[serde(default)]
    pub images: Option<Images>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub trailer: Option<Trailer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Anime {
    /// Poster URL the list and vote records store.
    pub fn image_url(&self) -> Option<&str> {
        self.images
            .as_ref()
            .and_then(|i| i.jpg.as_ref())
            .and_then(|jpg| jpg.image_url.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub jpg: Option<ImageSet>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trailer {
    #[serde(default)]
    pub youtube_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub mal_id: u64,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub count: u64,
}

/// `filter` values accepted by `/top/anime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopFilter {
    Airing,
    Upcoming,
    Bypopularity,
    Favorite,
}

impl TopFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopFilter::Airing => "airing",
            TopFilter::Upcoming => "upcoming",
            TopFilter::Bypopularity => "bypopularity",
            TopFilter::Favorite => "favorite",
        }
    }
}

/// Sort options offered on the genre page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenreSort {
    #[default]
    Popularity,
    Score,
    #[serde(alias = "aired_from")]
    Newest,
    #[serde(alias = "aired_to")]
    Oldest,
}

impl GenreSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenreSort::Popularity => "popularity",
            GenreSort::Score => "score",
            GenreSort::Newest => "newest",
            GenreSort::Oldest => "oldest",
        }
    }

    /// `(order_by, sort)` query pair for the metadata API.
    pub fn order(&self) -> (&'static str, &'static str) {
        match self {
            GenreSort::Popularity => ("popularity", "asc"),
            GenreSort::Score => ("score", "desc"),
            GenreSort::Newest => ("start_date", "desc"),
            GenreSort::Oldest => ("start_date", "asc"),
        }
    }
}

/// Filters of the trending browser. All optional except the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseFilters {
    pub page: Option<u32>,
    pub genre: Option<u64>,
    pub min_score: Option<f64>,
    pub year: Option<i32>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl BrowseFilters {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Query pairs for `/anime`, always most-popular first and SFW.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("order_by", "popularity".to_string()),
            ("sort", "desc".to_string()),
            ("page", self.page().to_string()),
            ("sfw", "true".to_string()),
        ];
        if let Some(min) = self.min_score {
            q.push(("min_score", min.to_string()));
        }
        if let Some(year) = self.year {
            q.push(("start_date", format!("{year}-01-01")));
            q.push(("end_date", format!("{year}-12-31")));
        }
        if let Some(genre) = self.genre {
            q.push(("genres", genre.to_string()));
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            q.push(("status", status.to_string()));
        }
        if let Some(kind) = self.kind.as_deref().filter(|s| !s.is_empty()) {
            q.push(("type", kind.to_string()));
        }
        q
    }

    /// Stable cache key covering every filter.
    pub fn cache_key(&self) -> String {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(|v| v.to_string()).unwrap_or_default()
        }
        format!(
            "jikan-trending-{}-{}-{}-{}-{}-{}",
            self.page(),
            opt(&self.genre),
            opt(&self.min_score),
            opt(&self.year),
            opt(&self.status),
            opt(&self.kind),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn anime_keeps_unknown_fields() {
        let raw = json!({
            "mal_id": 20,
            "title": "Naruto",
            "images": {"jpg": {"image_url": "https://cdn/naruto.jpg", "small_image_url": "s"}},
            "score": 8.0,
            "episodes": 220,
            "type": "TV",
            "synopsis": "ninja"
        });
        let anime: Anime = serde_json::from_value(raw).unwrap();
        assert_eq!(anime.image_url(), Some("https://cdn/naruto.jpg"));
        assert_eq!(anime.kind.as_deref(), Some("TV"));

        let back = serde_json::to_value(&anime).unwrap();
        assert_eq!(back["synopsis"], "ninja");
        assert_eq!(back["images"]["jpg"]["small_image_url"], "s");
        assert_eq!(back["type"], "TV");
    }

    #[test]
    fn browse_filters_expand_year_into_date_range() {
        let filters = BrowseFilters {
            page: Some(2),
            year: Some(2019),
            genre: Some(1),
            status: Some(String::new()),
            ..Default::default()
        };
        let q = filters.to_query();
        assert!(q.contains(&("start_date", "2019-01-01".to_string())));
        assert!(q.contains(&("end_date", "2019-12-31".to_string())));
        assert!(q.contains(&("genres", "1".to_string())));
        assert!(q.contains(&("page", "2".to_string())));
        assert!(!q.iter().any(|(k, _)| *k == "status"));
        assert_eq!(filters.cache_key(), "jikan-trending-2-1--2019--");
    }

    #[test]
    fn genre_sort_accepts_legacy_names() {
        let s: GenreSort = serde_json::from_value(json!("aired_from")).unwrap();
        assert_eq!(s, GenreSort::Newest);
        assert_eq!(GenreSort::Oldest.order(), ("start_date", "asc"));
    }
}
