//! Pulls an anime title out of a free-text recommendation request.

use rand::seq::IndexedRandom;
use regex::Regex;
use std::sync::LazyLock;

/// Tried in order; the first capture wins.
static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:I watched|I've watched|I saw|I've seen)\s(.+)",
        r"(?i)(?:anime like|similar to|shows like|recommend me anime like)\s(.+)",
        r"(?i)(?:what should I watch after|more anime like|recommendations for fans of)\s(.+)",
        r"(?i)(.+)\s(?:similar|recommendations|like)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("title pattern compiles"))
    .collect()
});

pub const SUGGESTION_LIMIT: usize = 5;

/// Canned queries offered as suggestions and by "feeling lucky".
pub const COMMON_QUERIES: &[&str] = &[
    "I watched Naruto",
    "I watched One Piece",
    "I watched Bleach",
    "I watched Black Clover",
    "I watched Dragon Ball Z",
    "I watched My Hero Academia",
    "I watched Jujutsu Kaisen",
    "I watched Chainsaw Man",
    "I watched Fullmetal Alchemist",
    "I watched Sword Art Online",
    "I watched Death Note",
    "I watched Tokyo Ghoul",
    "I watched Attack on Titan",
    "I watched Demon Slayer",
    "I watched Mob Psycho 100",
    "I watched Akame ga Kill!",
    "I watched Elfen Lied",
    "I watched Seraph of the End",
    "I watched The Rising of the Shield Hero",
    "I watched Future Diary",
    "Anime like Naruto",
    "Similar to One Piece",
    "Shows like Attack on Titan",
    "Recommend me anime like Death Note",
    "What should I watch after Demon Slayer?",
    "Suggest me anime similar to Jujutsu Kaisen",
    "I enjoyed Fullmetal Alchemist, what next?",
    "More anime like Chainsaw Man",
    "Recommendations for fans of Tokyo Ghoul",
    "Anime similar to Sword Art Online",
];

/// `"Anime like Naruto!"` -> `Some("Naruto")`. Punctuation `?.,!` is stripped.
/// Only the first matching pattern is used, even if it yields nothing.
pub fn extract_title(query: &str) -> Option<String> {
    let caps = TITLE_PATTERNS.iter().find_map(|re| re.captures(query))?;
    let title: String = caps
        .get(1)?
        .as_str()
        .chars()
        .filter(|c| !matches!(c, '?' | '.' | ',' | '!'))
        .collect();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Canned queries containing `input`, case-insensitively.
pub fn suggestions(input: &str) -> Vec<&'static str> {
    let needle = input.to_lowercase();
    COMMON_QUERIES
        .iter()
        .copied()
        .filter(|q| q.to_lowercase().contains(&needle))
        .take(SUGGESTION_LIMIT)
        .collect()
}

pub fn random_query() -> &'static str {
    COMMON_QUERIES
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or("I watched Naruto")
}
