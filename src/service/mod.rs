//! Domain services composed from the upstream callers and local storage.

pub mod catalog;
pub mod community;
pub mod lists;
pub mod recommend;
pub mod title_extractor;
pub mod users;

pub use catalog::CatalogService;
pub use community::CommunityService;
pub use lists::ListService;
pub use recommend::RecommendService;
pub use users::UserService;
