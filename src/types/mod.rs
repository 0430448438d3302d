pub mod community;
pub mod jikan;
