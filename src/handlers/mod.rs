//! HTTP handlers, one module per route group.

pub mod admin;
pub mod catalog;
pub mod community;
pub mod genres;
pub mod lists;
pub mod recommend;
pub mod users;
