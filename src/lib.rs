//! Moyinji: blog posts and photo albums served through a read-through cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
