//! Application services: cached read paths, write services and seeding.

pub mod admin;
pub mod blog;
pub mod error;
pub mod gallery;
pub mod home;
pub mod repos;
pub mod seed;
