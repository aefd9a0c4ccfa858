//! Blog Service Library
//!
//! Backend for a social blogging platform: posts (optionally tagged to a
//! group and carrying an image), comments on posts, and follows between users.
//!
//! # Modules
//!
//! - `authz`: ordered-rule authorization engine
//! - `store`: storage contracts plus PostgreSQL and in-memory backends
//! - `services`: business logic; every call takes the acting identity
//! - `handlers`: HTTP request handlers and the v1 wire schema
//! - `middleware`: bearer token verification
//! - `image`: data URI and upload decoding for post images
//! - `models`: domain types
//! - `error`: error taxonomy and HTTP mapping
//! - `config`: configuration management
//! - `app`: shared state and route table
pub mod app;
pub mod authz;
pub mod config;
pub mod error;
pub mod handlers;
pub mod image;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use app::AppState;
pub use config::Config;
pub use error::{AppError, Result};
