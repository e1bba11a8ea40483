//! libris: a REST API for managing books, authors and users.
//!
//! This crate provides a JSON HTTP API over a document store in which
//! authors and books reference each other by id. The two collections are
//! kept consistent by explicit reconciliation writes on every mutation,
//! since the store offers no cross-document transactions or cascades.
//!
//! # Features
//!
//! - Author, book and user CRUD under `/api`
//! - Bidirectional author/book reference maintenance
//! - Cascade deletion of an author's books
//! - JWT bearer-token authentication
//! - CSV export of authors and books
//! - User management from the CLI

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and token handling.
pub mod auth;
/// Author service.
pub mod authors;
/// Book service.
pub mod books;
/// Configuration and CLI.
pub mod config;
/// Entity models and document store.
pub mod db;
/// Error types.
pub mod error;
/// Author/book reference reconciliation.
pub mod relations;
/// HTTP server.
pub mod server;
/// User service.
pub mod users;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
