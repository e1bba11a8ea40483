//! Application state shared across handlers.

use crate::auth::AuthService;
use crate::authors::AuthorService;
use crate::books::BookService;
use crate::config::Config;
use crate::db::{
    AuthorRepository, AuthorStore, BookRepository, BookStore, Database, UserRepository, UserStore,
};
use crate::relations::Reconciler;
use crate::users::UserService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Document store handle.
    pub db: Database,
    /// Author service.
    pub authors: Arc<AuthorService>,
    /// Book service.
    pub books: Arc<BookService>,
    /// User service.
    pub users: Arc<UserService>,
    /// Authentication service.
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wire repositories, reconciler and services over the given store.
    pub fn new(config: Config, db: Database) -> Self {
        let author_repo: Arc<dyn AuthorStore> = Arc::new(AuthorRepository::new(db.clone()));
        let book_repo: Arc<dyn BookStore> = Arc::new(BookRepository::new(db.clone()));
        let user_repo: Arc<dyn UserStore> = Arc::new(UserRepository::new(db.clone()));

        let reconciler = Reconciler::new(author_repo.clone(), book_repo.clone());

        let authors = Arc::new(AuthorService::new(author_repo, reconciler.clone()));
        let books = Arc::new(BookService::new(book_repo, reconciler));
        let users = Arc::new(UserService::new(user_repo.clone()));
        let auth = Arc::new(AuthService::new(
            user_repo,
            config.auth.jwt_secret.clone(),
            config.auth.token_hours,
        ));

        Self {
            config: Arc::new(config),
            db,
            authors,
            books,
            users,
            auth,
        }
    }
}
