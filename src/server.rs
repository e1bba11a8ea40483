//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let author_routes = Router::new()
        .route("/", post(handlers::create_author))
        .route("/", get(handlers::list_authors))
        .route("/", put(handlers::update_author))
        .route("/csv", get(handlers::authors_csv))
        .route("/{id}", get(handlers::get_author))
        .route("/{id}", delete(handlers::delete_author));

    let book_routes = Router::new()
        .route("/", post(handlers::create_book))
        .route("/", get(handlers::list_books))
        .route("/", put(handlers::update_book))
        .route("/csv", get(handlers::books_csv))
        .route("/{id}", get(handlers::get_book))
        .route("/{id}", delete(handlers::delete_book));

    let user_routes = Router::new()
        .route("/", post(handlers::create_user))
        .route("/", get(handlers::list_users))
        .route("/{id}", get(handlers::get_user))
        .route("/{id}", put(handlers::update_user))
        .route("/{id}", delete(handlers::delete_user));

    Router::new()
        .route("/api/login", post(handlers::login))
        .nest("/api/authors", author_routes)
        .nest("/api/books", book_routes)
        .nest("/api/users", user_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
