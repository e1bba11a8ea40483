//! HTTP request handlers.

use crate::auth::{Claims, TokenResponse};
use crate::db::{Author, AuthorInput, Book, BookInput, UserInput, UserPublic, UserUpdate};
use crate::error::{AppError, Result};
use crate::server::AppState;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};

/// CSV content type.
const CSV_MIME: &str = "text/csv; charset=utf-8";

/// Generic `{ "message": ... }` response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Build a response, returning 500 on error (which shouldn't happen).
fn build_response(status: StatusCode, content_type: &str, body: impl Into<Body>) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("Internal error"))
                .unwrap_or_default()
        })
}

/// Pull the bearer token out of the Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
}

/// Require a valid bearer token, returning its claims.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Claims> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;
    state.auth.verify_token(&token)
}

// ============================================================================
// LOGIN
// ============================================================================

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// User login.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    tracing::info!(email = %req.email, "Login attempt");
    let token = state.auth.login(&req.email, &req.password)?;
    Ok(Json(token))
}

// ============================================================================
// AUTHORS
// ============================================================================

/// Create an author.
pub async fn create_author(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<AuthorInput>,
) -> Result<(StatusCode, Json<Author>)> {
    authorize(&state, &headers)?;
    let author = state.authors.create(&input)?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// Get an author by id.
pub async fn get_author(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Author>> {
    authorize(&state, &headers)?;
    Ok(Json(state.authors.get(&id)?))
}

/// Get all authors.
pub async fn list_authors(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Author>>> {
    authorize(&state, &headers)?;
    Ok(Json(state.authors.list()?))
}

/// Update an author.
pub async fn update_author(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(author): Json<Author>,
) -> Result<Json<MessageResponse>> {
    authorize(&state, &headers)?;
    state.authors.update(&author)?;
    Ok(Json(MessageResponse::new("Author updated")))
}

/// Delete an author and its books.
pub async fn delete_author(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    authorize(&state, &headers)?;
    state.authors.delete(&id)?;
    Ok(Json(MessageResponse::new("Author deleted")))
}

/// Export authors as CSV.
pub async fn authors_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response<Body>> {
    authorize(&state, &headers)?;
    let csv = state.authors.csv()?;
    Ok(build_response(StatusCode::OK, CSV_MIME, csv))
}

// ============================================================================
// BOOKS
// ============================================================================

/// Create a book.
pub async fn create_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<BookInput>,
) -> Result<(StatusCode, Json<Book>)> {
    authorize(&state, &headers)?;
    let book = state.books.create(&input)?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Get a book by id.
pub async fn get_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Book>> {
    authorize(&state, &headers)?;
    Ok(Json(state.books.get(&id)?))
}

/// Get all books.
pub async fn list_books(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Book>>> {
    authorize(&state, &headers)?;
    Ok(Json(state.books.list()?))
}

/// Update a book.
pub async fn update_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(book): Json<Book>,
) -> Result<Json<MessageResponse>> {
    authorize(&state, &headers)?;
    state.books.update(&book)?;
    Ok(Json(MessageResponse::new("Book updated")))
}

/// Delete a book, dropping author references to it.
pub async fn delete_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    authorize(&state, &headers)?;
    state.books.delete(&id)?;
    Ok(Json(MessageResponse::new("Book deleted")))
}

/// Export books as CSV.
pub async fn books_csv(State(state): State<AppState>, headers: HeaderMap) -> Result<Response<Body>> {
    authorize(&state, &headers)?;
    let csv = state.books.csv()?;
    Ok(build_response(StatusCode::OK, CSV_MIME, csv))
}

// ============================================================================
// USERS
// ============================================================================

/// Create a user. Registration is open, no token required.
pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<UserPublic>)> {
    let user = state.users.create(&input)?;
    Ok((StatusCode::CREATED, Json(user.to_public())))
}

/// Get a user by id.
pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<UserPublic>> {
    authorize(&state, &headers)?;
    Ok(Json(state.users.get(&id)?.to_public()))
}

/// Get all users.
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserPublic>>> {
    authorize(&state, &headers)?;
    let users = state.users.list()?.iter().map(|u| u.to_public()).collect();
    Ok(Json(users))
}

/// Update a user.
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<MessageResponse>> {
    authorize(&state, &headers)?;
    state.users.update(&id, &update)?;
    Ok(Json(MessageResponse::new("User updated")))
}

/// Delete a user.
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    authorize(&state, &headers)?;
    state.users.delete(&id)?;
    Ok(Json(MessageResponse::new("User deleted")))
}
