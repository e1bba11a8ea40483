mod store;

pub use store::{AuthorRepository, BookRepository, Collection, Database, UserRepository};

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An author document. `books` holds the ids of the books credited to this
/// author; the referenced book lists this author's id back in `authors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    /// Unique author ID.
    pub id: String,
    /// Author name, unique across authors (case-insensitive).
    pub name: String,
    /// Ids of books credited to this author.
    #[serde(default)]
    pub books: Vec<String>,
}

/// A book document. `authors` holds the ids of the authors of this book;
/// each referenced author lists this book's id back in `books`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Unique book ID.
    pub id: String,
    /// Book title.
    pub title: String,
    /// ISBN, unique across books (case-insensitive).
    pub isbn: String,
    /// Page count.
    pub pages: u32,
    /// Ids of this book's authors.
    #[serde(default)]
    pub authors: Vec<String>,
}

/// A user account document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Email used for login, unique across users (case-insensitive).
    pub email: String,
    /// Argon2 password hash.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: Option<i64>,
    /// National identity document number.
    pub dni: Option<String>,
    /// City of residence.
    pub city: Option<String>,
    /// Birth date.
    pub birth_date: Option<DateTime<Utc>>,
    /// Account creation timestamp.
    pub registration_date: i64,
}

impl User {
    /// User fields safe to return to clients (everything but the hash).
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            phone: self.phone,
            dni: self.dni.clone(),
            city: self.city.clone(),
            birth_date: self.birth_date,
            registration_date: self.registration_date,
        }
    }
}

/// Client-facing view of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    /// Unique user ID.
    pub id: String,
    /// Email used for login.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: Option<i64>,
    /// National identity document number.
    pub dni: Option<String>,
    /// City of residence.
    pub city: Option<String>,
    /// Birth date.
    pub birth_date: Option<DateTime<Utc>>,
    /// Account creation timestamp.
    pub registration_date: i64,
}

/// Payload for creating an author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorInput {
    /// Author name.
    pub name: String,
    /// Ids of books to credit to the new author.
    #[serde(default)]
    pub books: Vec<String>,
}

/// Payload for creating a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookInput {
    /// Book title.
    pub title: String,
    /// ISBN.
    pub isbn: String,
    /// Page count.
    pub pages: u32,
    /// Ids of the book's authors.
    #[serde(default)]
    pub authors: Vec<String>,
}

/// Payload for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    /// Email used for login.
    pub email: String,
    /// Plain-text password, hashed before storage.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: Option<i64>,
    /// National identity document number.
    pub dni: Option<String>,
    /// City of residence.
    pub city: Option<String>,
    /// Birth date.
    pub birth_date: Option<DateTime<Utc>>,
}

/// Payload for updating a user. A missing password keeps the stored one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdate {
    /// Email used for login.
    pub email: String,
    /// New plain-text password; omit to keep the current one.
    pub password: Option<String>,
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: Option<i64>,
    /// National identity document number.
    pub dni: Option<String>,
    /// City of residence.
    pub city: Option<String>,
    /// Birth date.
    pub birth_date: Option<DateTime<Utc>>,
}

/// Result of an update-by-id write, mirroring the store's matched and
/// modified row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Number of documents matched by id (0 or 1).
    pub matched: u64,
    /// Number of documents actually changed by the write (0 or 1).
    pub modified: u64,
}

/// Result of a delete-by-id write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Number of documents deleted (0 or 1).
    pub deleted: u64,
}

/// Typed accessor over the `authors` collection.
pub trait AuthorStore: Send + Sync {
    /// Persist a new author, assigning its id.
    fn insert(&self, input: &AuthorInput) -> Result<Author>;
    /// Fetch an author by id.
    fn find_by_id(&self, id: &str) -> Result<Option<Author>>;
    /// Fetch an author by name, case-insensitive.
    fn find_by_name(&self, name: &str) -> Result<Option<Author>>;
    /// Fetch every author whose book list contains the given book id.
    fn find_by_book(&self, book_id: &str) -> Result<Vec<Author>>;
    /// Fetch all authors.
    fn list(&self) -> Result<Vec<Author>>;
    /// Update an author by id.
    fn update(&self, author: &Author) -> Result<UpdateSummary>;
    /// Delete an author by id.
    fn delete(&self, id: &str) -> Result<DeleteSummary>;
}

/// Typed accessor over the `books` collection.
pub trait BookStore: Send + Sync {
    /// Persist a new book, assigning its id.
    fn insert(&self, input: &BookInput) -> Result<Book>;
    /// Fetch a book by id.
    fn find_by_id(&self, id: &str) -> Result<Option<Book>>;
    /// Fetch a book by isbn, case-insensitive.
    fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>>;
    /// Fetch every book whose author list contains the given author id.
    fn find_by_author(&self, author_id: &str) -> Result<Vec<Book>>;
    /// Fetch all books.
    fn list(&self) -> Result<Vec<Book>>;
    /// Update a book by id.
    fn update(&self, book: &Book) -> Result<UpdateSummary>;
    /// Delete a book by id.
    fn delete(&self, id: &str) -> Result<DeleteSummary>;
}

/// Typed accessor over the `users` collection.
pub trait UserStore: Send + Sync {
    /// Persist a new user. The password must already be hashed.
    fn insert(&self, user: &User) -> Result<User>;
    /// Fetch a user by id.
    fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    /// Fetch a user by email, case-insensitive.
    fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Fetch all users.
    fn list(&self) -> Result<Vec<User>>;
    /// Update a user by id.
    fn update(&self, user: &User) -> Result<UpdateSummary>;
    /// Delete a user by id.
    fn delete(&self, id: &str) -> Result<DeleteSummary>;
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}
