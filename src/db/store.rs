use crate::db::{
    Author, AuthorInput, AuthorStore, Book, BookInput, BookStore, DeleteSummary, UpdateSummary,
    User, UserStore,
};
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Params, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// A collection in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// The `authors` collection.
    Authors,
    /// The `books` collection.
    Books,
    /// The `users` collection.
    Users,
}

impl Collection {
    fn table(self) -> &'static str {
        match self {
            Collection::Authors => "authors",
            Collection::Books => "books",
            Collection::Users => "users",
        }
    }
}

/// Document store wrapper for thread-safe access.
///
/// Each collection is a table of `(id, doc)` rows where `doc` is the JSON
/// serialization of the entity. Every operation touches a single document;
/// no operation spans two documents, so a logical change made of several
/// calls is not atomic as a whole.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open an in-memory store (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize collection tables.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Author documents
            CREATE TABLE IF NOT EXISTS authors (
                id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            );

            -- Book documents
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            );

            -- User documents
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    /// Insert a document under the given id.
    pub fn insert_doc<T: Serialize>(&self, collection: Collection, id: &str, doc: &T) -> Result<()> {
        let json = serde_json::to_string(doc)?;
        let conn = self.conn.lock();
        conn.execute(
            &format!("INSERT INTO {} (id, doc) VALUES (?1, ?2)", collection.table()),
            params![id, json],
        )?;
        Ok(())
    }

    /// Fetch a single document by id.
    pub fn find_doc<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> Result<Option<T>> {
        self.find_doc_where(collection, "id = ?1", params![id])
    }

    /// Fetch the first document matching an exact-match filter clause.
    pub fn find_doc_where<T: DeserializeOwned>(
        &self,
        collection: Collection,
        clause: &str,
        params: impl Params,
    ) -> Result<Option<T>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .query_row(
                &format!("SELECT doc FROM {} WHERE {}", collection.table(), clause),
                params,
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Fetch every document matching an exact-match filter clause.
    pub fn find_docs_where<T: DeserializeOwned>(
        &self,
        collection: Collection,
        clause: &str,
        params: impl Params,
    ) -> Result<Vec<T>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT doc FROM {} WHERE {}",
            collection.table(),
            clause
        ))?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;

        let mut docs = Vec::new();
        for row in rows {
            docs.push(serde_json::from_str(&row?)?);
        }
        Ok(docs)
    }

    /// Fetch every document in a collection.
    pub fn list_docs<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        self.find_docs_where(collection, "1 = 1", params![])
    }

    /// Replace the document stored under the given id.
    ///
    /// `matched` counts the row found by id, `modified` counts an actual
    /// content change; a write that stores identical bytes reports
    /// `matched: 1, modified: 0`.
    pub fn update_doc<T: Serialize>(
        &self,
        collection: Collection,
        id: &str,
        doc: &T,
    ) -> Result<UpdateSummary> {
        let json = serde_json::to_string(doc)?;
        let conn = self.conn.lock();

        let stored: Option<String> = conn
            .query_row(
                &format!("SELECT doc FROM {} WHERE id = ?1", collection.table()),
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            None => Ok(UpdateSummary {
                matched: 0,
                modified: 0,
            }),
            Some(stored) if stored == json => Ok(UpdateSummary {
                matched: 1,
                modified: 0,
            }),
            Some(_) => {
                conn.execute(
                    &format!("UPDATE {} SET doc = ?2 WHERE id = ?1", collection.table()),
                    params![id, json],
                )?;
                Ok(UpdateSummary {
                    matched: 1,
                    modified: 1,
                })
            }
        }
    }

    /// Delete the document stored under the given id.
    pub fn delete_doc(&self, collection: Collection, id: &str) -> Result<DeleteSummary> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
            params![id],
        )?;
        Ok(DeleteSummary {
            deleted: deleted as u64,
        })
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Rusqlite-backed accessor over the `authors` collection.
#[derive(Clone)]
pub struct AuthorRepository {
    db: Database,
}

impl AuthorRepository {
    /// Create a repository over the given store.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl AuthorStore for AuthorRepository {
    fn insert(&self, input: &AuthorInput) -> Result<Author> {
        let author = Author {
            id: new_id(),
            name: input.name.clone(),
            books: input.books.clone(),
        };
        self.db.insert_doc(Collection::Authors, &author.id, &author)?;
        Ok(author)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Author>> {
        self.db.find_doc(Collection::Authors, id)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Author>> {
        self.db.find_doc_where(
            Collection::Authors,
            "lower(json_extract(doc, '$.name')) = lower(?1)",
            params![name],
        )
    }

    fn find_by_book(&self, book_id: &str) -> Result<Vec<Author>> {
        self.db.find_docs_where(
            Collection::Authors,
            "EXISTS (SELECT 1 FROM json_each(doc, '$.books') WHERE json_each.value = ?1)",
            params![book_id],
        )
    }

    fn list(&self) -> Result<Vec<Author>> {
        self.db.list_docs(Collection::Authors)
    }

    fn update(&self, author: &Author) -> Result<UpdateSummary> {
        self.db.update_doc(Collection::Authors, &author.id, author)
    }

    fn delete(&self, id: &str) -> Result<DeleteSummary> {
        self.db.delete_doc(Collection::Authors, id)
    }
}

/// Rusqlite-backed accessor over the `books` collection.
#[derive(Clone)]
pub struct BookRepository {
    db: Database,
}

impl BookRepository {
    /// Create a repository over the given store.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl BookStore for BookRepository {
    fn insert(&self, input: &BookInput) -> Result<Book> {
        let book = Book {
            id: new_id(),
            title: input.title.clone(),
            isbn: input.isbn.clone(),
            pages: input.pages,
            authors: input.authors.clone(),
        };
        self.db.insert_doc(Collection::Books, &book.id, &book)?;
        Ok(book)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Book>> {
        self.db.find_doc(Collection::Books, id)
    }

    fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        self.db.find_doc_where(
            Collection::Books,
            "lower(json_extract(doc, '$.isbn')) = lower(?1)",
            params![isbn],
        )
    }

    fn find_by_author(&self, author_id: &str) -> Result<Vec<Book>> {
        self.db.find_docs_where(
            Collection::Books,
            "EXISTS (SELECT 1 FROM json_each(doc, '$.authors') WHERE json_each.value = ?1)",
            params![author_id],
        )
    }

    fn list(&self) -> Result<Vec<Book>> {
        self.db.list_docs(Collection::Books)
    }

    fn update(&self, book: &Book) -> Result<UpdateSummary> {
        self.db.update_doc(Collection::Books, &book.id, book)
    }

    fn delete(&self, id: &str) -> Result<DeleteSummary> {
        self.db.delete_doc(Collection::Books, id)
    }
}

/// Rusqlite-backed accessor over the `users` collection.
#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    /// Create a repository over the given store.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl UserStore for UserRepository {
    fn insert(&self, user: &User) -> Result<User> {
        self.db.insert_doc(Collection::Users, &user.id, user)?;
        Ok(user.clone())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.db.find_doc(Collection::Users, id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.db.find_doc_where(
            Collection::Users,
            "lower(json_extract(doc, '$.email')) = lower(?1)",
            params![email],
        )
    }

    fn list(&self) -> Result<Vec<User>> {
        self.db.list_docs(Collection::Users)
    }

    fn update(&self, user: &User) -> Result<UpdateSummary> {
        self.db.update_doc(Collection::Users, &user.id, user)
    }

    fn delete(&self, id: &str) -> Result<DeleteSummary> {
        self.db.delete_doc(Collection::Users, id)
    }
}
