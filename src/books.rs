//! Book management.

use crate::db::{Book, BookInput, BookStore};
use crate::error::{AppError, Result};
use crate::relations::Reconciler;
use std::sync::Arc;

/// Book service.
pub struct BookService {
    books: Arc<dyn BookStore>,
    reconciler: Reconciler,
}

impl BookService {
    /// Create a new book service.
    pub fn new(books: Arc<dyn BookStore>, reconciler: Reconciler) -> Self {
        Self { books, reconciler }
    }

    /// Create a new book and link it into each referenced author.
    pub fn create(&self, input: &BookInput) -> Result<Book> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("Book title is required".to_string()));
        }
        if input.isbn.trim().is_empty() {
            return Err(AppError::Validation("Book isbn is required".to_string()));
        }

        if self.books.find_by_isbn(&input.isbn)?.is_some() {
            return Err(AppError::Conflict("Book already exists".to_string()));
        }

        let book = self.books.insert(input)?;
        self.reconciler.link_created_book(&book)?;
        Ok(book)
    }

    /// Get a book by id.
    pub fn get(&self, id: &str) -> Result<Book> {
        self.books
            .find_by_id(id)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// Get all books.
    pub fn list(&self) -> Result<Vec<Book>> {
        self.books.list()
    }

    /// Update a book, reconciling its author list against the authors
    /// collection before the book document itself is written.
    pub fn update(&self, book: &Book) -> Result<()> {
        if book.title.trim().is_empty() {
            return Err(AppError::Validation("Book title is required".to_string()));
        }
        if book.isbn.trim().is_empty() {
            return Err(AppError::Validation("Book isbn is required".to_string()));
        }

        if let Some(existing) = self.books.find_by_isbn(&book.isbn)?
            && existing.id != book.id
        {
            return Err(AppError::Conflict(
                "Already exists a book with the same isbn".to_string(),
            ));
        }

        let previous = self
            .books
            .find_by_id(&book.id)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        self.reconciler.reconcile_book(book, &previous)?;

        let updated = self.books.update(book)?;
        if updated.matched == 1 && updated.modified == 1 {
            Ok(())
        } else if updated.matched == 1 && updated.modified == 0 {
            Err(AppError::NotModified("Book not updated".to_string()))
        } else {
            Err(AppError::NotFound("Book not found".to_string()))
        }
    }

    /// Delete a book and drop its reference from every author listing it.
    pub fn delete(&self, id: &str) -> Result<()> {
        let deleted = self.books.delete(id)?;
        if deleted.deleted != 1 {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        self.reconciler.unlink_deleted_book(id)?;
        Ok(())
    }

    /// Export all books as CSV, one row per author reference.
    pub fn csv(&self) -> Result<String> {
        let books = self.books.list()?;

        let mut csv = String::from("id,title,isbn,pages,authors\n");
        for book in books {
            if book.authors.is_empty() {
                csv.push_str(&format!(
                    "{},{},{},{},\n",
                    book.id,
                    csv_field(&book.title),
                    csv_field(&book.isbn),
                    book.pages
                ));
            } else {
                for author in &book.authors {
                    csv.push_str(&format!(
                        "{},{},{},{},{}\n",
                        book.id,
                        csv_field(&book.title),
                        csv_field(&book.isbn),
                        book.pages,
                        author
                    ));
                }
            }
        }
        Ok(csv)
    }
}

/// Quote a CSV field when it contains separators or quotes.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
