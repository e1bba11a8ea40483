//! Bidirectional reference maintenance between authors and books.
//!
//! Authors and books are stored as independent documents that each carry a
//! list of ids pointing at the other collection. Whenever one side of the
//! relationship changes, the other side's back-reference lists must be
//! rewritten by hand; there is no store-level cascade. Each rewrite is an
//! independent single-document write, so a failure partway through leaves
//! the collections out of step and surfaces to the caller as-is.

use crate::db::{Author, AuthorStore, Book, BookStore};
use crate::error::{AppError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Propagates reference-list edits to the opposite collection.
#[derive(Clone)]
pub struct Reconciler {
    authors: Arc<dyn AuthorStore>,
    books: Arc<dyn BookStore>,
}

/// Compare two reference lists for set-equality, ignoring order.
pub fn refs_equal(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Drop duplicate ids, keeping first occurrences in order.
fn dedup_refs(refs: &mut Vec<String>) {
    let mut seen = HashSet::new();
    refs.retain(|r| seen.insert(r.clone()));
}

impl Reconciler {
    /// Create a reconciler over the two collections.
    pub fn new(authors: Arc<dyn AuthorStore>, books: Arc<dyn BookStore>) -> Self {
        Self { authors, books }
    }

    /// Propagate an author's edited book list to the books collection.
    ///
    /// `previous` is the stored snapshot fetched just before this call.
    /// When the lists are set-equal no foreign document is touched. When
    /// the new list is non-empty, membership of the author id is toggled
    /// in each listed book: appended where absent, removed where already
    /// present. When the new list is empty, the author id is stripped
    /// from every book of the previous list instead.
    pub fn reconcile_author(&self, updated: &Author, previous: &Author) -> Result<()> {
        if refs_equal(&updated.books, &previous.books) {
            return Ok(());
        }

        if !updated.books.is_empty() {
            for book_id in &updated.books {
                let mut book = self
                    .books
                    .find_by_id(book_id)?
                    .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", book_id)))?;

                if book.authors.iter().any(|a| a == &updated.id) {
                    book.authors.retain(|a| a != &updated.id);
                } else {
                    // The id appended comes from the stored snapshot, not
                    // the caller payload.
                    book.authors.push(previous.id.clone());
                }
                dedup_refs(&mut book.authors);

                tracing::debug!(book = %book.id, author = %updated.id, "Rewriting book author list");
                self.books.update(&book)?;
            }
        } else {
            for book_id in &previous.books {
                let mut book = self
                    .books
                    .find_by_id(book_id)?
                    .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", book_id)))?;

                book.authors.retain(|a| a != &updated.id);

                tracing::debug!(book = %book.id, author = %updated.id, "Unlinking author from book");
                self.books.update(&book)?;
            }
        }

        Ok(())
    }

    /// Propagate a book's edited author list to the authors collection.
    ///
    /// Mirror of [`Reconciler::reconcile_author`].
    pub fn reconcile_book(&self, updated: &Book, previous: &Book) -> Result<()> {
        if refs_equal(&updated.authors, &previous.authors) {
            return Ok(());
        }

        if !updated.authors.is_empty() {
            for author_id in &updated.authors {
                let mut author = self.authors.find_by_id(author_id)?.ok_or_else(|| {
                    AppError::NotFound(format!("Author not found: {}", author_id))
                })?;

                if author.books.iter().any(|b| b == &updated.id) {
                    author.books.retain(|b| b != &updated.id);
                } else {
                    author.books.push(previous.id.clone());
                }
                dedup_refs(&mut author.books);

                tracing::debug!(author = %author.id, book = %updated.id, "Rewriting author book list");
                self.authors.update(&author)?;
            }
        } else {
            for author_id in &previous.authors {
                let mut author = self.authors.find_by_id(author_id)?.ok_or_else(|| {
                    AppError::NotFound(format!("Author not found: {}", author_id))
                })?;

                author.books.retain(|b| b != &updated.id);

                tracing::debug!(author = %author.id, book = %updated.id, "Unlinking book from author");
                self.authors.update(&author)?;
            }
        }

        Ok(())
    }

    /// Add a freshly created author to each book it references.
    pub fn link_created_author(&self, author: &Author) -> Result<()> {
        for book_id in &author.books {
            let mut book = self
                .books
                .find_by_id(book_id)?
                .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", book_id)))?;

            book.authors.push(author.id.clone());
            self.books.update(&book)?;
        }
        Ok(())
    }

    /// Add a freshly created book to each author it references.
    pub fn link_created_book(&self, book: &Book) -> Result<()> {
        for author_id in &book.authors {
            let mut author = self
                .authors
                .find_by_id(author_id)?
                .ok_or_else(|| AppError::NotFound(format!("Author not found: {}", author_id)))?;

            author.books.push(book.id.clone());
            self.authors.update(&author)?;
        }
        Ok(())
    }

    /// Delete every book that credits the deleted author.
    ///
    /// Books belong to their authors: removing an author removes its
    /// books outright. Each deletion is independent; a failure leaves the
    /// remaining books in place.
    pub fn cascade_deleted_author(&self, author_id: &str) -> Result<()> {
        let books = self.books.find_by_author(author_id)?;
        for book in books {
            tracing::debug!(book = %book.id, author = %author_id, "Cascade deleting book");
            self.books.delete(&book.id)?;
        }
        Ok(())
    }

    /// Strip the deleted book's id from every author that lists it.
    ///
    /// Authors outlive their books; only the reference is dropped.
    pub fn unlink_deleted_book(&self, book_id: &str) -> Result<()> {
        let authors = self.authors.find_by_book(book_id)?;
        for mut author in authors {
            author.books.retain(|b| b != book_id);
            tracing::debug!(author = %author.id, book = %book_id, "Dropping deleted book reference");
            self.authors.update(&author)?;
        }
        Ok(())
    }
}
