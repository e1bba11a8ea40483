//! Author management.

use crate::db::{Author, AuthorInput, AuthorStore};
use crate::error::{AppError, Result};
use crate::relations::Reconciler;
use std::sync::Arc;

/// Author service.
pub struct AuthorService {
    authors: Arc<dyn AuthorStore>,
    reconciler: Reconciler,
}

impl AuthorService {
    /// Create a new author service.
    pub fn new(authors: Arc<dyn AuthorStore>, reconciler: Reconciler) -> Self {
        Self {
            authors,
            reconciler,
        }
    }

    /// Create a new author and link it into each referenced book.
    pub fn create(&self, input: &AuthorInput) -> Result<Author> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation("Author name is required".to_string()));
        }

        if self.authors.find_by_name(&input.name)?.is_some() {
            return Err(AppError::Conflict("Author already exists".to_string()));
        }

        let author = self.authors.insert(input)?;
        self.reconciler.link_created_author(&author)?;
        Ok(author)
    }

    /// Get an author by id.
    pub fn get(&self, id: &str) -> Result<Author> {
        self.authors
            .find_by_id(id)?
            .ok_or_else(|| AppError::NotFound("Author not found".to_string()))
    }

    /// Get all authors.
    pub fn list(&self) -> Result<Vec<Author>> {
        self.authors.list()
    }

    /// Update an author, reconciling its book list against the books
    /// collection before the author document itself is written.
    pub fn update(&self, author: &Author) -> Result<()> {
        if author.name.trim().is_empty() {
            return Err(AppError::Validation("Author name is required".to_string()));
        }

        if let Some(existing) = self.authors.find_by_name(&author.name)?
            && existing.id != author.id
        {
            return Err(AppError::Conflict(
                "Already exists an author with the same name".to_string(),
            ));
        }

        let previous = self
            .authors
            .find_by_id(&author.id)?
            .ok_or_else(|| AppError::NotFound("Author not found".to_string()))?;

        self.reconciler.reconcile_author(author, &previous)?;

        let updated = self.authors.update(author)?;
        if updated.matched == 1 && updated.modified == 1 {
            Ok(())
        } else if updated.matched == 1 && updated.modified == 0 {
            Err(AppError::NotModified("Author not updated".to_string()))
        } else {
            Err(AppError::NotFound("Author not found".to_string()))
        }
    }

    /// Delete an author and cascade-delete every book crediting it.
    pub fn delete(&self, id: &str) -> Result<()> {
        let deleted = self.authors.delete(id)?;
        if deleted.deleted != 1 {
            return Err(AppError::NotFound("Author not found".to_string()));
        }

        self.reconciler.cascade_deleted_author(id)?;
        Ok(())
    }

    /// Export all authors as CSV, one row per book reference.
    pub fn csv(&self) -> Result<String> {
        let authors = self.authors.list()?;

        let mut csv = String::from("id,name,books\n");
        for author in authors {
            if author.books.is_empty() {
                csv.push_str(&format!("{},{},\n", author.id, csv_field(&author.name)));
            } else {
                for book in &author.books {
                    csv.push_str(&format!(
                        "{},{},{}\n",
                        author.id,
                        csv_field(&author.name),
                        book
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
