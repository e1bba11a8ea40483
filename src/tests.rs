use crate::config::Config;
use crate::db::{Author, AuthorInput, BookInput, Collection, Database, UserInput, UserUpdate};
use crate::error::AppError;
use crate::server::AppState;

fn test_state() -> AppState {
    AppState::new(Config::default(), Database::open_memory().unwrap())
}

fn author_input(name: &str, books: &[&str]) -> AuthorInput {
    AuthorInput {
        name: name.to_string(),
        books: books.iter().map(|b| b.to_string()).collect(),
    }
}

fn book_input(title: &str, isbn: &str, authors: &[&str]) -> BookInput {
    BookInput {
        title: title.to_string(),
        isbn: isbn.to_string(),
        pages: 100,
        authors: authors.iter().map(|a| a.to_string()).collect(),
    }
}

fn user_input(email: &str, password: &str) -> UserInput {
    UserInput {
        email: email.to_string(),
        password: password.to_string(),
        name: "Test User".to_string(),
        phone: None,
        dni: None,
        city: None,
        birth_date: None,
    }
}

// ============================================================================
// DOCUMENT STORE
// ============================================================================

#[test]
fn store_update_reports_matched_and_modified() {
    let db = Database::open_memory().unwrap();
    let author = Author {
        id: "author-1".to_string(),
        name: "John Doe".to_string(),
        books: Vec::new(),
    };
    db.insert_doc(Collection::Authors, &author.id, &author)
        .unwrap();

    // Same bytes: matched but nothing changed
    let summary = db
        .update_doc(Collection::Authors, &author.id, &author)
        .unwrap();
    assert_eq!((summary.matched, summary.modified), (1, 0));

    // Changed content
    let renamed = Author {
        name: "Jane Doe".to_string(),
        ..author.clone()
    };
    let summary = db
        .update_doc(Collection::Authors, &author.id, &renamed)
        .unwrap();
    assert_eq!((summary.matched, summary.modified), (1, 1));

    // Unknown id
    let summary = db
        .update_doc(Collection::Authors, "missing", &renamed)
        .unwrap();
    assert_eq!((summary.matched, summary.modified), (0, 0));
}

#[test]
fn store_delete_reports_count() {
    let db = Database::open_memory().unwrap();
    let author = Author {
        id: "author-1".to_string(),
        name: "John Doe".to_string(),
        books: Vec::new(),
    };
    db.insert_doc(Collection::Authors, &author.id, &author)
        .unwrap();

    assert_eq!(
        db.delete_doc(Collection::Authors, "author-1").unwrap().deleted,
        1
    );
    assert_eq!(
        db.delete_doc(Collection::Authors, "author-1").unwrap().deleted,
        0
    );
}

#[test]
fn store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("libris.db");

    let db = Database::open(&path).unwrap();
    let author = Author {
        id: "author-1".to_string(),
        name: "John Doe".to_string(),
        books: Vec::new(),
    };
    db.insert_doc(Collection::Authors, &author.id, &author)
        .unwrap();
    drop(db);

    let db = Database::open(&path).unwrap();
    let found: Option<Author> = db.find_doc(Collection::Authors, "author-1").unwrap();
    assert_eq!(found.unwrap().name, "John Doe");
}

// ============================================================================
// CREATE + LINKING
// ============================================================================

#[test]
fn create_book_links_into_author() {
    let state = test_state();

    let author = state
        .authors
        .create(&author_input("John Doe", &[]))
        .unwrap();

    let book = state
        .books
        .create(&book_input("T", "123", &[&author.id]))
        .unwrap();

    let author = state.authors.get(&author.id).unwrap();
    assert_eq!(author.books, vec![book.id.clone()]);
    assert_eq!(book.authors, vec![author.id]);
}

#[test]
fn create_author_links_into_book() {
    let state = test_state();

    let book = state.books.create(&book_input("T", "123", &[])).unwrap();
    let author = state
        .authors
        .create(&author_input("John Doe", &[&book.id]))
        .unwrap();

    let book = state.books.get(&book.id).unwrap();
    assert_eq!(book.authors, vec![author.id]);
}

#[test]
fn create_book_with_unknown_author_fails() {
    let state = test_state();

    let err = state
        .books
        .create(&book_input("T", "123", &["missing"]))
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // The book itself was persisted before the linking failed; writes are
    // independent and nothing is rolled back.
    assert_eq!(state.books.list().unwrap().len(), 1);
}

#[test]
fn duplicate_author_name_is_rejected_case_insensitive() {
    let state = test_state();

    state
        .authors
        .create(&author_input("John Doe", &[]))
        .unwrap();
    let err = state
        .authors
        .create(&author_input("john doe", &[]))
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[test]
fn duplicate_book_isbn_is_rejected_case_insensitive() {
    let state = test_state();

    state.books.create(&book_input("T", "ABC-1", &[])).unwrap();
    let err = state
        .books
        .create(&book_input("Other", "abc-1", &[]))
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[test]
fn create_rejects_missing_fields_before_store_access() {
    let state = test_state();

    assert!(matches!(
        state.authors.create(&author_input("  ", &[])).unwrap_err(),
        AppError::Validation(_)
    ));
    assert!(matches!(
        state.books.create(&book_input("T", "", &[])).unwrap_err(),
        AppError::Validation(_)
    ));
}

// ============================================================================
// UPDATE + RECONCILIATION
// ============================================================================

#[test]
fn clearing_author_books_unlinks_the_books() {
    let state = test_state();

    let author = state
        .authors
        .create(&author_input("John Doe", &[]))
        .unwrap();
    let book = state
        .books
        .create(&book_input("T", "123", &[&author.id]))
        .unwrap();

    let mut updated = state.authors.get(&author.id).unwrap();
    assert_eq!(updated.books, vec![book.id.clone()]);
    updated.books.clear();
    state.authors.update(&updated).unwrap();

    let book = state.books.get(&book.id).unwrap();
    assert!(book.authors.is_empty());
}

#[test]
fn clearing_book_authors_unlinks_the_authors() {
    let state = test_state();

    let author = state
        .authors
        .create(&author_input("John Doe", &[]))
        .unwrap();
    let mut book = state
        .books
        .create(&book_input("T", "123", &[&author.id]))
        .unwrap();

    book.authors.clear();
    state.books.update(&book).unwrap();

    let author = state.authors.get(&author.id).unwrap();
    assert!(author.books.is_empty());
}

#[test]
fn reordered_reference_list_touches_no_foreign_document() {
    let state = test_state();

    let a1 = state.authors.create(&author_input("Ann", &[])).unwrap();
    let a2 = state.authors.create(&author_input("Ben", &[])).unwrap();
    let mut book = state
        .books
        .create(&book_input("T", "123", &[&a1.id, &a2.id]))
        .unwrap();

    // Same ids, different order: set-equal, so reconciliation is skipped.
    // Were it not, the membership toggle below would have unlinked both.
    book.authors = vec![a2.id.clone(), a1.id.clone()];
    state.books.update(&book).unwrap();

    assert_eq!(state.authors.get(&a1.id).unwrap().books, vec![book.id.clone()]);
    assert_eq!(state.authors.get(&a2.id).unwrap().books, vec![book.id.clone()]);
}

#[test]
fn update_toggles_existing_back_reference() {
    // Reference propagation is a membership toggle, not a plain append:
    // an author kept in the book's changed list but already linked gets
    // UNLINKED, while a newly listed author gets linked.
    let state = test_state();

    let a1 = state.authors.create(&author_input("Ann", &[])).unwrap();
    let a2 = state.authors.create(&author_input("Ben", &[])).unwrap();
    let mut book = state
        .books
        .create(&book_input("T", "123", &[&a1.id]))
        .unwrap();

    book.authors = vec![a1.id.clone(), a2.id.clone()];
    state.books.update(&book).unwrap();

    assert!(state.authors.get(&a1.id).unwrap().books.is_empty());
    assert_eq!(state.authors.get(&a2.id).unwrap().books, vec![book.id]);
}

#[test]
fn update_with_unknown_id_is_not_found() {
    let state = test_state();

    let err = state
        .authors
        .update(&Author {
            id: "missing".to_string(),
            name: "John Doe".to_string(),
            books: Vec::new(),
        })
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn update_without_changes_is_not_modified() {
    let state = test_state();

    let author = state
        .authors
        .create(&author_input("John Doe", &[]))
        .unwrap();

    let err = state.authors.update(&author).unwrap_err();
    assert!(matches!(err, AppError::NotModified(_)));

    let mut book = state.books.create(&book_input("T", "123", &[])).unwrap();
    assert!(matches!(
        state.books.update(&book).unwrap_err(),
        AppError::NotModified(_)
    ));

    // An actual change goes through
    book.pages = 250;
    state.books.update(&book).unwrap();
    assert_eq!(state.books.get(&book.id).unwrap().pages, 250);
}

#[test]
fn renaming_author_to_taken_name_is_rejected() {
    let state = test_state();

    state.authors.create(&author_input("Ann", &[])).unwrap();
    let mut ben = state.authors.create(&author_input("Ben", &[])).unwrap();

    ben.name = "ANN".to_string();
    assert!(matches!(
        state.authors.update(&ben).unwrap_err(),
        AppError::Conflict(_)
    ));
}

// ============================================================================
// DELETE
// ============================================================================

#[test]
fn deleting_author_cascades_to_books() {
    let state = test_state();

    let author = state
        .authors
        .create(&author_input("John Doe", &[]))
        .unwrap();
    let b1 = state
        .books
        .create(&book_input("T1", "isbn-1", &[&author.id]))
        .unwrap();
    let b2 = state
        .books
        .create(&book_input("T2", "isbn-2", &[&author.id]))
        .unwrap();

    state.authors.delete(&author.id).unwrap();

    assert!(matches!(
        state.books.get(&b1.id).unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        state.books.get(&b2.id).unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[test]
fn deleting_book_keeps_authors_and_drops_reference() {
    let state = test_state();

    let author = state
        .authors
        .create(&author_input("John Doe", &[]))
        .unwrap();
    let book = state
        .books
        .create(&book_input("T", "123", &[&author.id]))
        .unwrap();

    state.books.delete(&book.id).unwrap();

    let author = state.authors.get(&author.id).unwrap();
    assert!(author.books.is_empty());
}

#[test]
fn deleting_missing_entity_is_not_found() {
    let state = test_state();

    assert!(matches!(
        state.authors.delete("missing").unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        state.books.delete("missing").unwrap_err(),
        AppError::NotFound(_)
    ));
}

// ============================================================================
// CSV EXPORT
// ============================================================================

#[test]
fn books_csv_unwinds_author_references() {
    let state = test_state();

    let a1 = state.authors.create(&author_input("Ann", &[])).unwrap();
    let a2 = state.authors.create(&author_input("Ben", &[])).unwrap();
    state
        .books
        .create(&book_input("T", "123", &[&a1.id, &a2.id]))
        .unwrap();
    state.books.create(&book_input("Solo", "456", &[])).unwrap();

    let csv = state.books.csv().unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "id,title,isbn,pages,authors");
    // One row per author reference plus one for the authorless book
    assert_eq!(lines.len(), 4);
    assert_eq!(csv.matches("123").count(), 2);
}

#[test]
fn authors_csv_quotes_fields_with_separators() {
    let state = test_state();

    state
        .authors
        .create(&author_input("Doe, John", &[]))
        .unwrap();

    let csv = state.authors.csv().unwrap();
    assert!(csv.contains("\"Doe, John\""));
}

// ============================================================================
// USERS + LOGIN
// ============================================================================

#[test]
fn create_user_hashes_password() {
    let state = test_state();

    let user = state
        .users
        .create(&user_input("alice@example.com", "secret"))
        .unwrap();
    assert_ne!(user.password_hash, "secret");

    let err = state
        .users
        .create(&user_input("ALICE@example.com", "other"))
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[test]
fn login_returns_token_for_valid_credentials() {
    let state = test_state();

    let user = state
        .users
        .create(&user_input("alice@example.com", "secret"))
        .unwrap();

    let token = state.auth.login("alice@example.com", "secret").unwrap();
    assert_eq!(token.user.id, user.id);

    let claims = state.auth.verify_token(&token.access_token).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.email, "alice@example.com");
}

#[test]
fn login_rejects_bad_credentials() {
    let state = test_state();

    state
        .users
        .create(&user_input("alice@example.com", "secret"))
        .unwrap();

    assert!(matches!(
        state.auth.login("alice@example.com", "wrong").unwrap_err(),
        AppError::Unauthorized(_)
    ));
    assert!(matches!(
        state.auth.login("bob@example.com", "secret").unwrap_err(),
        AppError::Unauthorized(_)
    ));
}

#[test]
fn user_update_keeps_password_when_omitted() {
    let state = test_state();

    let user = state
        .users
        .create(&user_input("alice@example.com", "secret"))
        .unwrap();

    state
        .users
        .update(
            &user.id,
            &UserUpdate {
                email: "alice@example.com".to_string(),
                password: None,
                name: "Alice".to_string(),
                phone: None,
                dni: None,
                city: None,
                birth_date: None,
            },
        )
        .unwrap();

    // Old password still valid after the update
    assert!(state.auth.login("alice@example.com", "secret").is_ok());
    assert_eq!(state.users.get(&user.id).unwrap().name, "Alice");
}

#[test]
fn user_update_rejects_taken_email() {
    let state = test_state();

    state
        .users
        .create(&user_input("alice@example.com", "secret"))
        .unwrap();
    let bob = state
        .users
        .create(&user_input("bob@example.com", "secret"))
        .unwrap();

    let err = state
        .users
        .update(
            &bob.id,
            &UserUpdate {
                email: "alice@example.com".to_string(),
                password: None,
                name: "Bob".to_string(),
                phone: None,
                dni: None,
                city: None,
                birth_date: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[test]
fn delete_user() {
    let state = test_state();

    let user = state
        .users
        .create(&user_input("alice@example.com", "secret"))
        .unwrap();

    state.users.delete(&user.id).unwrap();
    assert!(matches!(
        state.users.get(&user.id).unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        state.users.delete(&user.id).unwrap_err(),
        AppError::NotFound(_)
    ));
}

// ============================================================================
// SYMMETRY
// ============================================================================

#[test]
fn references_stay_symmetric_across_a_mutation_sequence() {
    let state = test_state();

    let ann = state.authors.create(&author_input("Ann", &[])).unwrap();
    let ben = state.authors.create(&author_input("Ben", &[])).unwrap();
    let b1 = state
        .books
        .create(&book_input("T1", "isbn-1", &[&ann.id]))
        .unwrap();
    let mut b2 = state
        .books
        .create(&book_input("T2", "isbn-2", &[&ann.id, &ben.id]))
        .unwrap();

    // Clear one book's authors, delete the other
    b2.authors.clear();
    state.books.update(&b2).unwrap();
    state.books.delete(&b1.id).unwrap();

    // Every remaining author/book pair agrees in both directions
    for author in state.authors.list().unwrap() {
        for book_id in &author.books {
            let book = state.books.get(book_id).unwrap();
            assert!(book.authors.contains(&author.id));
        }
    }
    for book in state.books.list().unwrap() {
        for author_id in &book.authors {
            let author = state.authors.get(author_id).unwrap();
            assert!(author.books.contains(&book.id));
        }
    }
}
