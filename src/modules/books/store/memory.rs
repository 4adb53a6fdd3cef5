//! In-process store used by the service and route tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use time::OffsetDateTime;

use super::{BookStore, StoreError, ISBN_UNIQUE_CONSTRAINT};
use crate::modules::books::models::{Book, BookId, NewBook};

struct Row {
    book: Book,
    deleted: bool,
}

/// Mirrors the Postgres schema: ids are never reused, soft-deleted rows stay
/// in the map, and ISBNs are unique among live rows only.
#[derive(Default)]
pub struct MemoryBookStore {
    rows: Mutex<BTreeMap<BookId, Row>>,
    next_id: Mutex<BookId>,
    reads: AtomicUsize,
    /// Make `find_by_isbn` report nothing, simulating a racing creator.
    blind_isbn_lookup: AtomicBool,
    /// Make every call fail with a persistence error.
    fail: AtomicBool,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read queries served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_blind_isbn_lookup(&self, blind: bool) {
        self.blind_isbn_lookup.store(blind, Ordering::SeqCst);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::from_persistence("connection refused"));
        }
        Ok(())
    }

    fn read(&self) -> Result<(), StoreError> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn isbn_taken(rows: &BTreeMap<BookId, Row>, isbn: &str, exclude: Option<BookId>) -> bool {
        rows.values()
            .any(|row| !row.deleted && row.book.isbn == isbn && Some(row.book.id) != exclude)
    }

    fn duplicate() -> StoreError {
        StoreError::Duplicate {
            constraint: ISBN_UNIQUE_CONSTRAINT.to_string(),
        }
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        self.read()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|row| !row.deleted)
            .map(|row| row.book.clone())
            .collect())
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        self.read()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .get(&id)
            .filter(|row| !row.deleted)
            .map(|row| row.book.clone()))
    }

    async fn find_by_isbn(
        &self,
        isbn: &str,
        exclude_id: Option<BookId>,
    ) -> Result<Option<Book>, StoreError> {
        self.read()?;
        if self.blind_isbn_lookup.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .find(|row| !row.deleted && row.book.isbn == isbn && Some(row.book.id) != exclude_id)
            .map(|row| row.book.clone()))
    }

    async fn insert(&self, book: &NewBook) -> Result<Book, StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if Self::isbn_taken(&rows, &book.isbn, None) {
            return Err(Self::duplicate());
        }

        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let now = OffsetDateTime::now_utc();
        let stored = Book {
            id: *next_id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            published_year: book.published_year,
            genre: book.genre.clone(),
            available_copies: book.available_copies,
            created_at: now,
            updated_at: now,
        };
        rows.insert(
            stored.id,
            Row {
                book: stored.clone(),
                deleted: false,
            },
        );
        Ok(stored)
    }

    async fn update(&self, book: &Book) -> Result<Book, StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if Self::isbn_taken(&rows, &book.isbn, Some(book.id)) {
            return Err(Self::duplicate());
        }

        let row = rows
            .get_mut(&book.id)
            .filter(|row| !row.deleted)
            .ok_or(StoreError::NotFound)?;

        let created_at = row.book.created_at;
        row.book = Book {
            created_at,
            updated_at: OffsetDateTime::now_utc(),
            ..book.clone()
        };
        Ok(row.book.clone())
    }

    async fn soft_delete(&self, id: BookId) -> Result<(), StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(row) if !row.deleted => {
                row.deleted = true;
                row.book.updated_at = OffsetDateTime::now_utc();
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}
