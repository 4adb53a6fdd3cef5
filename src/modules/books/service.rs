//! Book service: cache-aside reads, store writes, ISBN uniqueness guard.
//!
//! Reads consult the cache first and fall through to the store on any cache
//! failure. Writes go to the store; afterwards `books:all` and every
//! `book:*` entry are invalidated. Cache errors are logged and never change
//! the outcome of a call.
//!
//! The ISBN pre-check and the insert/update are not atomic. The partial
//! unique index on live ISBNs is the real guarantee; a unique violation
//! reported by the store is surfaced as the same `Conflict` the pre-check
//! produces. If the process dies between a committed write and the
//! invalidation, stale entries survive for at most the cache TTL.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;

use bookshelf_cache::Cache;

use super::models::{Book, BookId, CreateBookRequest, NewBook, UpdateBookRequest};
use super::store::{BookStore, StoreError};

pub const ALL_BOOKS_KEY: &str = "books:all";
pub const BOOK_KEY_PATTERN: &str = "book:*";

pub fn book_key(id: BookId) -> String {
    format!("book:{id}")
}

/// Coarse classification handlers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArgument,
    Store,
}

#[derive(Debug, Error)]
pub enum BookError {
    #[error("book not found")]
    NotFound,
    #[error("book with ISBN {isbn} already exists")]
    Conflict { isbn: String },
    #[error("invalid book ID: {0}")]
    InvalidArgument(String),
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl BookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookError::NotFound => ErrorKind::NotFound,
            BookError::Conflict { .. } => ErrorKind::Conflict,
            BookError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            BookError::Store { .. } => ErrorKind::Store,
        }
    }

    fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| BookError::Store { context, source }
    }
}

#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn BookStore>,
    cache: Option<Cache>,
}

impl BookService {
    /// `cache` may be `None`; reads then always hit the store.
    pub fn new(store: Arc<dyn BookStore>, cache: Option<Cache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> Option<&Cache> {
        self.cache.as_ref()
    }

    pub async fn get_all_books(&self) -> Result<Vec<Book>, BookError> {
        if let Some(books) = self.cached::<Vec<Book>>(ALL_BOOKS_KEY).await {
            return Ok(books);
        }

        let books = self
            .store
            .find_all()
            .await
            .map_err(BookError::store("failed to fetch books from database"))?;

        self.populate(ALL_BOOKS_KEY, &books).await;
        Ok(books)
    }

    pub async fn get_book_by_id(&self, id: BookId) -> Result<Book, BookError> {
        let key = book_key(id);
        if let Some(book) = self.cached::<Book>(&key).await {
            return Ok(book);
        }

        let book = self
            .store
            .find_by_id(id)
            .await
            .map_err(BookError::store("failed to fetch book from database"))?
            .ok_or(BookError::NotFound)?;

        self.populate(&key, &book).await;
        Ok(book)
    }

    /// Input is assumed validated by the caller.
    pub async fn create_book(&self, req: CreateBookRequest) -> Result<Book, BookError> {
        self.ensure_isbn_free(&req.isbn, None).await?;

        let new_book = NewBook::from(req);
        let book = self
            .store
            .insert(&new_book)
            .await
            .map_err(|err| Self::write_error(err, &new_book.isbn, "failed to create book"))?;

        tracing::info!(book_id = book.id, isbn = %book.isbn, "book created");
        self.invalidate().await;
        Ok(book)
    }

    pub async fn update_book(&self, id: BookId, req: UpdateBookRequest) -> Result<Book, BookError> {
        let mut book = self.get_book_by_id(id).await?;

        if let Some(isbn) = req.isbn.as_deref() {
            if isbn != book.isbn {
                self.ensure_isbn_free(isbn, Some(id)).await?;
            }
        }

        req.apply_to(&mut book);

        let book = self
            .store
            .update(&book)
            .await
            .map_err(|err| Self::write_error(err, &book.isbn, "failed to update book"))?;

        tracing::info!(book_id = book.id, "book updated");
        self.invalidate().await;
        Ok(book)
    }

    pub async fn delete_book(&self, id: BookId) -> Result<(), BookError> {
        self.get_book_by_id(id).await?;

        self.store.soft_delete(id).await.map_err(|err| match err {
            StoreError::NotFound => BookError::NotFound,
            other => BookError::store("failed to delete book")(other),
        })?;

        tracing::info!(book_id = id, "book deleted");
        self.invalidate().await;
        Ok(())
    }

    /// Parse a decimal, unsigned identifier. Signs, whitespace and values
    /// beyond `BookId::MAX` are rejected.
    pub fn parse_id(raw: &str) -> Result<BookId, BookError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BookError::InvalidArgument(raw.to_string()));
        }
        raw.parse::<BookId>()
            .map_err(|_| BookError::InvalidArgument(raw.to_string()))
    }

    async fn ensure_isbn_free(&self, isbn: &str, exclude: Option<BookId>) -> Result<(), BookError> {
        let existing = self
            .store
            .find_by_isbn(isbn, exclude)
            .await
            .map_err(BookError::store("failed to check ISBN uniqueness"))?;

        match existing {
            Some(_) => Err(BookError::Conflict {
                isbn: isbn.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn write_error(err: StoreError, isbn: &str, context: &'static str) -> BookError {
        match err {
            StoreError::Duplicate { constraint } => {
                tracing::info!(%isbn, %constraint, "ISBN claimed concurrently; store rejected write");
                BookError::Conflict {
                    isbn: isbn.to_string(),
                }
            }
            StoreError::NotFound => BookError::NotFound,
            other => BookError::Store {
                context,
                source: other,
            },
        }
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        match cache.get::<T>(key).await {
            Ok(value) => {
                tracing::debug!(key, "cache hit");
                Some(value)
            }
            Err(err) if err.is_miss() => {
                tracing::debug!(key, "cache miss");
                None
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed; falling back to store");
                None
            }
        }
    }

    async fn populate<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if let Err(err) = cache.set(key, value).await {
            tracing::warn!(key, error = %err, "failed to populate cache");
        }
    }

    async fn invalidate(&self) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if let Err(err) = cache.delete_pattern(BOOK_KEY_PATTERN).await {
            tracing::warn!(pattern = BOOK_KEY_PATTERN, error = %err, "failed to invalidate book cache");
        }
        if let Err(err) = cache.delete(&[ALL_BOOKS_KEY]).await {
            tracing::warn!(key = ALL_BOOKS_KEY, error = %err, "failed to invalidate books list cache");
        }
    }
}
