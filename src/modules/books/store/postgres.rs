use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::{BookStore, StoreError};
use crate::modules::books::models::{Book, BookId, NewBook};

const BOOK_COLUMNS: &str =
    "id, title, author, isbn, published_year, genre, available_copies, created_at, updated_at";

/// Classify by error kind, never by message text.
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        other => StoreError::from_persistence(other),
    }
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id: i32,
    title: String,
    author: String,
    isbn: String,
    published_year: i32,
    genre: String,
    available_copies: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<BookRow> for Book {
    type Error = StoreError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let id = BookId::try_from(row.id)
            .map_err(|_| StoreError::from_persistence(format!("book id {} out of range", row.id)))?;

        Ok(Self {
            id,
            title: row.title,
            author: row.author,
            isbn: row.isbn,
            published_year: row.published_year,
            genre: row.genre,
            available_copies: row.available_copies,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed book store.
#[derive(Clone)]
pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        let rows: Vec<BookRow> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE deleted_at IS NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(Book::try_from).collect()
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        let row: Option<BookRow> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(i64::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Book::try_from).transpose()
    }

    async fn find_by_isbn(
        &self,
        isbn: &str,
        exclude_id: Option<BookId>,
    ) -> Result<Option<Book>, StoreError> {
        let row: Option<BookRow> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             WHERE isbn = $1 AND deleted_at IS NULL AND ($2::INTEGER IS NULL OR id <> $2) \
             LIMIT 1"
        ))
        .bind(isbn)
        .bind(exclude_id.and_then(|id| i32::try_from(id).ok()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Book::try_from).transpose()
    }

    async fn insert(&self, book: &NewBook) -> Result<Book, StoreError> {
        let row: BookRow = sqlx::query_as(&format!(
            "INSERT INTO books (title, author, isbn, published_year, genre, available_copies) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.published_year)
        .bind(&book.genre)
        .bind(book.available_copies)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Book::try_from(row)
    }

    async fn update(&self, book: &Book) -> Result<Book, StoreError> {
        let row: Option<BookRow> = sqlx::query_as(&format!(
            "UPDATE books SET title = $2, author = $3, isbn = $4, published_year = $5, \
             genre = $6, available_copies = $7, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(i64::from(book.id))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.published_year)
        .bind(&book.genre)
        .bind(book.available_copies)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.ok_or(StoreError::NotFound).and_then(Book::try_from)
    }

    async fn soft_delete(&self, id: BookId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE books SET deleted_at = now(), updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(i64::from(id))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
