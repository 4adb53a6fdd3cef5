use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Store-assigned book identifier.
pub type BookId = u32;

/// A catalogued book. Soft-deleted rows never reach this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_year: i32,
    pub genre: String,
    pub available_copies: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Request body for creating a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_year: i32,
    pub genre: String,
    #[serde(default)]
    pub available_copies: i32,
}

/// Request body for a partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_copies: Option<i32>,
}

/// Column values for a row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_year: i32,
    pub genre: String,
    pub available_copies: i32,
}

impl From<CreateBookRequest> for NewBook {
    fn from(req: CreateBookRequest) -> Self {
        Self {
            title: req.title,
            author: req.author,
            isbn: req.isbn,
            published_year: req.published_year,
            genre: req.genre,
            available_copies: req.available_copies,
        }
    }
}

impl UpdateBookRequest {
    /// Overwrite only the fields present in the request.
    pub fn apply_to(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
        if let Some(published_year) = self.published_year {
            book.published_year = published_year;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(available_copies) = self.available_copies {
            book.available_copies = available_copies;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Book {
        Book {
            id: 1,
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            isbn: "978-1718503106".to_string(),
            published_year: 2023,
            genre: "Programming".to_string(),
            available_copies: 3,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn partial_update_only_touches_present_fields() {
        let mut book = sample();
        UpdateBookRequest {
            genre: Some("Systems".to_string()),
            ..UpdateBookRequest::default()
        }
        .apply_to(&mut book);

        let mut expected = sample();
        expected.genre = "Systems".to_string();
        assert_eq!(book, expected);
    }

    #[test]
    fn available_copies_defaults_to_zero() {
        let req: CreateBookRequest = serde_json::from_str(
            r#"{"title":"Dune","author":"Frank Herbert","isbn":"978-0441172719",
                "published_year":1965,"genre":"Science Fiction"}"#,
        )
        .unwrap();
        assert_eq!(NewBook::from(req).available_copies, 0);
    }

    #[test]
    fn book_json_round_trips_with_rfc3339_timestamps() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");

        let back: Book = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }
}
