//! HTTP handlers for the books module.
//!
//! Request bodies are validated here; the service trusts its input.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};

use bookshelf_http::{ApiResponse, AppError};

use super::models::{Book, CreateBookRequest, UpdateBookRequest};
use super::service::{BookError, BookService, ErrorKind};
use crate::utils::Violations;

const VALIDATION_FAILED: &str = "Validation failed";

/// Routes relative to the module mount point.
pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
        .with_state(service)
}

/// Always 200: the cache is optional, so a failing ping only changes the text.
async fn health(State(service): State<BookService>) -> &'static str {
    let Some(cache) = service.cache() else {
        return "books module is healthy";
    };
    match cache.health_check().await {
        Ok(()) => "books module is healthy",
        Err(err) => {
            tracing::warn!(error = %err, "cache health check failed");
            "books module is healthy (cache degraded)"
        }
    }
}

async fn list_books(
    State(service): State<BookService>,
) -> Result<ApiResponse<Vec<Book>>, AppError> {
    let books = service
        .get_all_books()
        .await
        .map_err(|err| to_app_error(err, "Failed to fetch books"))?;

    Ok(ApiResponse::ok("Books retrieved successfully", books))
}

async fn get_book(
    State(service): State<BookService>,
    Path(raw_id): Path<String>,
) -> Result<ApiResponse<Book>, AppError> {
    let id = BookService::parse_id(&raw_id)
        .map_err(|err| to_app_error(err, "Invalid book ID"))?;
    let book = service
        .get_book_by_id(id)
        .await
        .map_err(|err| to_app_error(err, "Failed to fetch book"))?;

    Ok(ApiResponse::ok("Book retrieved successfully", book))
}

async fn create_book(
    State(service): State<BookService>,
    body: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<ApiResponse<Book>, AppError> {
    let Json(req) = body?;
    validate_create(&req)?;

    let book = service
        .create_book(req)
        .await
        .map_err(|err| to_app_error(err, "Failed to create book"))?;

    Ok(ApiResponse::created("Book created successfully", book))
}

async fn update_book(
    State(service): State<BookService>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<ApiResponse<Book>, AppError> {
    let id = BookService::parse_id(&raw_id)
        .map_err(|err| to_app_error(err, "Invalid book ID"))?;
    let Json(req) = body?;
    validate_update(&req)?;

    let book = service
        .update_book(id, req)
        .await
        .map_err(|err| to_app_error(err, "Failed to update book"))?;

    Ok(ApiResponse::ok("Book updated successfully", book))
}

async fn delete_book(
    State(service): State<BookService>,
    Path(raw_id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let id = BookService::parse_id(&raw_id)
        .map_err(|err| to_app_error(err, "Invalid book ID"))?;
    service
        .delete_book(id)
        .await
        .map_err(|err| to_app_error(err, "Failed to delete book"))?;

    Ok(ApiResponse::message("Book deleted successfully"))
}

/// `failure` is the client message for store errors of this operation.
fn to_app_error(err: BookError, failure: &'static str) -> AppError {
    match err.kind() {
        ErrorKind::NotFound => AppError::not_found("Book not found", err),
        ErrorKind::Conflict => AppError::conflict("Book with this ISBN already exists", err),
        ErrorKind::InvalidArgument => AppError::bad_request("Invalid book ID", err),
        ErrorKind::Store => AppError::internal(failure, err),
    }
}

fn validate_create(req: &CreateBookRequest) -> Result<(), AppError> {
    Violations::new()
        .length("title", &req.title, 1, 255)
        .length("author", &req.author, 1, 255)
        .length("isbn", &req.isbn, 10, 20)
        .range("published_year", req.published_year, 1000, 2100)
        .length("genre", &req.genre, 1, 100)
        .at_least("available_copies", req.available_copies, 0)
        .finish()
        .map_err(|details| AppError::validation(details, VALIDATION_FAILED))
}

fn validate_update(req: &UpdateBookRequest) -> Result<(), AppError> {
    let mut violations = Violations::new();
    if let Some(title) = &req.title {
        violations.length("title", title, 1, 255);
    }
    if let Some(author) = &req.author {
        violations.length("author", author, 1, 255);
    }
    if let Some(isbn) = &req.isbn {
        violations.length("isbn", isbn, 10, 20);
    }
    if let Some(year) = req.published_year {
        violations.range("published_year", year, 1000, 2100);
    }
    if let Some(genre) = &req.genre {
        violations.length("genre", genre, 1, 100);
    }
    if let Some(copies) = req.available_copies {
        violations.at_least("available_copies", copies, 0);
    }
    violations
        .finish()
        .map_err(|details| AppError::validation(details, VALIDATION_FAILED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::store::memory::MemoryBookStore;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use bookshelf_cache::{Cache, InMemoryBackend};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<MemoryBookStore>) {
        let store = Arc::new(MemoryBookStore::new());
        let service = BookService::new(store.clone(), Some(Cache::new(InMemoryBackend::new())));
        (router(service), store)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn dune() -> Value {
        json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "isbn": "978-0441172719",
            "published_year": 1965,
            "genre": "Science Fiction",
            "available_copies": 4
        })
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let (app, _) = app();

        let (status, body) = send(&app, Method::POST, "/", Some(dune())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Book created successfully");
        let id = body["data"]["id"].as_u64().unwrap();

        let (status, body) = send(&app, Method::GET, &format!("/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Book retrieved successfully");
        assert_eq!(body["data"]["isbn"], "978-0441172719");
        assert!(body.get("error").is_none());

        let (status, body) = send(&app, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_409() {
        let (app, _) = app();
        send(&app, Method::POST, "/", Some(dune())).await;

        let (status, body) = send(&app, Method::POST, "/", Some(dune())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Book with this ISBN already exists");
        assert!(body["error"].as_str().unwrap().contains("978-0441172719"));
    }

    #[tokio::test]
    async fn invalid_body_reports_every_field() {
        let (app, _) = app();
        let mut book = dune();
        book["title"] = json!("");
        book["published_year"] = json!(999);
        book["available_copies"] = json!(-1);

        let (status, body) = send(&app, Method::POST, "/", Some(book)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(
            body["error"],
            "title must be between 1 and 255 characters, \
             published_year must be between 1000 and 2100, \
             available_copies must be at least 0"
        );
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let (app, _) = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\":"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_numeric_id_is_400() {
        let (app, _) = app();
        for uri in ["/abc", "/-1", "/4294967296"] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["message"], "Invalid book ID");
        }
    }

    #[tokio::test]
    async fn missing_book_is_404() {
        let (app, _) = app();
        let (status, body) = send(&app, Method::GET, "/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Book not found");

        let (status, _) = send(&app, Method::DELETE, "/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn partial_update_and_delete() {
        let (app, _) = app();
        let (_, created) = send(&app, Method::POST, "/", Some(dune())).await;
        let id = created["data"]["id"].as_u64().unwrap();

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/{id}"),
            Some(json!({"available_copies": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Book updated successfully");
        assert_eq!(body["data"]["available_copies"], 1);
        assert_eq!(body["data"]["title"], "Dune");

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/{id}"),
            Some(json!({"isbn": "123"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "isbn must be between 10 and 20 characters");

        let (status, body) = send(&app, Method::DELETE, &format!("/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "message": "Book deleted successfully"}));

        let (status, _) = send(&app, Method::GET, &format!("/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_failure_is_500_with_operation_message() {
        let (app, store) = app();
        store.set_failing(true);

        let (status, body) = send(&app, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Failed to fetch books");
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn module_health_is_plain_text() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
