pub mod books;

use bookshelf_kernel::ModuleRegistry;

use books::service::BookService;

/// Register every application module with the registry.
pub fn register_all(registry: &mut ModuleRegistry, book_service: BookService) {
    registry.register(books::create_module(book_service));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use bookshelf_kernel::settings::Settings;
    use std::sync::Arc;
    use tower::ServiceExt;

    use books::store::memory::MemoryBookStore;

    #[tokio::test]
    async fn books_are_served_under_the_api_prefix() {
        let mut registry = ModuleRegistry::new();
        register_all(
            &mut registry,
            BookService::new(Arc::new(MemoryBookStore::new()), None),
        );
        let app = bookshelf_http::build_router(&registry, &Settings::default());

        for uri in ["/api/v1/books", "/api/v1/books/health"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert!(response.headers().contains_key("x-request-id"));
        }
    }
}
