pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::{json, Value};
use std::sync::Arc;

use service::BookService;

/// `id` is a 32-bit serial so every stored id fits a `BookId`.
pub(crate) const BOOKS_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS books (
        id               SERIAL PRIMARY KEY,
        title            VARCHAR(255) NOT NULL,
        author           VARCHAR(255) NOT NULL,
        isbn             VARCHAR(20)  NOT NULL,
        published_year   INTEGER      NOT NULL,
        genre            VARCHAR(100) NOT NULL,
        available_copies INTEGER      NOT NULL DEFAULT 0
                         CHECK (available_copies >= 0),
        created_at       TIMESTAMPTZ  NOT NULL DEFAULT now(),
        updated_at       TIMESTAMPTZ  NOT NULL DEFAULT now(),
        deleted_at       TIMESTAMPTZ
    );
    CREATE UNIQUE INDEX IF NOT EXISTS books_isbn_active_unique
        ON books (isbn) WHERE deleted_at IS NULL;
    CREATE INDEX IF NOT EXISTS books_deleted_at_idx ON books (deleted_at);
"#;

/// Book catalogue: CRUD routes over a cached Postgres store.
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(service: BookService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ctx.settings.environment.as_str(),
            cache = self.service.cache().map(|c| c.backend_name()).unwrap_or("disabled"),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(json!({
            "paths": openapi_paths(),
            "components": { "schemas": openapi_schemas() }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration::new("001_init", BOOKS_SCHEMA)]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn openapi_paths() -> Value {
    json!({
        "/": {
            "get": {
                "summary": "List books",
                "tags": ["Books"],
                "responses": {
                    "200": envelope("Books retrieved", json!({
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/Book" }
                    })),
                    "500": bare("Store failure")
                }
            },
            "post": {
                "summary": "Create a book",
                "tags": ["Books"],
                "requestBody": body("CreateBookRequest"),
                "responses": {
                    "201": envelope("Book created", book_ref()),
                    "400": bare("Validation failed"),
                    "409": bare("ISBN already in use"),
                    "500": bare("Store failure")
                }
            }
        },
        "/{id}": {
            "parameters": [{
                "name": "id",
                "in": "path",
                "required": true,
                "schema": { "type": "integer", "format": "int32", "minimum": 0 }
            }],
            "get": {
                "summary": "Fetch a book",
                "tags": ["Books"],
                "responses": {
                    "200": envelope("Book retrieved", book_ref()),
                    "400": bare("Invalid book ID"),
                    "404": bare("Book not found"),
                    "500": bare("Store failure")
                }
            },
            "put": {
                "summary": "Partially update a book",
                "tags": ["Books"],
                "requestBody": body("UpdateBookRequest"),
                "responses": {
                    "200": envelope("Book updated", book_ref()),
                    "400": bare("Invalid book ID or body"),
                    "404": bare("Book not found"),
                    "409": bare("ISBN already in use"),
                    "500": bare("Store failure")
                }
            },
            "delete": {
                "summary": "Delete a book",
                "tags": ["Books"],
                "responses": {
                    "200": bare("Book deleted"),
                    "400": bare("Invalid book ID"),
                    "404": bare("Book not found"),
                    "500": bare("Store failure")
                }
            }
        },
        "/health": {
            "get": {
                "summary": "Books health check",
                "tags": ["Books"],
                "responses": {
                    "200": {
                        "description": "OK",
                        "content": { "text/plain": { "schema": { "type": "string" } } }
                    }
                }
            }
        }
    })
}

fn openapi_schemas() -> Value {
    json!({
        "Book": {
            "type": "object",
            "properties": {
                "id": { "type": "integer", "format": "int32" },
                "title": { "type": "string", "minLength": 1, "maxLength": 255 },
                "author": { "type": "string", "minLength": 1, "maxLength": 255 },
                "isbn": { "type": "string", "minLength": 10, "maxLength": 20 },
                "published_year": { "type": "integer", "minimum": 1000, "maximum": 2100 },
                "genre": { "type": "string", "minLength": 1, "maxLength": 100 },
                "available_copies": { "type": "integer", "minimum": 0 },
                "created_at": { "type": "string", "format": "date-time" },
                "updated_at": { "type": "string", "format": "date-time" }
            },
            "required": [
                "id", "title", "author", "isbn", "published_year", "genre",
                "available_copies", "created_at", "updated_at"
            ]
        },
        "CreateBookRequest": {
            "type": "object",
            "properties": {
                "title": { "type": "string", "minLength": 1, "maxLength": 255 },
                "author": { "type": "string", "minLength": 1, "maxLength": 255 },
                "isbn": { "type": "string", "minLength": 10, "maxLength": 20 },
                "published_year": { "type": "integer", "minimum": 1000, "maximum": 2100 },
                "genre": { "type": "string", "minLength": 1, "maxLength": 100 },
                "available_copies": { "type": "integer", "minimum": 0, "default": 0 }
            },
            "required": ["title", "author", "isbn", "published_year", "genre"]
        },
        "UpdateBookRequest": {
            "type": "object",
            "description": "Absent fields are left unchanged",
            "properties": {
                "title": { "type": "string", "minLength": 1, "maxLength": 255 },
                "author": { "type": "string", "minLength": 1, "maxLength": 255 },
                "isbn": { "type": "string", "minLength": 10, "maxLength": 20 },
                "published_year": { "type": "integer", "minimum": 1000, "maximum": 2100 },
                "genre": { "type": "string", "minLength": 1, "maxLength": 100 },
                "available_copies": { "type": "integer", "minimum": 0 }
            }
        }
    })
}

fn book_ref() -> Value {
    json!({ "$ref": "#/components/schemas/Book" })
}

fn body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

/// Success envelope whose `data` follows `data_schema`.
fn envelope(description: &str, data_schema: Value) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "allOf": [
                        { "$ref": "#/components/schemas/Envelope" },
                        { "type": "object", "properties": { "data": data_schema } }
                    ]
                }
            }
        }
    })
}

/// Envelope without data.
fn bare(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Envelope" }
            }
        }
    })
}

pub fn create_module(service: BookService) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(service))
}
