pub mod error;
pub mod models;
pub mod pricing;
pub mod repository;
pub mod routes;
pub mod service;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use libris_kernel::{InitCtx, Module, Schema};
use once_cell::sync::OnceCell;
use serde_json::json;

use service::CatalogService;
use sqlite::{SqliteAuthorRepository, SqliteBookRepository};

/// Book and author catalog
pub struct BooksModule {
    service: OnceCell<Arc<CatalogService>>,
}

impl BooksModule {
    pub const fn new() -> Self {
        Self {
            service: OnceCell::new(),
        }
    }

    /// The catalog service; `None` until [`Module::init`] has run.
    pub fn service(&self) -> Option<&Arc<CatalogService>> {
        self.service.get()
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let service = CatalogService::new(
            Arc::new(SqliteBookRepository::new(ctx.db.clone())),
            Arc::new(SqliteAuthorRepository::new(ctx.db.clone())),
        );

        if self.service.set(Arc::new(service)).is_err() {
            anyhow::bail!("books module initialized twice");
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        match self.service.get() {
            Some(service) => routes::router(service.clone()),
            None => {
                tracing::warn!(module = self.name(), "routes requested before init");
                Router::new()
            }
        }
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn schema(&self) -> Vec<Schema> {
        vec![Schema {
            id: "001_catalog",
            ddl: sqlite::SCHEMA,
        }]
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

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn book_list_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "type": "array",
                    "items": { "$ref": "#/components/schemas/Book" }
                }
            }
        }
    })
}

fn path_param(name: &str, schema_type: &str) -> serde_json::Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "schema": { "type": schema_type }
    })
}

fn openapi_fragment() -> serde_json::Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": book_list_response("All books"),
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book, optionally creating its author",
                    "tags": ["Books"],
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": {
                        "201": book_response("Created book"),
                        "400": error_response("Invalid input"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book by id",
                    "tags": ["Books"],
                    "parameters": [path_param("id", "integer")],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/search": {
                "get": {
                    "summary": "Case-insensitive title substring search",
                    "tags": ["Books"],
                    "parameters": [{
                        "name": "title",
                        "in": "query",
                        "required": true,
                        "schema": { "type": "string" }
                    }],
                    "responses": {
                        "200": book_list_response("Matching books"),
                        "400": error_response("Missing title")
                    }
                }
            },
            "/title/{title}": {
                "get": {
                    "summary": "Exact title lookup",
                    "tags": ["Books"],
                    "parameters": [path_param("title", "string")],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/author/{author_id}": {
                "get": {
                    "summary": "Books by author id",
                    "tags": ["Books"],
                    "parameters": [path_param("author_id", "integer")],
                    "responses": {
                        "200": book_list_response("The author's books")
                    }
                }
            },
            "/by-author": {
                "post": {
                    "summary": "Add a book for an existing author, by name",
                    "tags": ["Books"],
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/AddBookByAuthorName" }
                            }
                        }
                    },
                    "responses": {
                        "201": book_response("Created book"),
                        "400": error_response("Invalid input")
                    }
                }
            },
            "/{id}/discount": {
                "put": {
                    "summary": "Apply a percentage discount",
                    "tags": ["Books"],
                    "parameters": [path_param("id", "integer")],
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/Discount" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Updated book"),
                        "400": error_response("Invalid input"),
                        "500": error_response("Internal server error")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Author": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "name": { "type": "string" },
                        "bio": { "type": ["string", "null"] }
                    },
                    "required": ["id", "name"]
                },
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "title": { "type": "string" },
                        "author": { "$ref": "#/components/schemas/Author" },
                        "price": { "type": "number" }
                    },
                    "required": ["id", "title", "author", "price"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "price": { "type": "number", "minimum": 0 },
                        "author": {
                            "type": "object",
                            "description": "Either `id` of an existing author or `name` (and optional `bio`) of a new one",
                            "properties": {
                                "id": { "type": "integer" },
                                "name": { "type": "string" },
                                "bio": { "type": "string" }
                            }
                        }
                    },
                    "required": ["title", "price", "author"]
                },
                "AddBookByAuthorName": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "authorName": { "type": "string" },
                        "price": { "type": "number", "minimum": 0 }
                    },
                    "required": ["title", "authorName", "price"]
                },
                "Discount": {
                    "type": "object",
                    "properties": {
                        "discountPercentage": { "type": "number", "minimum": 0, "maximum": 100 }
                    },
                    "required": ["discountPercentage"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<BooksModule> {
    Arc::new(BooksModule::new())
}
