//! Typed store accessors. No business rules live here.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::error::RepositoryError;
use super::models::{Author, Book, NewAuthor, NewBook};

#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Author>, RepositoryError>;

    /// First author with exactly this name, by ascending id.
    async fn find_by_name(&self, name: &str) -> Result<Option<Author>, RepositoryError>;

    async fn exists_by_name(&self, name: &str) -> Result<bool, RepositoryError>;

    async fn save(&self, author: NewAuthor) -> Result<Author, RepositoryError>;
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Book>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, RepositoryError>;

    /// Exact, case-sensitive match.
    async fn find_by_title(&self, title: &str) -> Result<Option<Book>, RepositoryError>;

    /// Case-insensitive substring match.
    async fn find_by_title_containing(&self, fragment: &str) -> Result<Vec<Book>, RepositoryError>;

    async fn find_by_author_id(&self, author_id: i64) -> Result<Vec<Book>, RepositoryError>;

    async fn exists_by_title(&self, title: &str) -> Result<bool, RepositoryError>;

    /// Insert the book, inserting a new author first when needed. Both rows
    /// commit together or not at all.
    async fn save(&self, book: NewBook) -> Result<Book, RepositoryError>;

    /// Overwrite the price of an existing book; `None` if the id is unknown.
    async fn update_price(&self, id: i64, price: Decimal) -> Result<Option<Book>, RepositoryError>;
}
