//! Catalog service: validation, author resolution and pricing over the
//! repository facade.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;

use super::error::CatalogError;
use super::models::{
    AuthorRef, BookAuthor, BookView, CreateBookRequest, NewAuthor, NewBook,
};
use super::pricing;
use super::repository::{AuthorRepository, BookRepository};

pub struct CatalogService {
    books: Arc<dyn BookRepository>,
    authors: Arc<dyn AuthorRepository>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl CatalogService {
    pub fn new(books: Arc<dyn BookRepository>, authors: Arc<dyn AuthorRepository>) -> Self {
        Self { books, authors }
    }

    pub async fn get_all_books(&self) -> Result<Vec<BookView>, CatalogError> {
        let books = self.books.find_all().await?;
        Ok(books.into_iter().map(BookView::from).collect())
    }

    pub async fn get_book_by_id(&self, id: i64) -> Result<Option<BookView>, CatalogError> {
        Ok(self.books.find_by_id(id).await?.map(BookView::from))
    }

    pub async fn find_book_by_title(&self, title: &str) -> Result<Option<BookView>, CatalogError> {
        Ok(self.books.find_by_title(title).await?.map(BookView::from))
    }

    pub async fn find_books_by_title_containing(
        &self,
        fragment: &str,
    ) -> Result<Vec<BookView>, CatalogError> {
        let books = self.books.find_by_title_containing(fragment).await?;
        Ok(books.into_iter().map(BookView::from).collect())
    }

    pub async fn get_books_by_author(&self, author_id: i64) -> Result<Vec<BookView>, CatalogError> {
        let books = self.books.find_by_author_id(author_id).await?;
        Ok(books.into_iter().map(BookView::from).collect())
    }

    /// Create a book, linking an existing author by id or creating one by name.
    ///
    /// Rules are checked in a fixed order and the first failure is returned.
    #[instrument(skip(self))]
    pub async fn create_book(
        &self,
        input: Option<CreateBookRequest>,
    ) -> Result<BookView, CatalogError> {
        let input = input.ok_or_else(|| CatalogError::invalid("payload empty"))?;

        if is_blank(&input.title) {
            return Err(CatalogError::invalid("title is required"));
        }
        let title = input.title.unwrap_or_default();

        let price = input
            .price
            .ok_or_else(|| CatalogError::invalid("price is required"))?;
        if price < Decimal::ZERO {
            return Err(CatalogError::invalid("price must be non-negative"));
        }
        if pricing::exceeds_max(price) {
            return Err(CatalogError::invalid("price exceeds maximum"));
        }

        let author = input
            .author
            .ok_or_else(|| CatalogError::invalid("author is required"))?;

        let author_ref = match author.id {
            Some(id) => AuthorRef::ExistingId(id),
            None if is_blank(&author.name) => {
                return Err(CatalogError::invalid("author.name is required"));
            }
            None => AuthorRef::NewAuthor {
                name: author.name.unwrap_or_default(),
                bio: author.bio,
            },
        };

        let author = self.resolve_author(author_ref).await?;

        let saved = self
            .books
            .save(NewBook {
                title,
                price,
                author,
            })
            .await?;

        tracing::info!(
            book_id = saved.id,
            author_id = saved.author.id,
            "book created"
        );

        Ok(saved.into())
    }

    async fn resolve_author(&self, author_ref: AuthorRef) -> Result<BookAuthor, CatalogError> {
        match author_ref {
            AuthorRef::ExistingId(id) => self
                .authors
                .find_by_id(id)
                .await?
                .map(BookAuthor::Existing)
                .ok_or_else(|| CatalogError::invalid("author not found")),
            AuthorRef::NewAuthor { name, bio } => Ok(BookAuthor::New(NewAuthor { name, bio })),
        }
    }

    /// Add a book for an author that must already exist under `author_name`.
    #[instrument(skip(self))]
    pub async fn add_book_by_author_name(
        &self,
        title: &str,
        author_name: &str,
        price: Decimal,
    ) -> Result<BookView, CatalogError> {
        if title.trim().is_empty() {
            return Err(CatalogError::invalid("title is required"));
        }
        if author_name.trim().is_empty() {
            return Err(CatalogError::invalid("author.name is required"));
        }
        if price < Decimal::ZERO {
            return Err(CatalogError::invalid("price must be non-negative"));
        }
        if pricing::exceeds_max(price) {
            return Err(CatalogError::invalid("price exceeds maximum"));
        }

        if self.books.exists_by_title(title).await? {
            return Err(CatalogError::invalid(format!(
                "Book with title '{}' already exists",
                title
            )));
        }

        let author = self
            .authors
            .find_by_name(author_name)
            .await?
            .ok_or_else(|| CatalogError::invalid(format!("Author '{}' not found", author_name)))?;

        let saved = self
            .books
            .save(NewBook {
                title: title.to_string(),
                price,
                author: BookAuthor::Existing(author),
            })
            .await?;

        tracing::info!(book_id = saved.id, author_id = saved.author.id, "book added");

        Ok(saved.into())
    }

    /// Reduce a book's price by `percentage` percent (0 to 100 inclusive).
    #[instrument(skip(self))]
    pub async fn apply_discount(
        &self,
        book_id: i64,
        percentage: Decimal,
    ) -> Result<BookView, CatalogError> {
        if !pricing::is_valid_percentage(percentage) {
            return Err(CatalogError::invalid(
                "Discount percentage must be between 0 and 100",
            ));
        }

        let not_found = || CatalogError::invalid(format!("Book with id {} not found", book_id));

        let book = self.books.find_by_id(book_id).await?.ok_or_else(not_found)?;

        let new_price = pricing::apply_discount(book.price, percentage)
            .ok_or(CatalogError::PriceOverflow { book_id })?;

        let updated = self
            .books
            .update_price(book.id, new_price)
            .await?
            .ok_or_else(not_found)?;

        tracing::info!(
            book_id,
            %percentage,
            old_price = %book.price,
            new_price = %updated.price,
            "discount applied"
        );

        Ok(updated.into())
    }
}
