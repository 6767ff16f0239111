use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A persisted author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub bio: Option<String>,
}

/// A persisted book together with its (single) author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub price: Decimal,
    pub author: Author,
}

/// Author data not yet assigned an id by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub name: String,
    pub bio: Option<String>,
}

/// How the caller identified a book's author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorRef {
    ExistingId(i64),
    NewAuthor { name: String, bio: Option<String> },
}

/// A book's author after resolution, ready to be persisted with the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookAuthor {
    Existing(Author),
    New(NewAuthor),
}

/// A validated book awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub price: Decimal,
    pub author: BookAuthor,
}

/// Author as embedded in a book response; never carries the author's books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: i64,
    pub name: String,
    pub bio: Option<String>,
}

/// Book representation returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookView {
    pub id: i64,
    pub title: String,
    pub author: AuthorView,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<Author> for AuthorView {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            name: author.name,
            bio: author.bio,
        }
    }
}

impl From<Book> for BookView {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author.into(),
            price: book.price,
        }
    }
}

/// Request body for creating a book. Every field is optional so the service
/// can report the first missing one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub author: Option<AuthorInput>,
}

/// Author sub-object of [`CreateBookRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorInput {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRequest {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_percentage: Option<Decimal>,
}

/// Request body for adding a book to an author looked up by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBookByAuthorNameRequest {
    pub title: String,
    pub author_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleSearch {
    pub title: Option<String>,
}
