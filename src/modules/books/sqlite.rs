use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, error, instrument};

use super::error::RepositoryError;
use super::models::{Author, Book, BookAuthor, NewAuthor, NewBook};
use super::pricing;
use super::repository::{AuthorRepository, BookRepository};

/// Tables backing the catalog.
///
/// `price` is TEXT on purpose: a DECIMAL column gets NUMERIC affinity in
/// SQLite and would be stored as a binary float.
pub const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS authors (
        id   INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        bio  TEXT
    );
    CREATE TABLE IF NOT EXISTS books (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        title     TEXT NOT NULL,
        author_id INTEGER NOT NULL REFERENCES authors(id),
        price     TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_authors_name ON authors(name);
    CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
    CREATE INDEX IF NOT EXISTS idx_books_author_id ON books(author_id);
"#;

type AuthorRow = (i64, String, Option<String>);
type BookRow = (i64, String, String, i64, String, Option<String>);

const AUTHOR_SELECT: &str = "SELECT id, name, bio FROM authors";

const BOOK_SELECT: &str = "SELECT b.id, b.title, b.price, a.id, a.name, a.bio
     FROM books b
     JOIN authors a ON a.id = b.author_id";

fn row_to_author(row: AuthorRow) -> Author {
    let (id, name, bio) = row;
    Author { id, name, bio }
}

fn row_to_book(row: BookRow) -> Result<Book, RepositoryError> {
    let (id, title, price, author_id, name, bio) = row;

    let price = Decimal::from_str(&price).map_err(|e| RepositoryError::CorruptRow {
        table: "books",
        message: format!("book {} has unparsable price '{}': {}", id, price, e),
    })?;

    Ok(Book {
        id,
        title,
        price,
        author: Author {
            id: author_id,
            name,
            bio,
        },
    })
}

fn rows_to_books(rows: Vec<BookRow>) -> Result<Vec<Book>, RepositoryError> {
    rows.into_iter().map(row_to_book).collect()
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> RepositoryError {
    move |e| {
        error!(error = %e, "{}", context);
        RepositoryError::Database(e)
    }
}

async fn insert_author<'e, E>(executor: E, author: &NewAuthor) -> Result<Author, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, AuthorRow>(
        "INSERT INTO authors (name, bio) VALUES (?, ?) RETURNING id, name, bio",
    )
    .bind(&author.name)
    .bind(&author.bio)
    .fetch_one(executor)
    .await?;

    Ok(row_to_author(row))
}

pub struct SqliteAuthorRepository {
    pool: SqlitePool,
}

impl SqliteAuthorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorRepository for SqliteAuthorRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Author>, RepositoryError> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!("{} WHERE id = ?", AUTHOR_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to query author by id"))?;

        Ok(row.map(row_to_author))
    }

    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> Result<Option<Author>, RepositoryError> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!(
            "{} WHERE name = ? ORDER BY id LIMIT 1",
            AUTHOR_SELECT
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to query author by name"))?;

        Ok(row.map(row_to_author))
    }

    #[instrument(skip(self))]
    async fn exists_by_name(&self, name: &str) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM authors WHERE name = ?)")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("Failed to check author name"))?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn save(&self, author: NewAuthor) -> Result<Author, RepositoryError> {
        let saved = insert_author(&self.pool, &author)
            .await
            .map_err(db_error("Failed to insert author"))?;

        debug!(author_id = saved.id, "author saved");
        Ok(saved)
    }
}

pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Book>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!("{} ORDER BY b.id", BOOK_SELECT))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to query all books"))?;

        rows_to_books(rows)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{} WHERE b.id = ?", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to query book by id"))?;

        row.map(row_to_book).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_title(&self, title: &str) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "{} WHERE b.title = ? ORDER BY b.id LIMIT 1",
            BOOK_SELECT
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to query book by title"))?;

        row.map(row_to_book).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_title_containing(&self, fragment: &str) -> Result<Vec<Book>, RepositoryError> {
        // instr() sidesteps LIKE wildcards in user input.
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "{} WHERE instr(lower(b.title), lower(?)) > 0 ORDER BY b.id",
            BOOK_SELECT
        ))
        .bind(fragment)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to search books by title"))?;

        rows_to_books(rows)
    }

    #[instrument(skip(self))]
    async fn find_by_author_id(&self, author_id: i64) -> Result<Vec<Book>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "{} WHERE a.id = ? ORDER BY b.id",
            BOOK_SELECT
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to query books by author"))?;

        rows_to_books(rows)
    }

    #[instrument(skip(self))]
    async fn exists_by_title(&self, title: &str) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM books WHERE title = ?)")
                .bind(title)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("Failed to check book title"))?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn save(&self, book: NewBook) -> Result<Book, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to open transaction"))?;

        let author = match book.author {
            BookAuthor::Existing(author) => author,
            BookAuthor::New(new_author) => insert_author(&mut *tx, &new_author)
                .await
                .map_err(db_error("Failed to insert author"))?,
        };

        let price = pricing::normalize(book.price);

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO books (title, author_id, price) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&book.title)
        .bind(author.id)
        .bind(price.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to insert book"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit book"))?;

        debug!(book_id = id, author_id = author.id, "book saved");

        Ok(Book {
            id,
            title: book.title,
            price,
            author,
        })
    }

    #[instrument(skip(self))]
    async fn update_price(&self, id: i64, price: Decimal) -> Result<Option<Book>, RepositoryError> {
        let price = pricing::normalize(price);

        let result = sqlx::query("UPDATE books SET price = ? WHERE id = ?")
            .bind(price.to_string())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update book price"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn memory_pool() -> SqlitePool {
        let settings = libris_kernel::settings::DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let pool = libris_db::connect(&settings).await.unwrap();
        sqlx::raw_sql(SCHEMA).execute(&pool).await.unwrap();
        pool
    }

    fn price(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn new_book(title: &str, author: BookAuthor, value: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            price: price(value),
            author,
        }
    }

    fn fowler() -> BookAuthor {
        BookAuthor::New(NewAuthor {
            name: "Martin Fowler".to_string(),
            bio: Some("Chief Scientist".to_string()),
        })
    }

    #[tokio::test]
    async fn save_with_new_author_assigns_both_ids() {
        let pool = memory_pool().await;
        let books = SqliteBookRepository::new(pool.clone());
        let authors = SqliteAuthorRepository::new(pool);

        let saved = books
            .save(new_book("Refactoring", fowler(), "39.99"))
            .await
            .unwrap();

        assert!(saved.id > 0);
        assert!(saved.author.id > 0);
        assert_eq!(
            authors.find_by_id(saved.author.id).await.unwrap(),
            Some(saved.author.clone())
        );
        assert_eq!(books.find_by_id(saved.id).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn prices_round_trip_exactly() {
        let pool = memory_pool().await;
        let books = SqliteBookRepository::new(pool);

        let saved = books
            .save(new_book("Huge", fowler(), "99999999.99"))
            .await
            .unwrap();
        let loaded = books.find_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(loaded.price.to_string(), "99999999.99");

        let updated = books.update_price(saved.id, price("0.1")).await.unwrap().unwrap();
        assert_eq!(updated.price.to_string(), "0.10");
    }

    #[tokio::test]
    async fn title_lookups() {
        let pool = memory_pool().await;
        let books = SqliteBookRepository::new(pool);
        books
            .save(new_book("Clean Code", fowler(), "49.99"))
            .await
            .unwrap();
        books
            .save(new_book("100% Coverage_Guide", fowler(), "9.99"))
            .await
            .unwrap();

        assert!(books.find_by_title("Clean Code").await.unwrap().is_some());
        assert!(books.find_by_title("clean code").await.unwrap().is_none());
        assert!(books.exists_by_title("Clean Code").await.unwrap());
        assert!(!books.exists_by_title("Dirty Code").await.unwrap());

        for query in ["clean", "CODE", "Clean"] {
            let found = books.find_by_title_containing(query).await.unwrap();
            assert_eq!(found.len(), 1, "query {query}");
        }

        // Wildcard characters match literally.
        assert_eq!(books.find_by_title_containing("%").await.unwrap().len(), 1);
        assert_eq!(books.find_by_title_containing("e_g").await.unwrap().len(), 1);
        assert!(books.find_by_title_containing("rust").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn author_lookups_and_books_by_author() {
        let pool = memory_pool().await;
        let books = SqliteBookRepository::new(pool.clone());
        let authors = SqliteAuthorRepository::new(pool);

        let bloch = authors
            .save(NewAuthor {
                name: "Joshua Bloch".to_string(),
                bio: None,
            })
            .await
            .unwrap();
        books
            .save(new_book("Effective Java", BookAuthor::Existing(bloch.clone()), "44.99"))
            .await
            .unwrap();
        books
            .save(new_book("Java Puzzlers", BookAuthor::Existing(bloch.clone()), "29.99"))
            .await
            .unwrap();
        books
            .save(new_book("Refactoring", fowler(), "39.99"))
            .await
            .unwrap();

        assert!(authors.exists_by_name("Joshua Bloch").await.unwrap());
        assert!(!authors.exists_by_name("joshua bloch").await.unwrap());
        assert_eq!(
            authors.find_by_name("Joshua Bloch").await.unwrap(),
            Some(bloch.clone())
        );

        let titles: Vec<_> = books
            .find_by_author_id(bloch.id)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Effective Java", "Java Puzzlers"]);
        assert_eq!(books.find_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_price_of_unknown_book_is_none() {
        let pool = memory_pool().await;
        let books = SqliteBookRepository::new(pool);
        assert!(books.update_price(42, price("1.00")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unparsable_price_is_reported_as_corrupt() {
        let pool = memory_pool().await;
        let books = SqliteBookRepository::new(pool.clone());
        let saved = books
            .save(new_book("Refactoring", fowler(), "39.99"))
            .await
            .unwrap();

        sqlx::query("UPDATE books SET price = 'cheap' WHERE id = ?")
            .bind(saved.id)
            .execute(&pool)
            .await
            .unwrap();

        let err = books.find_by_id(saved.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::CorruptRow { table: "books", .. }));
    }
}
