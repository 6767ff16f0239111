use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use libris_http::error::AppError;
use serde::de::DeserializeOwned;

use super::models::{
    AddBookByAuthorNameRequest, BookView, CreateBookRequest, DiscountRequest, TitleSearch,
};
use super::service::CatalogService;

type Catalog = State<Arc<CatalogService>>;

/// Routes for the books module, relative to `/api/books`.
pub fn router(service: Arc<CatalogService>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/search", get(search_books))
        .route("/by-author", post(add_book_by_author))
        .route("/title/{title}", get(get_book_by_title))
        .route("/author/{author_id}", get(list_books_by_author))
        .route("/{id}", get(get_book))
        .route("/{id}/discount", put(apply_discount))
        .with_state(service)
}

/// Decode an optional JSON body. An empty body or a literal `null` is `None`.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<Option<T>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<T>>(body)
        .map_err(|e| AppError::bad_request(format!("malformed JSON payload: {}", e)))
}

async fn list_books(State(service): Catalog) -> Result<Json<Vec<BookView>>, AppError> {
    Ok(Json(service.get_all_books().await?))
}

async fn get_book(
    State(service): Catalog,
    Path(id): Path<i64>,
) -> Result<Json<BookView>, AppError> {
    service
        .get_book_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Book with id {} not found", id)))
}

async fn search_books(
    State(service): Catalog,
    Query(search): Query<TitleSearch>,
) -> Result<Json<Vec<BookView>>, AppError> {
    let title = search
        .title
        .ok_or_else(|| AppError::bad_request("title is required"))?;
    Ok(Json(service.find_books_by_title_containing(&title).await?))
}

async fn get_book_by_title(
    State(service): Catalog,
    Path(title): Path<String>,
) -> Result<Json<BookView>, AppError> {
    service
        .find_book_by_title(&title)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Book with title '{}' not found", title)))
}

async fn list_books_by_author(
    State(service): Catalog,
    Path(author_id): Path<i64>,
) -> Result<Json<Vec<BookView>>, AppError> {
    Ok(Json(service.get_books_by_author(author_id).await?))
}

async fn create_book(
    State(service): Catalog,
    body: Bytes,
) -> Result<(StatusCode, Json<BookView>), AppError> {
    let request = parse_body::<CreateBookRequest>(&body)?;
    let created = service.create_book(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn add_book_by_author(
    State(service): Catalog,
    body: Bytes,
) -> Result<(StatusCode, Json<BookView>), AppError> {
    let request = parse_body::<AddBookByAuthorNameRequest>(&body)?
        .ok_or_else(|| AppError::bad_request("payload empty"))?;
    let created = service
        .add_book_by_author_name(&request.title, &request.author_name, request.price)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn apply_discount(
    State(service): Catalog,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<BookView>, AppError> {
    let percentage = parse_body::<DiscountRequest>(&body)?
        .and_then(|request| request.discount_percentage)
        .ok_or_else(|| AppError::bad_request("discountPercentage is required"))?;
    Ok(Json(service.apply_discount(id, percentage).await?))
}
