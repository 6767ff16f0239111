use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use libris_app::App;
use libris_kernel::settings::{DatabaseSettings, Settings};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn create_test_app() -> Router {
    let settings = Settings {
        database: DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        ..Settings::default()
    };
    let pool = libris_db::connect(&settings.database).await.unwrap();
    let app = App::assemble(&settings, pool).await.unwrap();
    app.router(&settings)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_clean_code(app: &Router) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/books",
        Some(json!({
            "title": "Clean Code: A Handbook of Agile Software Craftsmanship",
            "price": 49.99,
            "author": {"name": "Robert C. Martin", "bio": "Uncle Bob"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_create_book_with_new_author() {
    let app = create_test_app().await;

    let created = create_clean_code(&app).await;

    assert_eq!(
        created["title"],
        "Clean Code: A Handbook of Agile Software Craftsmanship"
    );
    assert_eq!(created["price"], 49.99);
    assert_eq!(created["author"]["name"], "Robert C. Martin");
    assert_eq!(created["author"]["bio"], "Uncle Bob");
    assert!(created["author"]["id"].as_i64().unwrap() > 0);
    assert!(created["author"].get("books").is_none());

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = send(&app, Method::GET, &format!("/api/books/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_create_book_with_existing_author() {
    let app = create_test_app().await;
    let first = create_clean_code(&app).await;
    let author_id = first["author"]["id"].as_i64().unwrap();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({
            "title": "The Clean Coder",
            "price": 39.99,
            "author": {"id": author_id, "name": "Ignored", "bio": "ignored"}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["author"], first["author"]);

    let (status, by_author) = send(
        &app,
        Method::GET,
        &format!("/api/books/author/{}", author_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_author.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_book_validation_errors() {
    let app = create_test_app().await;

    let cases = [
        (json!(null), "payload empty"),
        (
            json!({"author": {"name": "Joshua Bloch"}, "price": 44.99}),
            "title is required",
        ),
        (
            json!({"title": "The Pragmatic Programmer", "author": {"name": "David Thomas"}, "price": -19.99}),
            "price must be non-negative",
        ),
        (json!({"title": "T", "price": 1}), "author is required"),
        (
            json!({"title": "T", "price": 1, "author": {"id": 4242}}),
            "author not found",
        ),
        (
            json!({"title": "T", "price": 1, "author": {"bio": "no name"}}),
            "author.name is required",
        ),
    ];

    for (payload, message) in cases {
        let (status, body) = send(&app, Method::POST, "/api/books", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{message}");
        assert_eq!(body, json!({"error": message}));
    }

    let (_, all) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn test_empty_and_malformed_create_bodies() {
    let app = create_test_app().await;

    let (status, body) = send(&app, Method::POST, "/api/books", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "payload empty");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/books")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_missing_book_is_404() {
    let app = create_test_app().await;

    let (status, _) = send(&app, Method::GET, "/api/books/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/api/books/title/Nothing%20Here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_title_lookup_and_search() {
    let app = create_test_app().await;
    send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({"title": "Clean Code", "price": 49.99, "author": {"name": "Robert C. Martin"}})),
    )
    .await;

    let (status, book) = send(&app, Method::GET, "/api/books/title/Clean%20Code", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["title"], "Clean Code");

    for query in ["clean", "CODE", "Clean"] {
        let (status, found) = send(
            &app,
            Method::GET,
            &format!("/api/books/search?title={}", query),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().unwrap().len(), 1, "query {query}");
    }

    let (status, found) = send(&app, Method::GET, "/api/books/search?title=rust", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, json!([]));

    let (status, _) = send(&app, Method::GET, "/api/books/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_apply_discount() {
    let app = create_test_app().await;
    let created = create_clean_code(&app).await;
    let id = created["id"].as_i64().unwrap();
    let uri = format!("/api/books/{}/discount", id);

    let (status, updated) = send(&app, Method::PUT, &uri, Some(json!({"discountPercentage": 10}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 44.99);
    assert_eq!(updated["id"], created["id"]);

    let (status, updated) = send(&app, Method::PUT, &uri, Some(json!({"discountPercentage": 0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 44.99);

    let (status, updated) = send(&app, Method::PUT, &uri, Some(json!({"discountPercentage": 100}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 0.0);
}

#[tokio::test]
async fn test_apply_discount_rejections() {
    let app = create_test_app().await;
    let created = create_clean_code(&app).await;
    let id = created["id"].as_i64().unwrap();
    let uri = format!("/api/books/{}/discount", id);

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"discountPercentage": 150}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Discount percentage must be between 0 and 100");

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"discountPercentage": -5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Discount percentage must be between 0 and 100");

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "discountPercentage is required");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/books/9999/discount",
        Some(json!({"discountPercentage": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Book with id 9999 not found");

    let (_, unchanged) = send(&app, Method::GET, &format!("/api/books/{}", id), None).await;
    assert_eq!(unchanged["price"], 49.99);
}

#[tokio::test]
async fn test_add_book_by_author_name() {
    let app = create_test_app().await;
    create_clean_code(&app).await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/books/by-author",
        Some(json!({"title": "Clean Architecture", "authorName": "Robert C. Martin", "price": 34.99})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["author"]["name"], "Robert C. Martin");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/by-author",
        Some(json!({"title": "Clean Architecture", "authorName": "Robert C. Martin", "price": 34.99})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Book with title 'Clean Architecture' already exists");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/by-author",
        Some(json!({"title": "Design Patterns", "authorName": "Gang of Four", "price": 59.99})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Author 'Gang of Four' not found");
}

#[tokio::test]
async fn test_list_books_and_request_id() {
    let app = create_test_app().await;
    create_clean_code(&app).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/books").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let books: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(books.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_openapi_lists_book_routes() {
    let app = create_test_app().await;

    let (status, spec) = send(&app, Method::GET, "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/api/books"]["post"].is_object());
    assert!(spec["paths"]["/api/books/{id}/discount"]["put"].is_object());
}

#[tokio::test]
async fn test_price_limit_on_create_and_discount() {
    let app = create_test_app().await;

    let (status, top) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({"title": "Priceless", "price": 99999999.99, "author": {"name": "Rich"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(top["price"], 99999999.99);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({"title": "Too Much", "price": 100000000.0, "author": {"name": "Rich"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "price exceeds maximum"}));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/by-author",
        Some(json!({"title": "Too Much", "authorName": "Rich", "price": 1e27})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "price exceeds maximum");

    let uri = format!("/api/books/{}/discount", top["id"]);
    let (status, free) = send(&app, Method::PUT, &uri, Some(json!({"discountPercentage": 100}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(free["price"], 0.0);
}

#[tokio::test]
async fn test_add_by_author_name_blank_fields() {
    let app = create_test_app().await;
    create_clean_code(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/by-author",
        Some(json!({"title": "", "authorName": "Robert C. Martin", "price": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "title is required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/by-author",
        Some(json!({"title": "Clean Architecture", "authorName": "  ", "price": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "author.name is required");

    let (_, all) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_string_price_is_rejected() {
    let app = create_test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({"title": "Refactoring", "price": "39.99", "author": {"name": "Martin Fowler"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("malformed JSON payload"));
}
