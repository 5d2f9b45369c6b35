mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{image_ids, Form, TestApp, PNG};

#[tokio::test]
async fn create_returns_book_with_uploaded_cover() {
    let app = TestApp::new().await;
    let form = Form::new()
        .text("title", "Atomic Habits")
        .text("author", "James Clear")
        .text("ISBN", "9780735211292")
        .text("publicationDate", "2018-10-16")
        .text("genre", "Self-help")
        .file("coverImages", "cover.png", "image/png", PNG);

    let (status, body) = app.post_form("/books/createbook", form).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Book created successfully");
    let book = &body["data"];
    assert_eq!(book["title"], "Atomic Habits");
    assert_eq!(book["ISBN"], "9780735211292");
    assert_eq!(book["publicationDate"], "2018-10-16T00:00:00Z");
    assert_eq!(book["coverImages"].as_array().unwrap().len(), 1);
    assert!(book["_id"].is_string());

    let image = &book["coverImages"][0];
    let image_id = image["imageId"].as_str().unwrap();
    assert!(app.image_exists(image_id).await);
    assert_eq!(image["imageUrl"], format!("https://images.test/{image_id}"));
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn create_without_files_is_rejected() {
    let app = TestApp::new().await;
    let form = Form::new().text("title", "Dune");

    let (status, body) = app.post_form("/books/createbook", form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No image files uploaded");
    assert_eq!(body["code"], "validation_error");
    assert_eq!(app.books.len().await, 0);
}

#[tokio::test]
async fn create_with_json_body_is_rejected_as_missing_files() {
    let app = TestApp::new().await;
    let request = Request::post("/books/createbook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"title":"Dune"}"#))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No image files uploaded");
}

#[tokio::test]
async fn create_without_title_is_rejected_and_uploads_nothing() {
    let app = TestApp::new().await;
    let form = Form::new()
        .text("title", "   ")
        .file("coverImages", "cover.png", "image/png", PNG);

    let (status, body) = app.post_form("/books/createbook", form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "title");
    assert_eq!(app.books.len().await, 0);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn disallowed_mime_type_is_rejected() {
    let app = TestApp::new().await;
    let form = Form::new()
        .text("title", "Dune")
        .file("coverImages", "notes.txt", "text/plain", b"hello");

    let (status, body) = app.post_form("/books/createbook", form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid file format: Image Only");
    assert_eq!(app.books.len().await, 0);
}

#[tokio::test]
async fn text_part_named_like_the_file_field_is_ignored() {
    let app = TestApp::new().await;

    let form = Form::new()
        .text("title", "Dune")
        .text("coverImages", "cover.png");
    let (status, body) = app.post_form("/books/createbook", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No image files uploaded");

    let form = Form::new()
        .text("title", "Dune")
        .text("coverImages", "cover.png")
        .file("coverImages", "cover.png", "image/png", PNG);
    let (status, body) = app.post_form("/books/createbook", form).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(image_ids(&body["data"]).len(), 1);
}

#[tokio::test]
async fn oversized_file_is_rejected_while_streaming() {
    let app = TestApp::with_settings(|settings| settings.uploads.max_file_size = 1024).await;
    let big = vec![7u8; 4096];
    let form = Form::new()
        .text("title", "Dune")
        .file("coverImages", "huge.png", "image/png", &big);

    let (status, body) = app.post_form("/books/createbook", form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Each image must be at most 1024 bytes");
    assert_eq!(app.staged_files(), 0);
    assert_eq!(app.books.len().await, 0);
}

#[tokio::test]
async fn more_than_five_files_are_rejected() {
    let app = TestApp::new().await;
    let mut form = Form::new().text("title", "Dune");
    for i in 0..6 {
        form = form.file("coverImages", &format!("c{i}.png"), "image/png", PNG);
    }

    let (status, body) = app.post_form("/books/createbook", form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "coverImages");
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn get_book_by_id() {
    let app = TestApp::new().await;
    let created = app.create("Dune", "Frank Herbert", "Sci-fi").await;
    let id = created["_id"].as_str().unwrap();

    let (status, body) = app.get(&format!("/books/getbook/{id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book fetched successfully");
    assert_eq!(body["data"], created);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let app = TestApp::new().await;

    for id in ["6652e212bca21e6e48793c3e", "not-an-object-id"] {
        let (status, body) = app.get(&format!("/books/getbook/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Book not found");
        assert_eq!(body["code"], "not_found");
    }

    let (status, _) = app
        .put_form("/books/update/6652e212bca21e6e48793c3e", Form::new().text("title", "x"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete("/books/delete/6652e212bca21e6e48793c3e").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_replaces_covers_and_keeps_unsent_fields() {
    let app = TestApp::new().await;
    let created = app.create("Dune", "Frank Herbert", "Sci-fi").await;
    let id = created["_id"].as_str().unwrap();
    let old_ids = image_ids(&created);

    let form = Form::new()
        .text("title", "Dune Messiah")
        .text("genre", "")
        .file("coverImages", "a.png", "image/png", PNG)
        .file("coverImages", "b.jpg", "image/jpeg", PNG);
    let (status, body) = app.put_form(&format!("/books/update/{id}"), form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book updated successfully");
    let book = &body["data"];
    assert_eq!(book["title"], "Dune Messiah");
    assert_eq!(book["author"], "Frank Herbert");
    assert_eq!(book["genre"], "Sci-fi");
    assert_eq!(book["createdAt"], created["createdAt"]);

    let new_ids = image_ids(book);
    assert_eq!(new_ids.len(), 2);
    for image_id in &new_ids {
        assert!(app.image_exists(image_id).await);
    }
    for image_id in &old_ids {
        assert!(!app.image_exists(image_id).await);
    }
}

#[tokio::test]
async fn update_without_files_clears_covers_idempotently() {
    let app = TestApp::new().await;
    let created = app.create("Dune", "Frank Herbert", "Sci-fi").await;
    let id = created["_id"].as_str().unwrap();
    let old_ids = image_ids(&created);

    let (status, body) = app
        .put_form(&format!("/books/update/{id}"), Form::new().text("author", "F. Herbert"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["coverImages"], serde_json::json!([]));
    assert_eq!(body["data"]["author"], "F. Herbert");
    assert!(!app.image_exists(&old_ids[0]).await);

    let request = Request::put(format!("/books/update/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["coverImages"], serde_json::json!([]));
    assert_eq!(body["data"]["title"], "Dune");
}

#[tokio::test]
async fn delete_removes_record_and_images() {
    let app = TestApp::new().await;
    let created = app.create("Dune", "Frank Herbert", "Sci-fi").await;
    let id = created["_id"].as_str().unwrap();

    let (status, body) = app.delete(&format!("/books/delete/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "message": "Book deleted successfully" }));

    let (status, _) = app.get(&format!("/books/getbook/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    for image_id in image_ids(&created) {
        assert!(!app.image_exists(&image_id).await);
    }
}

#[tokio::test]
async fn list_all_returns_envelope_newest_first() {
    let app = TestApp::new().await;
    app.create("First", "A", "x").await;
    app.create("Second", "B", "x").await;

    let (status, body) = app.get("/books").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Books fetched successfully");
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|book| book["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Second", "First"]);
}

async fn seeded() -> TestApp {
    let app = TestApp::new().await;
    app.create("Atomic Habits", "James Clear", "Self-help").await;
    app.create("The Atomic Age", "Various", "History").await;
    app.create("Deep Work", "Cal Newport", "Self-help").await;
    app.create("Essays", "atomic writers", "Self-help").await;
    app
}

fn titles(body: &serde_json::Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|book| book["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn search_matches_title_or_author_case_insensitively() {
    let app = seeded().await;

    let (status, body) = app.get("/books/book?search=Atomic").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["Essays", "The Atomic Age", "Atomic Habits"]);
}

#[tokio::test]
async fn genre_is_exact_and_combines_with_search() {
    let app = seeded().await;

    let (_, body) = app.get("/books/book?genre=Self-help").await;
    assert_eq!(titles(&body), ["Essays", "Deep Work", "Atomic Habits"]);

    let (_, body) = app.get("/books/book?genre=self-help").await;
    assert!(titles(&body).is_empty());

    let (_, body) = app.get("/books/book?search=Atomic&genre=Self-help").await;
    assert_eq!(titles(&body), ["Essays", "Atomic Habits"]);
}

#[tokio::test]
async fn search_treats_regex_metacharacters_literally() {
    let app = TestApp::new().await;
    app.create("C++ Primer", "Lippman", "Programming").await;
    app.create("Cpp Internals", "Someone", "Programming").await;

    let (status, body) = app.get("/books/book?search=C%2B%2B").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["C++ Primer"]);

    let (_, body) = app.get("/books/book?search=.%2A").await;
    assert!(titles(&body).is_empty());
}

#[tokio::test]
async fn search_sorts_and_pages() {
    let app = seeded().await;

    let (_, body) = app.get("/books/book?sortBy=title&order=asc").await;
    assert_eq!(
        titles(&body),
        ["Atomic Habits", "Deep Work", "Essays", "The Atomic Age"]
    );

    let (_, body) = app.get("/books/book?sortBy=title&order=asc&limit=2&page=2").await;
    assert_eq!(titles(&body), ["Essays", "The Atomic Age"]);

    let (_, body) = app.get("/books/book?limit=3&page=2").await;
    assert_eq!(titles(&body), ["Atomic Habits"]);
}

#[tokio::test]
async fn search_rejects_invalid_parameters() {
    let app = seeded().await;

    for query in [
        "page=0",
        "limit=abc",
        "sortBy=password",
        "order=up",
        "page=9999999999999&limit=9999999999",
    ] {
        let (status, body) = app.get(&format!("/books/book?{query}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(body["code"], "validation_error");
    }
}

#[tokio::test]
async fn configured_page_cap_is_enforced() {
    let app = TestApp::with_settings(|settings| settings.books.max_page_size = Some(2)).await;

    let (status, _) = app.get("/books/book?limit=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/books/book?limit=2").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_and_docs_are_served() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, spec) = app.get("/docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    for path in [
        "/books",
        "/books/createbook",
        "/books/getbook/{id}",
        "/books/update/{id}",
        "/books/delete/{id}",
        "/books/book",
    ] {
        assert!(spec["paths"][path].is_object(), "{path} undocumented");
    }
}
