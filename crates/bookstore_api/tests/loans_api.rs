mod common;

use axum::http::{Method, StatusCode};
use bookstore_core::model::loan::DAY_MS;
use common::{create_book, create_member, TestApp, NOW_MS};
use serde_json::json;

#[tokio::test]
async fn borrow_and_return_round_trip() {
    let app = TestApp::new();
    let member = create_member(&app, "Reader", "reader@example.com").await;
    let book = create_book(&app, "Dune", "9780441013593", 1999).await;

    let borrowed = app
        .post("/api/loans", json!({ "memberId": member, "bookId": book }))
        .await;
    assert_eq!(borrowed.status, StatusCode::CREATED);
    let loan = borrowed.json();
    assert_eq!(loan["loanDate"], NOW_MS);
    assert_eq!(loan["dueDate"], NOW_MS + 14 * DAY_MS);
    assert!(loan["returnDate"].is_null());
    assert_eq!(app.get(&format!("/api/books/{book}")).await.json()["available"], false);

    let id = loan["id"].as_i64().unwrap();
    assert_eq!(app.get(&format!("/api/loans/{id}")).await.json(), loan);
    assert_eq!(app.get("/api/loans/active").await.json().as_array().unwrap().len(), 1);

    app.clock.advance(DAY_MS);
    let returned = app
        .send(Method::POST, &format!("/api/loans/{id}/return"), None)
        .await;
    assert_eq!(returned.status, StatusCode::OK);
    assert_eq!(returned.json()["returnDate"], NOW_MS + DAY_MS);
    assert_eq!(app.get(&format!("/api/books/{book}")).await.json()["available"], true);

    let twice = app
        .send(Method::POST, &format!("/api/loans/{id}/return"), None)
        .await;
    assert_eq!(twice.status, StatusCode::BAD_REQUEST);
    assert_eq!(twice.json()["errorCode"], "LOAN_ALREADY_RETURNED");
}

#[tokio::test]
async fn unavailable_book_and_unknown_member_are_rejected() {
    let app = TestApp::new();
    let first = create_member(&app, "First", "first@example.com").await;
    let second = create_member(&app, "Second", "second@example.com").await;
    let book = create_book(&app, "Dune", "9780441013593", 1999).await;

    app.post("/api/loans", json!({ "memberId": first, "bookId": book }))
        .await;
    let taken = app
        .post("/api/loans", json!({ "memberId": second, "bookId": book }))
        .await;
    assert_eq!(taken.status, StatusCode::BAD_REQUEST);
    assert_eq!(taken.json()["errorCode"], "BOOK_NOT_AVAILABLE");

    let ghost = app
        .post("/api/loans", json!({ "memberId": 999, "bookId": book }))
        .await;
    assert_eq!(ghost.status, StatusCode::NOT_FOUND);

    let missing_field = app.post("/api/loans", json!({ "memberId": first })).await;
    assert_eq!(missing_field.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn suspended_members_cannot_borrow() {
    let app = TestApp::new();
    let book = create_book(&app, "Dune", "9780441013593", 1999).await;
    let created = app
        .post(
            "/api/members",
            json!({
                "name": "Blocked",
                "email": "blocked@example.com",
                "membershipType": "SUSPENDED",
            }),
        )
        .await
        .json();

    let response = app
        .post(
            "/api/loans",
            json!({ "memberId": created["id"], "bookId": book }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["errorCode"], "LOAN_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn overdue_loans_follow_the_clock() {
    let app = TestApp::new();
    let member = create_member(&app, "Reader", "reader@example.com").await;
    let book = create_book(&app, "Dune", "9780441013593", 1999).await;
    app.post("/api/loans", json!({ "memberId": member, "bookId": book }))
        .await;

    assert!(app.get("/api/loans/overdue").await.json().as_array().unwrap().is_empty());
    app.clock.advance(15 * DAY_MS);
    assert_eq!(
        app.get("/api/loans/overdue").await.json().as_array().unwrap().len(),
        1
    );
}
