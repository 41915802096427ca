//! Test doubles shared by the workspace's test suites.

mod fake;

pub use fake::FakeGateway;

use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::json;

/// Create an empty mock server standing in for a Supabase project.
pub fn supabase_server() -> Server {
    Server::run()
}

/// JSON body of a GoTrue password-grant response.
pub fn session_body(user_id: &str, access_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh",
        "user": {
            "id": user_id,
            "email": "user@example.com",
            "user_metadata": { "display_name": "Test User" }
        }
    })
}

/// Expect a password sign-in and answer with a session for `user_id`.
pub fn expect_sign_in(server: &Server, user_id: &str, access_token: &str) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/auth/v1/token"),
            request::query(url_decoded(contains(("grant_type", "password")))),
        ])
        .respond_with(json_encoded(session_body(user_id, access_token))),
    );
}

/// Expect a password sign-in and reject it the way GoTrue does.
pub fn expect_sign_in_rejected(server: &Server) {
    server.expect(
        Expectation::matching(request::method_path("POST", "/auth/v1/token")).respond_with(
            status_code(400).body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
        ),
    );
}

/// Expect a favorite upsert carrying the api key and a bearer token.
pub fn expect_upsert_favorite(server: &Server) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/rest/v1/photo_favorites"),
            request::headers(contains(key("authorization"))),
            request::headers(contains(key("apikey"))),
            request::query(url_decoded(contains(("on_conflict", "user_id,photo_id")))),
        ])
        .respond_with(status_code(201)),
    );
}

/// Expect a favorites listing and return the given photo ids.
pub fn expect_list_favorites(server: &Server, photo_ids: &[&str]) {
    let rows: Vec<serde_json::Value> = photo_ids
        .iter()
        .map(|id| json!({ "photo_id": id }))
        .collect();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/rest/v1/photo_favorites"),
            request::query(url_decoded(contains(("is_favorite", "eq.true")))),
        ])
        .respond_with(json_encoded(rows)),
    );
}

/// Expect a photo category listing and return the given rows.
pub fn expect_list_photo_categories(server: &Server, rows: serde_json::Value) {
    server.expect(
        Expectation::matching(request::method_path("GET", "/rest/v1/photo_categories"))
            .respond_with(json_encoded(rows)),
    );
}

/// Expect a user category lookup and return the given list.
pub fn expect_user_categories(server: &Server, categories: serde_json::Value) {
    server.expect(
        Expectation::matching(request::method_path("GET", "/rest/v1/user_categories"))
            .respond_with(json_encoded(json!([{ "categories": categories }]))),
    );
}

/// Answer any request on `method path` with the given status code.
pub fn expect_failure(server: &Server, method: &'static str, path: &'static str, status: u16) {
    server.expect(
        Expectation::matching(request::method_path(method, path))
            .times(..)
            .respond_with(status_code(status).body("backend failure")),
    );
}
