mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use axum_extra::extract::cookie::Key;
use common::{TempDb, create_user};
use microblog::service::{FollowGraph, Microposts};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    db: TempDb,
    app: Router,
}

struct TestResponse {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

impl TestApp {
    async fn new(tag: &str) -> Self {
        let db = TempDb::new(tag).await;
        let state = microblog::MicroblogState::new(db.storage.clone(), Key::generate(), true, 30);
        let app = microblog::microblog_router(state);
        Self { db, app }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let body = body.map(|body| ("application/json", body.to_string()));
        self.send_raw(method, uri, cookie, body).await
    }

    /// Send `body` verbatim with the given content type.
    async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<(&str, String)>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some((content_type, body)) => builder
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");

        let resp = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = resp.status();
        let cookie = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("remember_token="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body was not JSON")
        };
        TestResponse {
            status,
            cookie,
            body,
        }
    }

    async fn sign_in(&self, email: &str) -> String {
        let resp = self
            .send(
                Method::POST,
                "/sessions",
                None,
                Some(json!({ "email": email, "password": "foobar" })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{}", resp.body);
        resp.cookie.expect("sign in sets the remember cookie")
    }
}

fn details(body: &Value) -> Vec<String> {
    body["error"]["details"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn signup_with_valid_information_signs_the_user_in() {
    let t = TestApp::new("http-signup").await;

    let resp = t
        .send(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "name": "Example User",
                "email": "user@example.com",
                "password": "foobar",
                "password_confirmation": "foobar"
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.body["message"], "Welcome to the Sample App!");
    assert_eq!(resp.body["account"]["name"], "Example User");
    assert_eq!(t.db.storage.count_users().await.unwrap(), 1);

    let cookie = resp.cookie.expect("signup sets the remember cookie");
    let feed = t.send(Method::GET, "/feed", Some(&cookie), None).await;
    assert_eq!(feed.status, StatusCode::OK);
    assert_eq!(feed.body["total"], 0);
}

#[tokio::test]
async fn signup_with_empty_fields_lists_every_error() {
    let t = TestApp::new("http-signup-invalid").await;

    let resp = t.send(Method::POST, "/users", None, Some(json!({}))).await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.body["error"]["code"], "VALIDATION_FAILED");
    let messages = details(&resp.body);
    for expected in [
        "Name can't be blank",
        "Email can't be blank",
        "Email is invalid",
        "Password can't be blank",
        "Password is too short (minimum is 6 characters)",
        "Password confirmation can't be blank",
    ] {
        assert!(messages.iter().any(|m| m == expected), "missing {expected}");
    }
    assert!(resp.cookie.is_none());
    assert_eq!(t.db.storage.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn index_requires_sign_in() {
    let t = TestApp::new("http-index").await;
    let accounts = t.db.accounts();
    for i in 0..3 {
        create_user(&accounts, &format!("Person {i}"), &format!("p{i}@example.com")).await;
    }

    let anonymous = t.send(Method::GET, "/users", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["error"]["message"], "Please sign in.");

    let cookie = t.sign_in("p0@example.com").await;
    let resp = t.send(Method::GET, "/users", Some(&cookie), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["total"], 3);
    assert_eq!(resp.body["items"][2]["name"], "Person 2");
    assert!(resp.body["items"][0].get("email").is_none());
}

#[tokio::test]
async fn profile_page_shows_microposts_and_counts() {
    let t = TestApp::new("http-profile").await;
    let accounts = t.db.accounts();
    let posts = Microposts::new(t.db.storage.clone());
    let user = create_user(&accounts, "Example User", "user@example.com").await.user;
    posts.post(user.id, "Foo").await.unwrap();
    posts.post(user.id, "Bar").await.unwrap();

    let resp = t
        .send(Method::GET, &format!("/users/{}", user.id), None, None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["user"]["name"], "Example User");
    assert_eq!(resp.body["microposts"]["total"], 2);
    let contents: Vec<_> = resp.body["microposts"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert!(contents.contains(&"Foo".to_string()));
    assert!(contents.contains(&"Bar".to_string()));
    assert_eq!(resp.body["following_count"], 0);
    assert!(resp.body.get("following").is_none());

    let missing = t.send(Method::GET, "/users/9999", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_and_unfollow_buttons() {
    let t = TestApp::new("http-follow").await;
    let accounts = t.db.accounts();
    let graph = FollowGraph::new(t.db.storage.clone());
    let user = create_user(&accounts, "Example User", "user@example.com").await.user;
    let other = create_user(&accounts, "Other User", "other@example.com").await.user;
    let cookie = t.sign_in("user@example.com").await;

    let profile = t
        .send(Method::GET, &format!("/users/{}", other.id), Some(&cookie), None)
        .await;
    assert_eq!(profile.body["following"], false);

    let resp = t
        .send(
            Method::POST,
            "/relationships",
            Some(&cookie),
            Some(json!({ "followed_id": other.id })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.body["following"], true);
    assert_eq!(resp.body["followers_count"], 1);
    assert_eq!(graph.following_count(user.id).await.unwrap(), 1);

    let own = t
        .send(Method::GET, &format!("/users/{}", user.id), Some(&cookie), None)
        .await;
    assert_eq!(own.body["following_count"], 1);

    let again = t
        .send(
            Method::POST,
            "/relationships",
            Some(&cookie),
            Some(json!({ "followed_id": other.id })),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let resp = t
        .send(
            Method::DELETE,
            &format!("/relationships/{}", other.id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["following"], false);
    assert_eq!(resp.body["followers_count"], 0);
    assert_eq!(graph.followers_count(other.id).await.unwrap(), 0);

    let again = t
        .send(
            Method::DELETE,
            &format!("/relationships/{}", other.id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let anonymous = t
        .send(
            Method::POST,
            "/relationships",
            None,
            Some(json!({ "followed_id": other.id })),
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn following_and_followers_pages() {
    let t = TestApp::new("http-follow-pages").await;
    let accounts = t.db.accounts();
    let graph = FollowGraph::new(t.db.storage.clone());
    let user = create_user(&accounts, "Example User", "user@example.com").await.user;
    let other = create_user(&accounts, "Other User", "other@example.com").await.user;
    graph.follow(user.id, other.id).await.unwrap();

    let cookie = t.sign_in("user@example.com").await;
    let following = t
        .send(
            Method::GET,
            &format!("/users/{}/following", user.id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(following.status, StatusCode::OK);
    assert_eq!(following.body["title"], "Following");
    assert_eq!(following.body["users"]["items"][0]["id"], other.id);

    let cookie = t.sign_in("other@example.com").await;
    let followers = t
        .send(
            Method::GET,
            &format!("/users/{}/followers", other.id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(followers.body["title"], "Followers");
    assert_eq!(followers.body["users"]["items"][0]["name"], "Example User");
}

#[tokio::test]
async fn edit_updates_profile_but_not_admin_flag() {
    let t = TestApp::new("http-edit").await;
    let accounts = t.db.accounts();
    let user = create_user(&accounts, "Example User", "user@example.com").await.user;
    let other = create_user(&accounts, "Other User", "other@example.com").await.user;
    let cookie = t.sign_in("user@example.com").await;

    let invalid = t
        .send(
            Method::PATCH,
            &format!("/users/{}", user.id),
            Some(&cookie),
            Some(json!({})),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);

    let resp = t
        .send(
            Method::PATCH,
            &format!("/users/{}", user.id),
            Some(&cookie),
            Some(json!({
                "name": "New Name",
                "email": "new@example.com",
                "password": "foobar",
                "password_confirmation": "foobar",
                "admin": true
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["message"], "Profile updated");

    let reloaded = accounts.find(user.id).await.unwrap();
    assert_eq!(reloaded.name, "New Name");
    assert_eq!(reloaded.email, "new@example.com");
    assert!(!reloaded.admin);

    let foreign = t
        .send(
            Method::PATCH,
            &format!("/users/{}", other.id),
            Some(&cookie),
            Some(json!({
                "name": "Hijacked",
                "email": "other@example.com",
                "password": "foobar",
                "password_confirmation": "foobar"
            })),
        )
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    assert_eq!(accounts.find(other.id).await.unwrap().name, "Other User");
}

#[tokio::test]
async fn admin_can_delete_other_users() {
    let t = TestApp::new("http-delete").await;
    let accounts = t.db.accounts();
    let admin = create_user(&accounts, "Admin", "admin@example.com").await.user;
    accounts.promote_admin("admin@example.com").await.unwrap();
    let user = create_user(&accounts, "Example User", "user@example.com").await.user;
    let victim = create_user(&accounts, "Victim", "victim@example.com").await.user;

    let cookie = t.sign_in("user@example.com").await;
    let refused = t
        .send(Method::DELETE, &format!("/users/{}", victim.id), Some(&cookie), None)
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);

    let cookie = t.sign_in("admin@example.com").await;
    let resp = t
        .send(Method::DELETE, &format!("/users/{}", victim.id), Some(&cookie), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(t.db.storage.count_users().await.unwrap(), 2);

    let own = t
        .send(Method::DELETE, &format!("/users/{}", admin.id), Some(&cookie), None)
        .await;
    assert_eq!(own.status, StatusCode::FORBIDDEN);
    assert!(accounts.find(user.id).await.is_ok());
}

#[tokio::test]
async fn microposts_and_sign_out() {
    let t = TestApp::new("http-microposts").await;
    let accounts = t.db.accounts();
    let posts = Microposts::new(t.db.storage.clone());
    create_user(&accounts, "Example User", "user@example.com").await;
    let other = create_user(&accounts, "Other User", "other@example.com").await.user;
    let foreign_post = posts.post(other.id, "not yours").await.unwrap();
    let cookie = t.sign_in("user@example.com").await;

    let blank = t
        .send(
            Method::POST,
            "/microposts",
            Some(&cookie),
            Some(json!({ "content": "" })),
        )
        .await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(details(&blank.body), vec!["Content can't be blank"]);

    let created = t
        .send(
            Method::POST,
            "/microposts",
            Some(&cookie),
            Some(json!({ "content": "Lorem ipsum" })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["id"].as_i64().unwrap();

    let feed = t.send(Method::GET, "/feed", Some(&cookie), None).await;
    assert_eq!(feed.body["items"][0]["content"], "Lorem ipsum");
    assert_eq!(feed.body["items"][0]["user_name"], "Example User");

    let foreign = t
        .send(
            Method::DELETE,
            &format!("/microposts/{}", foreign_post.id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);

    let deleted = t
        .send(Method::DELETE, &format!("/microposts/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let signed_out = t.send(Method::DELETE, "/sessions", Some(&cookie), None).await;
    assert_eq!(signed_out.status, StatusCode::NO_CONTENT);
    let after = t.send(Method::GET, "/feed", Some(&cookie), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let t = TestApp::new("http-signin").await;
    create_user(&t.db.accounts(), "Example User", "user@example.com").await;

    let resp = t
        .send(
            Method::POST,
            "/sessions",
            None,
            Some(json!({ "email": "user@example.com", "password": "nope" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.body["error"]["message"],
        "Invalid email/password combination"
    );
    assert!(resp.cookie.is_none());
}

#[tokio::test]
async fn malformed_bodies_get_the_error_envelope() {
    let t = TestApp::new("bad-bodies").await;
    create_user(&t.db.accounts(), "Michael", "michael@example.com").await;
    let cookie = t.sign_in("michael@example.com").await;

    let resp = t
        .send(Method::POST, "/relationships", Some(&cookie), Some(json!({})))
        .await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.body["error"]["code"], "INVALID_BODY");
    assert!(resp.body["error"]["message"].as_str().is_some());

    let resp = t
        .send_raw(
            Method::POST,
            "/relationships",
            Some(&cookie),
            Some(("application/json", "{\"followed_id\":".to_string())),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"]["code"], "INVALID_BODY");

    let resp = t
        .send_raw(
            Method::POST,
            "/sessions",
            None,
            Some(("text/plain", "email=michael@example.com".to_string())),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(resp.body["error"]["code"], "INVALID_BODY");
}
