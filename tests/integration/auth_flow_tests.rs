// ============================
// tests/integration/auth_flow_tests.rs
// ============================
//! End-to-end `/auth` flows through the assembled router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::json;
use sessiongate_backend::create_router;
use std::collections::HashMap;
use tower::ServiceExt;

use crate::test_utils::{body_json, cookie_value, json_request, set_cookies, setup_test_env, TestEnv};

struct Client {
    app: Router,
    cookies: HashMap<String, String>,
    csrf: Option<String>,
}

impl Client {
    fn new(env: &TestEnv) -> Self {
        Self {
            app: create_router(env.state.clone()),
            cookies: HashMap::new(),
            csrf: None,
        }
    }

    /// Send a request, absorbing any cookies the response sets
    async fn send(
        &mut self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
        with_csrf: bool,
    ) -> (StatusCode, HashMap<String, String>, serde_json::Value) {
        let csrf = if with_csrf { self.csrf.clone() } else { None };
        let request = json_request(method, uri, body, &self.cookies, csrf.as_deref());
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set = set_cookies(&response);
        for (name, raw) in &set {
            let value = cookie_value(raw);
            if name == "csrf_token" && !value.is_empty() {
                self.csrf = Some(value.clone());
            }
            self.cookies.insert(name.clone(), value);
        }
        (status, set, body_json(response).await)
    }

    async fn signup(&mut self, email: &str, username: &str) -> serde_json::Value {
        let (status, _, body) = self
            .send(
                "POST",
                "/auth/signup",
                Some(json!({ "email": email, "username": username, "password": "correct horse" })),
                false,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "signup failed: {body}");
        body
    }

    async fn login(&mut self, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = self
            .send(
                "POST",
                "/auth/login",
                Some(json!({ "email": email, "password": password })),
                false,
            )
            .await;
        (status, body)
    }
}

#[tokio::test]
async fn test_signup_sets_both_cookies() {
    let env = setup_test_env();
    let mut client = Client::new(&env);

    let (status, set, body) = client
        .send(
            "POST",
            "/auth/signup",
            Some(json!({ "email": "ada@example.com", "username": "ada", "password": "hunter22" })),
            false,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let access = &set["access_token"];
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("SameSite=Lax"));
    assert!(access.contains("Path=/"));
    assert!(access.contains("Max-Age=900"));

    let csrf = &set["csrf_token"];
    assert!(!csrf.contains("HttpOnly"));
    assert!(csrf.contains("Max-Age=86400"));

    let csrf_value = cookie_value(csrf);
    assert_eq!(csrf_value.len(), 43);
    assert_eq!(body["csrfToken"], json!(csrf_value));
    assert!(body["userId"].is_string());
}

#[tokio::test]
async fn test_login_me_logout_me() {
    let env = setup_test_env();
    let mut client = Client::new(&env);
    client.signup("ada@example.com", "ada").await;
    client.cookies.clear();

    let (status, login) = client.login("ada@example.com", "correct horse").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, me) = client.send("GET", "/auth/me", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["userId"], login["userId"]);

    let old_token = client.cookies["access_token"].clone();
    let (status, set, _) = client.send("POST", "/auth/logout", None, true).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(set["access_token"].contains("Max-Age=0"));
    assert!(set["csrf_token"].contains("Max-Age=0"));

    // cleared cookie
    let (status, _, _) = client.send("GET", "/auth/me", None, false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // the old token is dead too, not merely forgotten by the browser
    client.cookies.insert("access_token".into(), old_token);
    let (status, _, body) = client.send("GET", "/auth/me", None, false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("AUTH_004"));
}

#[tokio::test]
async fn test_bad_input_and_bad_credentials() {
    let env = setup_test_env();
    let mut client = Client::new(&env);

    let (status, _, body) = client
        .send(
            "POST",
            "/auth/signup",
            Some(json!({ "email": "not-an-email", "username": "ada", "password": "pw" })),
            false,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("VAL_001"));

    client.signup("ada@example.com", "ada").await;
    client.cookies.clear();

    let (status, body) = client.login("ada@example.com", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("AUTH_001"));
    assert_eq!(body["error"]["message"], json!("Invalid login credentials"));
    assert!(client.cookies.is_empty());

    let (status, _, body) = client
        .send(
            "POST",
            "/auth/signup",
            Some(json!({ "email": "ada@example.com", "username": "ada2", "password": "x" })),
            false,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], json!("User already registered"));
}

#[tokio::test]
async fn test_unparseable_bodies_use_error_envelope() {
    let env = setup_test_env();
    let app = create_router(env.state.clone());

    let cases = [
        ("/auth/signup", Some("application/json"), "{not json"),
        ("/auth/login", Some("application/json"), r#"{"email":"ada@example.com"}"#),
        ("/auth/login", None, r#"{"email":"ada@example.com","password":"pw"}"#),
    ];
    for (uri, content_type, raw) in cases {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(raw)).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri} {raw}");
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], json!("VAL_001"), "{uri} {raw}");
        assert!(body["error"]["message"].is_string());
    }
}

#[tokio::test]
async fn test_expired_token_refreshes_into_same_session() {
    let env = setup_test_env();
    let mut client = Client::new(&env);
    let signup = client.signup("ada@example.com", "ada").await;
    let user_id = signup["userId"].as_str().unwrap().to_string();

    let sessions = env.state.sessions.list_user_sessions(&user_id).await.unwrap();
    let session_id = sessions[0].session_id.clone();
    let expired = env
        .state
        .sessions
        .tokens()
        .issue_with_ttl(&session_id, &user_id, -1)
        .unwrap();
    client.cookies.insert("access_token".into(), expired);

    let (status, _, _) = client.send("GET", "/auth/me", None, false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, set, _) = client.send("POST", "/auth/refresh", None, false).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(set.contains_key("access_token"));
    assert!(!set.contains_key("csrf_token"));

    let (status, _, me) = client.send("GET", "/auth/me", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["userId"], json!(user_id));

    let after = env.state.sessions.list_user_sessions(&user_id).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].session_id, session_id);
    assert_eq!(Some(after[0].csrf_token.clone()), client.csrf);
    assert_ne!(after[0].provider_refresh_token, sessions[0].provider_refresh_token);
}

#[tokio::test]
async fn test_sequential_refreshes() {
    let env = setup_test_env();
    let mut client = Client::new(&env);
    client.signup("ada@example.com", "ada").await;

    for _ in 0..2 {
        let (status, _, _) = client.send("POST", "/auth/refresh", None, false).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) = client.send("GET", "/auth/me", None, false).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_refresh_after_logout_or_revocation_is_rejected() {
    let env = setup_test_env();

    let mut client = Client::new(&env);
    client.signup("ada@example.com", "ada").await;
    let token = client.cookies["access_token"].clone();
    let (status, _, _) = client.send("POST", "/auth/logout", None, true).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    client.cookies.insert("access_token".into(), token);
    let (status, _, body) = client.send("POST", "/auth/refresh", None, false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("AUTH_003"));

    let mut other = Client::new(&env);
    let signup = other.signup("grace@example.com", "grace").await;
    env.provider.revoke_user(signup["userId"].as_str().unwrap());
    let (status, _, body) = other.send("POST", "/auth/refresh", None, false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("AUTH_001"));
}

#[tokio::test]
async fn test_csrf_on_logout() {
    let env = setup_test_env();
    let mut client = Client::new(&env);
    client.signup("ada@example.com", "ada").await;

    let (status, _, body) = client.send("POST", "/auth/logout", None, false).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("CSRF_001"));

    let real = client.csrf.take();
    client.csrf = Some(String::new());
    let (status, _, _) = client.send("POST", "/auth/logout", None, true).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    client.csrf = real;
    let (status, _, _) = client.send("GET", "/auth/me", None, false).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_session_listing_and_identity() {
    let env = setup_test_env();
    let mut laptop = Client::new(&env);
    let signup = laptop.signup("ada@example.com", "ada").await;

    let mut phone = Client::new(&env);
    let (status, _) = phone.login("ada@example.com", "correct horse").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, listing) = laptop.send("GET", "/auth/sessions", None, false).await;
    assert_eq!(status, StatusCode::OK);
    let listing = listing.as_array().unwrap().clone();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing.iter().filter(|s| s["current"] == json!(true)).count(), 1);
    let raw = serde_json::to_string(&listing).unwrap();
    assert!(!raw.contains("csrf"));
    assert!(!raw.contains("provider"));

    let (status, _, identity) = phone.send("GET", "/auth/me/identity", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(identity["id"], signup["userId"]);
    assert_eq!(identity["email"], json!("ada@example.com"));
}

#[tokio::test]
async fn test_health() {
    let env = setup_test_env();
    let mut client = Client::new(&env);
    let (status, _, body) = client.send("GET", "/health", None, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
