//! Router driven in-process against a `MemoryStore`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use jsonwebtoken::Algorithm;
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    config::Config,
    db::{memory::MemoryStore, Store},
    middleware::auth::JwtKeys,
    models::user::CreateUserRequest,
    routes,
    services::auth::AuthService,
    AppState,
};

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/emenu_test".into(),
        host: "127.0.0.1".into(),
        port: 0,
        log_level: "debug".into(),
        jwt_secret: "test-secret".into(),
        jwt_algorithm: Algorithm::HS256,
        jwt_expiry_seconds: 900,
        currency: "PLN".into(),
        scheduler_offset: FixedOffset::east_opt(0).expect("valid offset"),
        digest_send_time: NaiveTime::from_hms_opt(6, 0, 0).expect("valid time"),
        smtp_host: None,
        smtp_port: None,
        smtp_username: None,
        smtp_password: None,
        smtp_from: None,
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    config: Arc<Config>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = Arc::new(test_config());
        let shared: Arc<dyn Store> = store.clone();
        let router = routes::router(AppState {
            store: shared,
            config: config.clone(),
        });
        Self {
            store,
            config,
            router,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.config.today()
    }

    /// Creates `admin`/`admin` on first use and returns a bearer token for it.
    pub async fn token(&self) -> String {
        let user = match AuthService::authenticate(&*self.store, "admin", "admin").await {
            Ok(user) => user,
            Err(_) => AuthService::create_user(
                &*self.store,
                &CreateUserRequest {
                    login: "admin".into(),
                    email: "admin@example.com".into(),
                    password: "admin".into(),
                },
            )
            .await
            .expect("create admin"),
        };
        AuthService::issue_token(&user, &JwtKeys::from_config(&self.config))
            .expect("issue token")
            .access_token
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    pub async fn form(&self, uri: &str, encoded: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(encoded.to_string()))
            .expect("request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}
