//! Shared helpers for blog-service integration tests
#![allow(dead_code)]

use blog_service::app::AppState;
use blog_service::config::PaginationConfig;
use blog_service::middleware::Claims;
use blog_service::models::UserRef;
use blog_service::store::Stores;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret-0123456789";

/// 1x1 transparent PNG
pub const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub fn create_test_jwt(sub: &str, username: &str, expires_in_seconds: i64, secret: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        username: username.to_string(),
        iat: now as usize,
        exp: (now + expires_in_seconds) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// A user known to the identity provider, with a valid token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

impl TestUser {
    pub fn new(username: &str) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            username: username.to_string(),
            token: create_test_jwt(&id.to_string(), username, 3600, SECRET),
        }
    }

    pub fn auth(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token))
    }

    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

pub fn state_with(stores: Stores, pagination: PaginationConfig) -> AppState {
    AppState::new(stores, pagination, 5 * 1024 * 1024)
}

pub fn memory_state() -> AppState {
    state_with(Stores::memory(), PaginationConfig::default())
}

/// Make `user` resolvable by username, as if they had used the service before.
pub async fn register(state: &AppState, user: &TestUser) {
    state.stores.users.upsert_user(&user.user_ref()).await.unwrap();
}
