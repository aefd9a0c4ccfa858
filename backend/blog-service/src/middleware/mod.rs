//! HTTP middleware for blog-service
//!
//! `IdentityMiddleware` verifies an optional HS256 bearer token and records
//! the resolved identity in request extensions. Handlers receive it through
//! the [`Actor`] extractor:
//! - no `Authorization` header: `Actor::Anonymous`
//! - valid token: `Actor::User { id: sub, username }`
//! - anything else: the extractor fails with 401, public routes included
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Actor;

/// Claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id (UUID)
    pub sub: String,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

/// Outcome of reading the `Authorization` header.
#[derive(Debug, Clone)]
enum Credentials {
    Resolved(Actor),
    Rejected,
}

/// Verifies bearer tokens; never rejects a request by itself.
#[derive(Clone)]
pub struct IdentityMiddleware {
    key: Arc<DecodingKey>,
}

impl IdentityMiddleware {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            key: self.key.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    key: Arc<DecodingKey>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let credentials = match req.headers().get("Authorization") {
            None => Credentials::Resolved(Actor::Anonymous),
            Some(header) => match header.to_str().ok().and_then(|h| h.strip_prefix("Bearer ")) {
                Some(token) => resolve_token(token.trim(), &self.key),
                None => {
                    debug!("Authorization header is not a bearer token");
                    Credentials::Rejected
                }
            },
        };
        req.extensions_mut().insert(credentials);

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

fn resolve_token(token: &str, key: &DecodingKey) -> Credentials {
    let claims = match decode::<Claims>(token, key, &Validation::new(Algorithm::HS256)) {
        Ok(data) => data.claims,
        Err(e) => {
            debug!(error = %e, "Bearer token rejected");
            return Credentials::Rejected;
        }
    };

    match Uuid::parse_str(&claims.sub) {
        Ok(id) if !claims.username.trim().is_empty() => {
            Credentials::Resolved(Actor::user(id, claims.username))
        }
        _ => {
            debug!(sub = %claims.sub, "Token subject is not a usable identity");
            Credentials::Rejected
        }
    }
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let credentials = req.extensions().get::<Credentials>().cloned();
        ready(match credentials {
            Some(Credentials::Resolved(actor)) => Ok(actor),
            Some(Credentials::Rejected) => Err(AppError::Unauthenticated),
            // Route not wrapped by the middleware.
            None => Ok(Actor::Anonymous),
        })
    }
}
