/// Follow handlers - the caller's own follow edges
use actix_web::{web, HttpResponse};

use super::schema::{FollowBody, FollowResponse, SearchQuery};
use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::models::Actor;

/// GET /api/v1/follow?search=<username fragment>
pub async fn list_follows(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let follows = state
        .follows()
        .list_follows(&actor, query.search.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(
        follows
            .into_iter()
            .map(FollowResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST /api/v1/follow
pub async fn create_follow(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<FollowBody>,
) -> Result<HttpResponse> {
    let follow = state
        .follows()
        .create_follow(&actor, body.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(FollowResponse::from(follow)))
}

/// GET /api/v1/follow/{id}
pub async fn get_follow(
    state: web::Data<AppState>,
    actor: Actor,
    follow_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let follow = state.follows().get_follow(&actor, *follow_id).await?;
    Ok(HttpResponse::Ok().json(FollowResponse::from(follow)))
}

/// PUT/PATCH /api/v1/follow/{id}
pub async fn reject_follow_update(
    state: web::Data<AppState>,
    actor: Actor,
) -> Result<HttpResponse> {
    state.follows().update_follow(&actor)?;
    Err(AppError::MethodNotAllowed)
}

/// DELETE /api/v1/follow/{id}
pub async fn delete_follow(
    state: web::Data<AppState>,
    actor: Actor,
    follow_id: web::Path<i64>,
) -> Result<HttpResponse> {
    state.follows().delete_follow(&actor, *follow_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
