/// Comment handlers - comments nested under /posts/{post_id}
use actix_web::{web, HttpResponse};

use super::schema::{CommentBody, CommentResponse};
use crate::app::AppState;
use crate::error::Result;
use crate::models::Actor;
use crate::services::UpdateMode;

/// GET /api/v1/posts/{post_id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let comments = state.comments().list_comments(&actor, *post_id).await?;
    Ok(HttpResponse::Ok().json(
        comments
            .into_iter()
            .map(CommentResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST /api/v1/posts/{post_id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<i64>,
    body: web::Json<CommentBody>,
) -> Result<HttpResponse> {
    let comment = state
        .comments()
        .create_comment(&actor, *post_id, body.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(CommentResponse::from(comment)))
}

/// GET /api/v1/posts/{post_id}/comments/{id}
pub async fn get_comment(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = state
        .comments()
        .get_comment(&actor, post_id, comment_id)
        .await?;
    Ok(HttpResponse::Ok().json(CommentResponse::from(comment)))
}

/// PUT /api/v1/posts/{post_id}/comments/{id}
pub async fn replace_comment(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<(i64, i64)>,
    body: web::Json<CommentBody>,
) -> Result<HttpResponse> {
    update(state, actor, path.into_inner(), body.into_inner(), UpdateMode::Full).await
}

/// PATCH /api/v1/posts/{post_id}/comments/{id}
pub async fn patch_comment(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<(i64, i64)>,
    body: web::Json<CommentBody>,
) -> Result<HttpResponse> {
    update(state, actor, path.into_inner(), body.into_inner(), UpdateMode::Partial).await
}

async fn update(
    state: web::Data<AppState>,
    actor: Actor,
    (post_id, comment_id): (i64, i64),
    body: CommentBody,
    mode: UpdateMode,
) -> Result<HttpResponse> {
    let comment = state
        .comments()
        .update_comment(&actor, post_id, comment_id, body.into(), mode)
        .await?;
    Ok(HttpResponse::Ok().json(CommentResponse::from(comment)))
}

/// DELETE /api/v1/posts/{post_id}/comments/{id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    state
        .comments()
        .delete_comment(&actor, post_id, comment_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
