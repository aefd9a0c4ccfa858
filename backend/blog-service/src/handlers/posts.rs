/// Post handlers - HTTP endpoints for post operations
///
/// Write endpoints accept `application/json` (image as a data URI) or
/// `multipart/form-data` (`text`, `group` and an `image` file part).
use actix_multipart::Multipart;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use futures_util::StreamExt;

use super::schema::{PageQuery, PostBody, PostPageResponse, PostResponse};
use crate::app::AppState;
use crate::error::{AppError, Result, ValidationReason};
use crate::models::{Actor, PostListing};
use crate::services::{ImageSource, PostDraft, UpdateMode};

fn malformed() -> AppError {
    AppError::validation(ValidationReason::MalformedBody)
}

/// Read a post body in either supported encoding.
async fn read_post_draft(
    req: &HttpRequest,
    payload: web::Payload,
    limit: usize,
) -> Result<PostDraft> {
    if req.content_type() == mime::MULTIPART_FORM_DATA.essence_str() {
        read_multipart(Multipart::new(req.headers(), payload), limit).await
    } else {
        read_json(payload, limit).await
    }
}

async fn read_json(mut payload: web::Payload, limit: usize) -> Result<PostDraft> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|_| malformed())?;
        if body.len() + chunk.len() > limit {
            return Err(malformed());
        }
        body.extend_from_slice(&chunk);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PostDraft::default());
    }
    let body: PostBody = serde_json::from_slice(&body).map_err(|_| malformed())?;
    Ok(body.into())
}

async fn read_multipart(mut payload: Multipart, limit: usize) -> Result<PostDraft> {
    let mut draft = PostDraft::default();
    let mut total = 0usize;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|_| malformed())?;
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().cloned();

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|_| malformed())?;
            total += chunk.len();
            if total > limit {
                return Err(malformed());
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "text" => {
                draft.text = Some(String::from_utf8(data).map_err(|_| malformed())?);
            }
            "group" => {
                let raw = String::from_utf8(data).map_err(|_| malformed())?;
                let raw = raw.trim();
                draft.group = Some(if raw.is_empty() {
                    None
                } else {
                    Some(
                        raw.parse()
                            .map_err(|_| AppError::invalid_reference("group"))?,
                    )
                });
            }
            "image" => {
                draft.image = Some(if data.is_empty() {
                    None
                } else {
                    Some(ImageSource::Upload { content_type, data })
                });
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(draft)
}

/// List posts
/// GET /api/v1/posts
pub async fn list_posts(
    state: web::Data<AppState>,
    actor: Actor,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let listing = state
        .posts()
        .list_posts(&actor, query.limit(), query.offset())
        .await?;

    Ok(match listing {
        PostListing::All(posts) => HttpResponse::Ok().json(
            posts
                .into_iter()
                .map(PostResponse::from)
                .collect::<Vec<_>>(),
        ),
        PostListing::Paged(page) => {
            HttpResponse::Ok().json(PostPageResponse::new(req.path(), page))
        }
    })
}

/// Create a post authored by the caller
/// POST /api/v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    actor: Actor,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let draft = read_post_draft(&req, payload, state.max_upload_bytes).await?;
    let post = state.posts().create_post(&actor, draft).await?;
    Ok(HttpResponse::Created().json(PostResponse::from(post)))
}

/// Get a post by ID
/// GET /api/v1/posts/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post = state.posts().get_post(&actor, *post_id).await?;
    Ok(HttpResponse::Ok().json(PostResponse::from(post)))
}

/// Replace a post (text required)
/// PUT /api/v1/posts/{id}
pub async fn replace_post(
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<i64>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse> {
    update(state, actor, *post_id, req, payload, UpdateMode::Full).await
}

/// Partially update a post
/// PATCH /api/v1/posts/{id}
pub async fn patch_post(
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<i64>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse> {
    update(state, actor, *post_id, req, payload, UpdateMode::Partial).await
}

async fn update(
    state: web::Data<AppState>,
    actor: Actor,
    post_id: i64,
    req: HttpRequest,
    payload: web::Payload,
    mode: UpdateMode,
) -> Result<HttpResponse> {
    let draft = read_post_draft(&req, payload, state.max_upload_bytes).await?;
    let post = state
        .posts()
        .update_post(&actor, post_id, draft, mode)
        .await?;
    Ok(HttpResponse::Ok().json(PostResponse::from(post)))
}

/// Delete a post and its comments
/// DELETE /api/v1/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    state.posts().delete_post(&actor, *post_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
