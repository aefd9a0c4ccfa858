/// Group handlers - read-only
use actix_web::{http::Method, web, HttpRequest, HttpResponse};

use super::schema::GroupResponse;
use crate::app::AppState;
use crate::authz::Action;
use crate::error::{AppError, Result};
use crate::models::Actor;

/// GET /api/v1/groups
pub async fn list_groups(state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse> {
    let groups = state.groups().list_groups(&actor).await?;
    Ok(HttpResponse::Ok().json(
        groups
            .into_iter()
            .map(GroupResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/v1/groups/{id}
pub async fn get_group(
    state: web::Data<AppState>,
    actor: Actor,
    group_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let group = state.groups().get_group(&actor, *group_id).await?;
    Ok(HttpResponse::Ok().json(GroupResponse::from(group)))
}

/// Any other method on /groups or /groups/{id}
pub async fn reject_group_write(
    state: web::Data<AppState>,
    actor: Actor,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let action = match *req.method() {
        Method::POST => Action::Create,
        Method::DELETE => Action::Delete,
        _ => Action::Update,
    };
    state.groups().write_group(&actor, action)?;
    // The engine never allows group writes.
    Err(AppError::MethodNotAllowed)
}
