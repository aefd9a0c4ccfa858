//! Application wiring: shared state and the `/api/v1` route table.
use actix_web::{web, HttpRequest};
use tracing::debug;

use crate::config::PaginationConfig;
use crate::error::{AppError, ValidationReason};
use crate::handlers;
use crate::middleware::IdentityMiddleware;
use crate::services::{CommentService, FollowService, GroupService, PostService};
use crate::store::Stores;

/// State shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub pagination: PaginationConfig,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(stores: Stores, pagination: PaginationConfig, max_upload_bytes: usize) -> Self {
        Self {
            stores,
            pagination,
            max_upload_bytes,
        }
    }

    pub fn posts(&self) -> PostService {
        PostService::new(self.stores.clone(), self.pagination)
    }

    pub fn comments(&self) -> CommentService {
        CommentService::new(self.stores.clone())
    }

    pub fn groups(&self) -> GroupService {
        GroupService::new(self.stores.clone())
    }

    pub fn follows(&self) -> FollowService {
        FollowService::new(self.stores.clone())
    }
}

fn json_error(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "Rejected JSON body");
    AppError::validation(ValidationReason::MalformedBody).into()
}

fn path_error(err: actix_web::error::PathError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "Unparsable path segment");
    AppError::NotFound("resource".to_string()).into()
}

/// Register state, extractor configuration and all routes.
///
/// ```ignore
/// App::new().configure(app::configure(state, IdentityMiddleware::new(&secret)))
/// ```
pub fn configure(
    state: AppState,
    identity: IdentityMiddleware,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let json_limit = state.max_upload_bytes;
        cfg.app_data(web::Data::new(state))
            .app_data(
                web::JsonConfig::default()
                    .limit(json_limit)
                    .error_handler(json_error),
            )
            .app_data(web::PathConfig::default().error_handler(path_error))
            .route("/api/v1/health", web::get().to(handlers::health_check))
            .service(
                web::scope("/api/v1")
                    .wrap(identity)
                    .service(
                        web::resource("/posts")
                            .route(web::get().to(handlers::list_posts))
                            .route(web::post().to(handlers::create_post)),
                    )
                    .service(
                        web::resource("/posts/{post_id}")
                            .route(web::get().to(handlers::get_post))
                            .route(web::put().to(handlers::replace_post))
                            .route(web::patch().to(handlers::patch_post))
                            .route(web::delete().to(handlers::delete_post)),
                    )
                    .service(
                        web::resource("/posts/{post_id}/comments")
                            .route(web::get().to(handlers::list_comments))
                            .route(web::post().to(handlers::create_comment)),
                    )
                    .service(
                        web::resource("/posts/{post_id}/comments/{comment_id}")
                            .route(web::get().to(handlers::get_comment))
                            .route(web::put().to(handlers::replace_comment))
                            .route(web::patch().to(handlers::patch_comment))
                            .route(web::delete().to(handlers::delete_comment)),
                    )
                    .service(
                        web::resource("/groups")
                            .route(web::get().to(handlers::list_groups))
                            .default_service(web::to(handlers::reject_group_write)),
                    )
                    .service(
                        web::resource("/groups/{group_id}")
                            .route(web::get().to(handlers::get_group))
                            .default_service(web::to(handlers::reject_group_write)),
                    )
                    .service(
                        web::resource("/follow")
                            .route(web::get().to(handlers::list_follows))
                            .route(web::post().to(handlers::create_follow)),
                    )
                    .service(
                        web::resource("/follow/{follow_id}")
                            .route(web::get().to(handlers::get_follow))
                            .route(web::put().to(handlers::reject_follow_update))
                            .route(web::patch().to(handlers::reject_follow_update))
                            .route(web::delete().to(handlers::delete_follow)),
                    ),
            );
    }
}
