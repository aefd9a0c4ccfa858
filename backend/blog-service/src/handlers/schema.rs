//! Wire schema v1
//!
//! Every field that crosses the HTTP boundary is listed here explicitly;
//! storage models are never serialized directly.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Comment, Follow, Group, Page, Post};
use crate::services::{CommentDraft, FollowDraft, ImageSource, PostDraft};

// ============================================
// Responses
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    /// Author username
    pub author: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// Stored image name
    pub image: Option<String>,
    /// Group id
    pub group: Option<i64>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author: post.author.username,
            text: post.text,
            pub_date: post.pub_date,
            image: post.image,
            group: post.group,
        }
    }
}

/// One page of posts with relative links to its neighbours.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostPageResponse {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<PostResponse>,
}

impl PostPageResponse {
    pub fn new(path: &str, page: Page<Post>) -> Self {
        let next = page.has_next().then(|| {
            format!(
                "{}?limit={}&offset={}",
                path,
                page.limit,
                page.offset.saturating_add(page.limit)
            )
        });
        let previous = page.has_previous().then(|| {
            if page.offset <= page.limit {
                format!("{}?limit={}", path, page.limit)
            } else {
                format!(
                    "{}?limit={}&offset={}",
                    path,
                    page.limit,
                    page.offset - page.limit
                )
            }
        });

        Self {
            count: page.count,
            next,
            previous,
            results: page.results.into_iter().map(PostResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub author: String,
    pub post: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            author: comment.author.username,
            post: comment.post,
            text: comment.text,
            created: comment.created,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<Group> for GroupResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub id: i64,
    /// Follower username
    pub user: String,
    /// Followed username
    pub following: String,
}

impl From<Follow> for FollowResponse {
    fn from(follow: Follow) -> Self {
        Self {
            id: follow.id,
            user: follow.user.username,
            following: follow.following.username,
        }
    }
}

// ============================================
// Requests
// ============================================

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// JSON post body. Unknown keys (`author`, `pub_date`, ...) are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct PostBody {
    pub text: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub group: Option<Option<i64>>,
    /// `data:image/<ext>;base64,<payload>`
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
}

impl From<PostBody> for PostDraft {
    fn from(body: PostBody) -> Self {
        PostDraft {
            text: body.text,
            group: body.group,
            image: body
                .image
                .map(|image| image.filter(|uri| !uri.is_empty()).map(ImageSource::DataUri)),
        }
    }
}

/// JSON comment body. A `post` key, if sent, is ignored: the post comes
/// from the path.
#[derive(Debug, Default, Deserialize)]
pub struct CommentBody {
    pub text: Option<String>,
}

impl From<CommentBody> for CommentDraft {
    fn from(body: CommentBody) -> Self {
        CommentDraft { text: body.text }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowBody {
    /// Username to follow
    pub following: Option<String>,
}

impl From<FollowBody> for FollowDraft {
    fn from(body: FollowBody) -> Self {
        FollowDraft {
            following: body.following,
        }
    }
}

/// `?limit=&offset=`; unparsable values are treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageQuery {
    pub fn limit(&self) -> Option<usize> {
        self.limit.as_deref().and_then(|v| v.trim().parse().ok())
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}
