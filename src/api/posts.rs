//! Post endpoints
//!
//! - POST   /v1/post       - create from JSON
//! - GET    /v1/post       - list
//! - PATCH  /v1/post/:id   - edit content and/or photo (multipart)
//! - DELETE /v1/post/:id   - delete
//!
//! Routes under `/v1/post/:id` resolve the post once in [`post_context`]
//! and hand it to handlers through [`PostContext`].

use axum::{
    Json, Router, async_trait,
    extract::{
        DefaultBodyLimit, FromRequestParts, Multipart, Path, State,
        multipart::MultipartRejection, rejection::JsonRejection,
    },
    http::{Request, StatusCode, request::Parts},
    middleware::{self, Next},
    response::Response,
    routing::{MethodRouter, get, patch, post},
};
use validator::Validate;

use super::dto::CreatePostRequest;
use crate::AppState;
use crate::auth::{MaybeUser, require_auth};
use crate::data::Post;
use crate::error::AppError;
use crate::storage::{MAX_PHOTO_BYTES, PhotoUpload};

/// Room for multipart boundaries and the text fields next to the photo
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create posts router
///
/// Mutations go through [`require_auth`] when
/// `auth.require_login_for_writes` is set.
pub fn posts_router(state: AppState) -> Router<AppState> {
    let require_login = state.config.auth.require_login_for_writes;

    let mut create: MethodRouter<AppState> = post(create_post);
    let mut by_id: MethodRouter<AppState> = patch(edit_post)
        .delete(delete_post)
        .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + FORM_OVERHEAD_BYTES))
        .route_layer(middleware::from_fn_with_state(state.clone(), post_context));

    if require_login {
        create = create.route_layer(middleware::from_fn_with_state(state.clone(), require_auth));
        by_id = by_id.route_layer(middleware::from_fn_with_state(state, require_auth));
    }

    Router::new()
        .route("/v1/post", get(list_posts).merge(create))
        .route("/v1/post/:id", by_id)
}

// =============================================================================
// Post context
// =============================================================================

/// Middleware resolving `:id` to a [`Post`]
///
/// Non-numeric ids are rejected with 400, unknown ids with 404.
pub async fn post_context(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::Validation("Invalid post ID".to_string()))?;

    let post = state.posts.get(id).await?;
    request.extensions_mut().insert(post);

    Ok(next.run(request).await)
}

/// Post loaded by [`post_context`]
#[derive(Debug, Clone)]
pub struct PostContext(pub Post);

#[async_trait]
impl<S> FromRequestParts<S> for PostContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Post>()
            .cloned()
            .map(PostContext)
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("post context middleware not applied"))
            })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /v1/post
async fn create_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected post body");
        AppError::Validation("Invalid request format".to_string())
    })?;

    request
        .validate()
        .map_err(|e| AppError::Unprocessable(e.to_string()))?;

    let author = user.as_ref().map(|user| user.email.as_str());
    let post = state
        .posts
        .create(request.title, request.content, author)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /v1/post
async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.posts.list().await?))
}

/// PATCH /v1/post/:id
///
/// Multipart fields:
/// - `content`: replaces the content when non-empty
/// - `photo`: image file, stored under the public directory
async fn edit_post(
    State(state): State<AppState>,
    PostContext(post): PostContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Post>, AppError> {
    let mut multipart =
        multipart.map_err(|_| AppError::Validation("Invalid form data".to_string()))?;

    let mut content = None;
    let mut photo = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid form data: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "content" => {
                content = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read content: {}", e))
                })?);
            }
            "photo" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let mut data = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read photo: {}", e)))?
                {
                    if data.len() + chunk.len() > MAX_PHOTO_BYTES {
                        return Err(AppError::Unprocessable(format!(
                            "photo too large: exceeds {} bytes",
                            MAX_PHOTO_BYTES
                        )));
                    }
                    data.extend_from_slice(&chunk);
                }

                photo = Some(PhotoUpload { data, content_type });
            }
            _ => {}
        }
    }

    let post = state.posts.edit(post, content, photo).await?;
    Ok(Json(post))
}

/// DELETE /v1/post/:id
async fn delete_post(
    State(state): State<AppState>,
    PostContext(post): PostContext,
) -> Result<StatusCode, AppError> {
    state.posts.delete(&post).await?;
    Ok(StatusCode::NO_CONTENT)
}
