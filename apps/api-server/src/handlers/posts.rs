//! Post handlers.
//!
//! Every route requires an authenticated [`Identity`]. Visibility and
//! ownership rules live in `PostService`; handlers only translate between
//! HTTP and the service.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::{AuthoredPost, Post, PostInput};
use quill_shared::dto::{
    MessageResponse, PageQuery, Paginated, PostEnvelope, PostRequest, PostResponse, UserResponse,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn post_response(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        user_id: post.user_id,
        title: post.title,
        content: post.content,
        is_draft: post.is_draft,
        published_at: post.published_at,
        created_at: post.created_at,
        updated_at: post.updated_at,
        user: None,
    }
}

fn listed_post_response(listed: AuthoredPost) -> PostResponse {
    PostResponse {
        user: listed.author.map(|author| UserResponse {
            id: author.id,
            email: author.email,
        }),
        ..post_response(listed.post)
    }
}

fn post_input(req: PostRequest) -> PostInput {
    PostInput {
        title: req.title,
        content: req.content,
        is_draft: req.is_draft,
        published_at: req.published_at,
    }
}

/// GET /posts
pub async fn index(
    _identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state.posts.list(query.page()).await?;

    let (current_page, per_page, total) = (page.page, page.per_page, page.total);
    let data = page.items.into_iter().map(listed_post_response).collect();

    Ok(HttpResponse::Ok().json(Paginated::new(data, current_page, per_page, total)))
}

/// GET /posts/create
pub async fn create(_identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse::new("posts.create"))
}

/// POST /posts
pub async fn store(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let post = state
        .posts
        .create(identity.user_id, post_input(body.into_inner()))
        .await?;

    Ok(HttpResponse::Created().json(PostEnvelope {
        message: "Post created successfully.".to_string(),
        post: post_response(post),
    }))
}

/// GET /posts/{id}
pub async fn show(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = state.posts.show(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(post_response(post)))
}

/// GET /posts/{id}/edit
pub async fn edit(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.posts.find(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("posts.edit")))
}

/// PUT/PATCH /posts/{id}
pub async fn update(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let post = state
        .posts
        .update(
            identity.user_id,
            path.into_inner(),
            post_input(body.into_inner()),
        )
        .await?;

    Ok(HttpResponse::Ok().json(PostEnvelope {
        message: "Post updated successfully.".to_string(),
        post: post_response(post),
    }))
}

/// DELETE /posts/{id}
pub async fn destroy(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .delete(identity.user_id, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Post deleted successfully.")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::{Value, json};

    use quill_core::domain::{ActivePosts, PageRequest, User};
    use quill_core::ports::{BaseRepository, Clock, PostRepository, TokenService};
    use quill_core::publication::publish_scheduled_posts;
    use quill_infra::{JwtConfig, JwtTokenService, ManualClock};

    use super::*;
    use crate::handlers::configure_routes;
    use crate::middleware::error::json_config;

    struct Harness {
        state: AppState,
        clock: Arc<ManualClock>,
        tokens: Arc<dyn TokenService>,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(start()));
            Self {
                state: AppState::in_memory(clock.clone()),
                clock,
                tokens: Arc::new(JwtTokenService::new(JwtConfig {
                    secret: "test-secret".to_string(),
                    expiration_hours: 1,
                    issuer: "test".to_string(),
                })),
            }
        }

        fn bearer(&self, user_id: Uuid) -> (&'static str, String) {
            let token = self
                .tokens
                .generate_token(user_id, "author@example.com")
                .unwrap();
            ("Authorization", format!("Bearer {token}"))
        }

        /// Store a post directly, bypassing the HTTP layer.
        async fn seed(
            &self,
            owner: Uuid,
            is_draft: bool,
            published_at: Option<DateTime<Utc>>,
        ) -> Post {
            let post = Post {
                id: Uuid::new_v4(),
                user_id: owner,
                title: "Seeded".to_string(),
                content: "Seeded content".to_string(),
                is_draft,
                published_at,
                created_at: self.clock.now(),
                updated_at: Some(self.clock.now()),
            };
            self.state.post_repo.save(post).await.unwrap()
        }
    }

    macro_rules! app {
        ($h:expr) => {
            test::init_service(
                App::new()
                    .app_data(json_config())
                    .app_data(web::Data::new($h.state.clone()))
                    .app_data(web::Data::new($h.tokens.clone()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_routes_require_authentication() {
        let h = Harness::new();
        let app = app!(h);

        let req = test::TestRequest::get().uri("/posts").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_index_shows_only_active_posts() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        h.seed(user, true, None).await;
        h.seed(user, false, Some(start() + Duration::days(1))).await;
        let active = h.seed(user, false, Some(start())).await;
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri("/posts")
            .insert_header(h.bearer(user))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["id"], json!(active.id));
        assert_eq!(body["per_page"], json!(20));
        assert_eq!(body["total"], json!(1));
        assert_eq!(body["current_page"], json!(1));
    }

    #[actix_web::test]
    async fn test_index_embeds_author() {
        let h = Harness::new();
        let author = h
            .state
            .users
            .save(User::new("writer@example.com".into(), "hash".into(), start()))
            .await
            .unwrap();
        h.seed(author.id, false, Some(start())).await;
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri("/posts")
            .insert_header(h.bearer(author.id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"][0]["user"]["id"], json!(author.id));
        assert_eq!(body["data"][0]["user"]["email"], "writer@example.com");
        assert!(body["data"][0]["user"].get("password_hash").is_none());
    }

    #[actix_web::test]
    async fn test_index_far_past_the_end_is_empty() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        h.seed(user, false, Some(start())).await;
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri(&format!("/posts?page={}", u64::MAX))
            .insert_header(h.bearer(user))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["total"], json!(1));
        assert_eq!(body["last_page"], json!(1));
        assert_eq!(body["current_page"], json!(u64::MAX));
        assert_eq!(body["from"], Value::Null);
    }

    #[actix_web::test]
    async fn test_index_pages_by_twenty() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        for _ in 0..21 {
            h.seed(user, false, Some(start())).await;
            h.clock.advance(Duration::seconds(1));
        }
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri("/posts?page=2")
            .insert_header(h.bearer(user))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["last_page"], json!(2));
        assert_eq!(body["from"], json!(21));
    }

    #[actix_web::test]
    async fn test_create_and_edit_markers() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let post = h.seed(user, true, None).await;
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri("/posts/create")
            .insert_header(h.bearer(user))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "posts.create");

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}/edit", post.id))
            .insert_header(h.bearer(user))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "posts.edit");
    }

    #[actix_web::test]
    async fn test_authenticated_user_can_create_post() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/posts")
            .insert_header(h.bearer(user))
            .set_json(json!({
                "title": "Test Title",
                "content": "Test Content",
                "is_draft": false,
                "published_at": "2024-05-01 12:00:00",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Post created successfully.");
        assert_eq!(body["post"]["title"], "Test Title");
        assert_eq!(body["post"]["user_id"], json!(user));

        let id: Uuid = serde_json::from_value(body["post"]["id"].clone()).unwrap();
        let stored = h.state.post_repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.content, "Test Content");
        assert_eq!(stored.user_id, user);
    }

    #[actix_web::test]
    async fn test_create_without_title_is_rejected_and_stores_nothing() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/posts")
            .insert_header(h.bearer(user))
            .set_json(json!({ "content": "Body only" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"][0], "The title field is required.");

        let listing = h
            .state
            .post_repo
            .find_active(
                ActivePosts::at(start() + Duration::days(365)),
                PageRequest::new(1, 20),
            )
            .await
            .unwrap();
        assert_eq!(listing.total, 0);
    }

    #[actix_web::test]
    async fn test_wrongly_typed_body_is_unprocessable() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/posts")
            .insert_header(h.bearer(user))
            .set_json(json!({ "title": 42, "content": "Body" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_can_view_active_post() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let post = h.seed(user, false, Some(start() - Duration::days(1))).await;
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}", post.id))
            .insert_header(h.bearer(user))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["id"], json!(post.id));
        assert_eq!(body["title"], "Seeded");
    }

    #[actix_web::test]
    async fn test_draft_post_returns_404_even_to_owner() {
        let h = Harness::new();
        let owner = Uuid::new_v4();
        let post = h.seed(owner, true, Some(start() - Duration::days(1))).await;
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}", post.id))
            .insert_header(h.bearer(owner))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = test::read_body(resp).await;
        let text = String::from_utf8_lossy(&body);
        assert!(!text.contains("Seeded content"));
    }

    #[actix_web::test]
    async fn test_unknown_or_malformed_id_returns_404() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let app = app!(h);

        for uri in [format!("/posts/{}", Uuid::new_v4()), "/posts/not-a-uuid".to_string()] {
            let req = test::TestRequest::get()
                .uri(&uri)
                .insert_header(h.bearer(user))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_web::test]
    async fn test_scheduled_post_becomes_visible_when_clock_passes() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let post = h.seed(user, false, Some(start() + Duration::days(1))).await;
        let app = app!(h);
        let uri = format!("/posts/{}", post.id);

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(h.bearer(user))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );

        h.clock.advance(Duration::days(1) + Duration::seconds(1));

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(h.bearer(user))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_publishing_a_draft_adds_it_to_listing() {
        let h = Harness::new();
        let user = Uuid::new_v4();
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/posts")
            .insert_header(h.bearer(user))
            .set_json(json!({
                "title": "A",
                "content": "Draft body",
                "is_draft": true,
                "published_at": null,
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["post"]["id"].as_str().unwrap().to_string();

        let list = |h: &Harness| {
            test::TestRequest::get()
                .uri("/posts")
                .insert_header(h.bearer(user))
                .to_request()
        };
        let listing: Value = test::call_and_read_body_json(&app, list(&h)).await;
        assert_eq!(listing["total"], json!(0));

        let one_second_ago = (start() - Duration::seconds(1)).to_rfc3339();
        let req = test::TestRequest::put()
            .uri(&format!("/posts/{id}"))
            .insert_header(h.bearer(user))
            .set_json(json!({
                "title": "A",
                "content": "Draft body",
                "is_draft": false,
                "published_at": one_second_ago,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Post updated successfully.");

        let listing: Value = test::call_and_read_body_json(&app, list(&h)).await;
        assert_eq!(listing["total"], json!(1));
        assert_eq!(listing["data"][0]["id"], json!(id));
    }

    #[actix_web::test]
    async fn test_author_can_patch_post() {
        let h = Harness::new();
        let owner = Uuid::new_v4();
        let post = h.seed(owner, true, None).await;
        let app = app!(h);

        let req = test::TestRequest::patch()
            .uri(&format!("/posts/{}", post.id))
            .insert_header(h.bearer(owner))
            .set_json(json!({
                "title": "Updated Title",
                "content": "Updated Content",
                "is_draft": false,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = h.state.post_repo.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Updated Title");
        assert!(!stored.is_draft);
    }

    #[actix_web::test]
    async fn test_update_requires_draft_flag() {
        let h = Harness::new();
        let owner = Uuid::new_v4();
        let post = h.seed(owner, true, None).await;
        let app = app!(h);

        let req = test::TestRequest::put()
            .uri(&format!("/posts/{}", post.id))
            .insert_header(h.bearer(owner))
            .set_json(json!({ "title": "T", "content": "C" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let stored = h.state.post_repo.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored, post);
    }

    #[actix_web::test]
    async fn test_non_author_cannot_update_post() {
        let h = Harness::new();
        let author = Uuid::new_v4();
        let post = h.seed(author, false, Some(start())).await;
        let app = app!(h);

        let req = test::TestRequest::put()
            .uri(&format!("/posts/{}", post.id))
            .insert_header(h.bearer(Uuid::new_v4()))
            .set_json(json!({
                "title": "Hacked Title",
                "content": "Hacked Content",
                "is_draft": false,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let stored = h.state.post_repo.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored, post);
    }

    #[actix_web::test]
    async fn test_update_missing_post_returns_404() {
        let h = Harness::new();
        let app = app!(h);

        let req = test::TestRequest::put()
            .uri(&format!("/posts/{}", Uuid::new_v4()))
            .insert_header(h.bearer(Uuid::new_v4()))
            .set_json(json!({ "title": "T", "content": "C", "is_draft": true }))
            .to_request();

        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn test_author_can_delete_post() {
        let h = Harness::new();
        let owner = Uuid::new_v4();
        let post = h.seed(owner, false, Some(start())).await;
        let app = app!(h);
        let uri = format!("/posts/{}", post.id);

        let req = test::TestRequest::delete()
            .uri(&uri)
            .insert_header(h.bearer(owner))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Post deleted successfully.");

        assert!(h.state.post_repo.find_by_id(post.id).await.unwrap().is_none());

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(h.bearer(owner))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn test_non_author_cannot_delete_post() {
        let h = Harness::new();
        let post = h.seed(Uuid::new_v4(), false, Some(start())).await;
        let app = app!(h);

        let req = test::TestRequest::delete()
            .uri(&format!("/posts/{}", post.id))
            .insert_header(h.bearer(Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(h.state.post_repo.find_by_id(post.id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn test_publication_run_touches_new_post_once() {
        let h = Harness::new();
        let post = h.seed(Uuid::new_v4(), false, Some(start())).await;
        assert_eq!(post.updated_at, Some(post.created_at));

        h.clock.advance(Duration::minutes(1));
        let first_run = h.clock.now();
        let touched = publish_scheduled_posts(h.state.post_repo.as_ref(), h.clock.as_ref())
            .await
            .unwrap();
        assert_eq!(touched, 1);

        let stored = h.state.post_repo.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, Some(first_run));

        h.clock.advance(Duration::minutes(1));
        let touched = publish_scheduled_posts(h.state.post_repo.as_ref(), h.clock.as_ref())
            .await
            .unwrap();
        assert_eq!(touched, 0);

        let stored = h.state.post_repo.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, Some(first_run));
    }
}
