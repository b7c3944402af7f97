use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{MethodRouter, delete, get, post};

use crate::handlers::{access, access_keys, auth, collections, galleries, images, members};
use crate::middleware::require_session;
use crate::ratelimit::{RateLimit, rate_limit};
use crate::state::AppState;

const DEFAULT_LIMIT: RateLimit = RateLimit::per_minute(50);

/// The whole HTTP surface, with state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth_routes(&state))
        .nest("/api/gallery", gallery_routes(&state))
        .nest("/api/collection", collection_routes(&state))
        .nest("/api/access", access_routes(&state))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn limited(route: MethodRouter<AppState>, state: &AppState, rule: RateLimit) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state((state.clone(), rule), rate_limit))
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route(
            "/register",
            limited(post(auth::register), state, RateLimit::per_hour(10)),
        )
        .route(
            "/login",
            limited(post(auth::login), state, RateLimit::per_hour(100)),
        )
        .route(
            "/verify-email/{token}",
            limited(post(auth::verify_email), state, RateLimit::per_hour(10)),
        )
        .route(
            "/request-password-reset",
            limited(post(auth::request_password_reset), state, RateLimit::per_hour(5)),
        )
        .route(
            "/reset-password",
            limited(post(auth::reset_password), state, RateLimit::per_hour(5)),
        );

    let protected = Router::new()
        .route("/", limited(get(auth::me), state, DEFAULT_LIMIT))
        .route(
            "/sessions",
            limited(get(auth::list_sessions), state, DEFAULT_LIMIT),
        )
        .route(
            "/session/{session_id}",
            limited(delete(auth::revoke_session), state, DEFAULT_LIMIT),
        )
        .route("/logout", post(auth::logout))
        .route(
            "/change-password",
            limited(post(auth::change_password), state, RateLimit::per_hour(10)),
        )
        .route_layer(from_fn_with_state(state.clone(), require_session));

    public.merge(protected)
}

fn gallery_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(galleries::create_gallery).get(galleries::list_galleries),
        )
        .route(
            "/{gallery_id}",
            get(galleries::get_gallery)
                .patch(galleries::update_gallery)
                .delete(galleries::delete_gallery),
        )
        .route("/{gallery_id}/images", post(images::upload_images))
        .route(
            "/{gallery_id}/image/{image_id}",
            delete(images::delete_image),
        )
        .route(
            "/{gallery_id}/collections",
            get(collections::list_collections),
        )
        .route(
            "/{gallery_id}/collection",
            post(collections::create_collection),
        )
        .route(
            "/{gallery_id}/access-keys",
            get(access_keys::list_access_keys),
        )
        .route(
            "/{gallery_id}/access-key",
            post(access_keys::create_access_key),
        )
        .route(
            "/{gallery_id}/access-key/{access_key_id}",
            delete(access_keys::delete_access_key),
        )
        .route(
            "/{gallery_id}/members",
            get(members::list_members).post(members::grant_member),
        )
        .route(
            "/{gallery_id}/members/{account_id}",
            delete(members::revoke_member),
        )
        .route_layer(from_fn_with_state((state.clone(), DEFAULT_LIMIT), rate_limit))
        .route_layer(from_fn_with_state(state.clone(), require_session))
}

fn collection_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/{collection_id}",
            get(collections::get_collection).delete(collections::delete_collection),
        )
        .route(
            "/{collection_id}/access/{access_key_id}",
            get(collections::get_private_collection),
        )
        .route_layer(from_fn_with_state((state.clone(), DEFAULT_LIMIT), rate_limit))
        .route_layer(from_fn_with_state(state.clone(), require_session))
}

fn access_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/{access_key}", get(access::get_gallery))
        .route(
            "/{access_key}/collection/{collection_id}",
            get(access::get_collection).post(access::add_to_collection),
        )
        .route(
            "/{access_key}/collection/{collection_id}/image/{image_id}",
            delete(access::remove_from_collection),
        )
        .route(
            "/{access_key}/image/{image_id}/download",
            get(access::download_image),
        )
        .route_layer(from_fn_with_state((state.clone(), DEFAULT_LIMIT), rate_limit))
}
