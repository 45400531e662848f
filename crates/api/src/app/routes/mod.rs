use axum::Router;

pub mod auth;
pub mod bootcamps;
pub mod common;
pub mod courses;
pub mod reviews;
pub mod system;
pub mod users;

/// Router for every resource endpoint, relative to the API base path.
pub fn router(max_upload_bytes: usize) -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/bootcamps", bootcamps::router(max_upload_bytes))
        .nest("/courses", courses::router())
        .nest("/reviews", reviews::router())
        .nest("/users", users::router())
}
