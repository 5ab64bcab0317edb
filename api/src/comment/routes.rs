use axum::{
    Router,
    routing::{get, put},
};

use crate::App;

use super::{
    create::create_comment, delete::delete_comment, get::get_comments, patch::update_comment,
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route(
            "/posts/{slug}/comments",
            get(get_comments).post(create_comment),
        )
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
}
