use axum::{Router, routing::get};

use crate::App;

use super::{
    content::{list_post_comments, list_site_posts},
    sites::{
        create_site, delete_site, get_site, get_site_stats, list_site_members, list_sites,
        update_site,
    },
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/sites", get(list_sites).post(create_site))
        .route(
            "/sites/{id}",
            get(get_site).put(update_site).delete(delete_site),
        )
        .route("/sites/{id}/stats", get(get_site_stats))
        .route("/sites/{id}/members", get(list_site_members))
        .route("/sites/{id}/posts", get(list_site_posts))
        .route(
            "/sites/{id}/posts/{post_id}/comments",
            get(list_post_comments),
        )
}
