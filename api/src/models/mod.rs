pub mod comment;
pub mod post;
pub mod site;
pub mod user;
