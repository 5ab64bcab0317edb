use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    App,
    error::AppError,
    models::user::{NewUser, User},
    store::StoreError,
    validation::ValidationErrors,
};

use super::AdminUser;

pub fn route() -> Router<App> {
    Router::<App>::new().route("/google/verify", post(handle_google_verify))
}

pub fn admin_route() -> Router<App> {
    Router::<App>::new().route("/profile", get(handle_profile))
}

#[derive(Deserialize)]
pub struct GoogleVerifyRequest {
    #[serde(default)]
    id_token: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

impl GoogleVerifyRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.id_token.trim().is_empty() {
            errors.add("id_token", "id_token is required");
        }
        if self.email.trim().is_empty() {
            errors.add("email", "email is required");
        }
        if self.name.trim().is_empty() {
            errors.add("name", "name is required");
        }
        errors.into_result()
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    token: String,
    user: User,
}

#[axum::debug_handler(state = App)]
pub async fn handle_google_verify(
    State(ctx): State<App>,
    crate::json::Json(req): crate::json::Json<GoogleVerifyRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    req.validate()?;

    let identity = ctx.id_tokens.verify(&req.id_token).await?;

    let user = match ctx.store.find_user_by_google_id(&identity.google_id).await? {
        Some(user) => user,
        None => {
            let new_user = NewUser {
                email: req.email.trim().to_owned(),
                name: req.name.trim().to_owned(),
                picture_url: req.picture.trim().to_owned(),
                google_id: identity.google_id.clone(),
            };

            match ctx.store.create_user(new_user).await {
                Ok(user) => {
                    tracing::info!(user_id = user.id, "Created user on first sign-in");
                    user
                }
                // lost a race against a parallel first sign-in
                Err(StoreError::UniqueViolation(_)) => ctx
                    .store
                    .find_user_by_google_id(&identity.google_id)
                    .await?
                    .ok_or("user vanished after a unique violation")?,
                Err(e) => return Err(e.into()),
            }
        }
    };

    let token = ctx
        .sessions
        .issue(user.id, &user.email)
        .map_err(|e| format!("couldn't sign session token: {e}"))?;

    Ok(Json(SessionResponse { token, user }))
}

pub async fn handle_profile(AdminUser(user): AdminUser) -> Json<User> {
    Json(user)
}
