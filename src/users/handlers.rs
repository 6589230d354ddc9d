use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{EmailQuery, EnabledQuery, UserRequest},
    model::{Role, User},
};
use crate::{
    auth::{jwt::AdminUser, password::hash_password},
    error::{AppError, Result},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/by-email", get(get_user_by_email))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/enabled", patch(set_enabled))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<User>>> {
    Ok(Json(state.users.get_all().await?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>> {
    state
        .users
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))
}

#[instrument(skip(state))]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<EmailQuery>,
) -> Result<Json<User>> {
    state
        .users
        .get_by_email(q.email.trim())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {}", q.email)))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<UserRequest>,
) -> Result<impl IntoResponse> {
    let req = payload.validate()?;
    let mut user = User::new(
        req.name,
        req.email,
        hash_password(&req.password)?,
        req.calories_per_day
            .unwrap_or(state.config.default_calories_per_day),
        req.roles.unwrap_or_else(|| [Role::User].into()),
    );
    user.enabled = req.enabled.unwrap_or(true);
    let user = state.users.save(user).await?;

    info!(admin_id = %admin.id, user_id = %user.id, "user created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/users/{}", user.id))],
        Json(user),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserRequest>,
) -> Result<StatusCode> {
    let req = payload.validate()?;
    let mut user = state
        .users
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    user.name = req.name;
    user.email = req.email;
    user.password_hash = hash_password(&req.password)?;
    if let Some(calories) = req.calories_per_day {
        user.calories_per_day = calories;
    }
    if let Some(roles) = req.roles {
        user.roles = roles;
    }
    if let Some(enabled) = req.enabled {
        user.enabled = enabled;
    }
    state.users.update(user).await?;

    info!(admin_id = %admin.id, user_id = %id, "user updated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.users.delete(id).await? {
        return Err(AppError::NotFound(format!("user {id}")));
    }
    let meals = state.meals.delete_all(id).await?;
    info!(admin_id = %admin.id, user_id = %id, meals, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn set_enabled(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Query(q): Query<EnabledQuery>,
) -> Result<StatusCode> {
    if !state.users.set_enabled(id, q.enabled).await? {
        return Err(AppError::NotFound(format!("user {id}")));
    }
    info!(admin_id = %admin.id, user_id = %id, enabled = q.enabled, "user enabled flag changed");
    Ok(StatusCode::NO_CONTENT)
}
