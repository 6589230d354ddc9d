use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
    },
    error::{AppError, Result},
    state::AppState,
    users::{
        dto::{is_valid_email, normalize_email, UserRequest},
        model::{Role, User},
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).put(update_me).delete(delete_me))
}

fn issue_tokens(keys: &JwtKeys, user: &User) -> Result<AuthResponse> {
    let access_token = keys.sign_access(user.id, &user.roles)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let req = UserRequest {
        name: payload.name,
        email: payload.email,
        password: payload.password,
        calories_per_day: payload.calories_per_day,
        roles: None,
        enabled: None,
    }
    .validate()
    .map_err(|e| {
        warn!(error = %e, "registration rejected");
        e
    })?;

    let hash = hash_password(&req.password)?;
    let user = state
        .users
        .save(User::new(
            req.name,
            req.email,
            hash,
            req.calories_per_day
                .unwrap_or(state.config.default_calories_per_day),
            [Role::User],
        ))
        .await?;

    let response = issue_tokens(&JwtKeys::from_ref(&state), &user)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    let Some(user) = state.users.get_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Auth("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Auth("Invalid credentials".into()));
    }
    if !user.enabled {
        warn!(user_id = %user.id, "login of disabled user");
        return Err(AppError::Auth("User is disabled".into()));
    }

    let response = issue_tokens(&JwtKeys::from_ref(&state), &user)?;
    info!(user_id = %user.id, email = %user.email, admin = user.is_admin(), "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    // Roles are reloaded so the new access token reflects current grants.
    let user = state
        .users
        .get(claims.sub)
        .await?
        .filter(|u| u.enabled)
        .ok_or_else(|| AppError::Auth("User not found".into()))?;

    Ok(Json(issue_tokens(&keys, &user)?))
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> Result<Json<User>> {
    let user = state
        .users
        .get(user.id)
        .await?
        .ok_or_else(|| AppError::Auth("User not found".into()))?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UserRequest>,
) -> Result<StatusCode> {
    let req = payload.validate()?;
    let mut current = state
        .users
        .get(user.id)
        .await?
        .ok_or_else(|| AppError::Auth("User not found".into()))?;

    // Roles and the enabled flag are admin-only.
    current.name = req.name;
    current.email = req.email;
    current.password_hash = hash_password(&req.password)?;
    if let Some(calories) = req.calories_per_day {
        current.calories_per_day = calories;
    }
    state.users.update(current).await?;

    info!(user_id = %user.id, "profile updated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_me(State(state): State<AppState>, user: AuthUser) -> Result<StatusCode> {
    if !state.users.delete(user.id).await? {
        return Err(AppError::Auth("User not found".into()));
    }
    let meals = state.meals.delete_all(user.id).await?;
    info!(user_id = %user.id, meals, "profile deleted");
    Ok(StatusCode::NO_CONTENT)
}
