use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreatedMealResponse, FilterParams, JsonView, MealRequest, ViewParams},
    filter::{filtered_tos, get_tos, TimeWindow},
    model::{Meal, Timestamped, UiView},
};
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, Result},
    state::AppState,
    users::model::User,
};

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/filter", get(filter_meals))
        .route(
            "/meals/:id",
            get(get_meal).put(update_meal).delete(delete_meal),
        )
}

fn render_many<T: Serialize + Timestamped>(items: Vec<T>, view: JsonView) -> Response {
    match view {
        JsonView::Rest => Json(items).into_response(),
        JsonView::Ui => Json(items.into_iter().map(UiView::new).collect::<Vec<_>>()).into_response(),
    }
}

/// The token owner, which may have been deleted since the token was issued.
async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User> {
    state.users.get(auth.id).await?.ok_or_else(|| {
        warn!(user_id = %auth.id, "token of a deleted user");
        AppError::Auth("User not found".into())
    })
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ViewParams>,
) -> Result<Response> {
    let owner = current_user(&state, &user).await?;
    let meals = state.meals.get_all(owner.id).await?;
    let tos = get_tos(&meals, owner.calories_per_day)?;
    Ok(render_many(tos, params.view))
}

#[instrument(skip(state))]
pub async fn filter_meals(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<FilterParams>,
) -> Result<Response> {
    let filter = params.parse().map_err(|e| {
        warn!(error = %e, "bad meal filter");
        e
    })?;
    let window = TimeWindow::new(filter.start_time, filter.end_time)?;
    let owner = current_user(&state, &user).await?;

    let meals = state
        .meals
        .get_between_inclusive(owner.id, filter.start_date, filter.end_date)
        .await?;
    let tos = filtered_tos(&meals, window, owner.calories_per_day)?;
    Ok(render_many(tos, params.view))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<ViewParams>,
) -> Result<Response> {
    let owner = current_user(&state, &user).await?;
    let meal = state
        .meals
        .get(owner.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("meal {id}")))?;
    Ok(match params.view {
        JsonView::Rest => Json(meal).into_response(),
        JsonView::Ui => Json(UiView::new(meal)).into_response(),
    })
}

#[instrument(skip(state, body))]
pub async fn create_meal(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<MealRequest>,
) -> Result<impl IntoResponse> {
    let body = body.validate()?;
    let owner = current_user(&state, &user).await?;
    let meal = state
        .meals
        .save(
            owner.id,
            Meal::new(body.date_time, body.description, body.calories),
        )
        .await?;

    info!(user_id = %owner.id, meal_id = %meal.id, "meal created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/meals/{}", meal.id))],
        Json(CreatedMealResponse {
            id: meal.id,
            date_time: meal.date_time,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_meal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MealRequest>,
) -> Result<StatusCode> {
    let body = body.validate()?;
    let owner = current_user(&state, &user).await?;
    state
        .meals
        .update(
            owner.id,
            Meal::with_id(id, body.date_time, body.description, body.calories),
        )
        .await?;

    info!(user_id = %owner.id, meal_id = %id, "meal updated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let owner = current_user(&state, &user).await?;
    if !state.meals.delete(owner.id, id).await? {
        return Err(AppError::NotFound(format!("meal {id}")));
    }
    info!(user_id = %owner.id, meal_id = %id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}
