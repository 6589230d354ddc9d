use std::collections::HashMap;

use async_trait::async_trait;
use time::{Date, PrimitiveDateTime, Time};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::filter::is_between_half_open;
use super::model::Meal;
use crate::error::{AppError, Result};

#[async_trait]
pub trait MealRepository: Send + Sync {
    /// Creates the meal, or replaces it when `user_id` already owns a meal with this id.
    async fn save(&self, user_id: Uuid, meal: Meal) -> Result<Meal>;
    /// Replaces a meal `user_id` already owns; `NotFound` otherwise.
    async fn update(&self, user_id: Uuid, meal: Meal) -> Result<Meal>;
    async fn delete(&self, user_id: Uuid, meal_id: Uuid) -> Result<bool>;
    async fn delete_all(&self, user_id: Uuid) -> Result<usize>;
    async fn get(&self, user_id: Uuid, meal_id: Uuid) -> Result<Option<Meal>>;
    /// Newest first.
    async fn get_all(&self, user_id: Uuid) -> Result<Vec<Meal>>;
    /// Meals dated within `[start_date, end_date]`, newest first.
    async fn get_between_inclusive(
        &self,
        user_id: Uuid,
        start_date: Option<Date>,
        end_date: Option<Date>,
    ) -> Result<Vec<Meal>>;
}

#[derive(Default)]
pub struct InMemoryMealRepository {
    // user id -> meal id -> meal
    meals: RwLock<HashMap<Uuid, HashMap<Uuid, Meal>>>,
}

impl InMemoryMealRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ensure_unique_time(user_meals: &HashMap<Uuid, Meal>, meal: &Meal) -> Result<()> {
    let duplicate = user_meals
        .values()
        .any(|m| m.id != meal.id && m.date_time == meal.date_time);
    if duplicate {
        return Err(AppError::Conflict(format!(
            "a meal at {} already exists",
            meal.date_time
        )));
    }
    Ok(())
}

fn newest_first(mut meals: Vec<Meal>) -> Vec<Meal> {
    meals.sort_by(|a, b| b.date_time.cmp(&a.date_time));
    meals
}

#[async_trait]
impl MealRepository for InMemoryMealRepository {
    async fn save(&self, user_id: Uuid, meal: Meal) -> Result<Meal> {
        let mut guard = self.meals.write().await;

        let owned_elsewhere = guard
            .iter()
            .any(|(owner, meals)| *owner != user_id && meals.contains_key(&meal.id));
        if owned_elsewhere {
            return Err(AppError::NotFound(format!("meal {}", meal.id)));
        }

        let user_meals = guard.entry(user_id).or_default();
        ensure_unique_time(user_meals, &meal)?;
        user_meals.insert(meal.id, meal.clone());
        Ok(meal)
    }

    async fn update(&self, user_id: Uuid, meal: Meal) -> Result<Meal> {
        let mut guard = self.meals.write().await;
        let user_meals = guard
            .get_mut(&user_id)
            .filter(|meals| meals.contains_key(&meal.id))
            .ok_or_else(|| AppError::NotFound(format!("meal {}", meal.id)))?;
        ensure_unique_time(user_meals, &meal)?;
        user_meals.insert(meal.id, meal.clone());
        Ok(meal)
    }

    async fn delete(&self, user_id: Uuid, meal_id: Uuid) -> Result<bool> {
        let mut guard = self.meals.write().await;
        Ok(guard
            .get_mut(&user_id)
            .and_then(|meals| meals.remove(&meal_id))
            .is_some())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<usize> {
        let mut guard = self.meals.write().await;
        Ok(guard.remove(&user_id).map_or(0, |meals| meals.len()))
    }

    async fn get(&self, user_id: Uuid, meal_id: Uuid) -> Result<Option<Meal>> {
        let guard = self.meals.read().await;
        Ok(guard
            .get(&user_id)
            .and_then(|meals| meals.get(&meal_id))
            .cloned())
    }

    async fn get_all(&self, user_id: Uuid) -> Result<Vec<Meal>> {
        self.get_between_inclusive(user_id, None, None).await
    }

    async fn get_between_inclusive(
        &self,
        user_id: Uuid,
        start_date: Option<Date>,
        end_date: Option<Date>,
    ) -> Result<Vec<Meal>> {
        let start = start_date.map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT));
        // Date::MAX has no next day; treat it as open.
        let end = end_date
            .and_then(|d| d.next_day())
            .map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT));

        let guard = self.meals.read().await;
        let meals = guard
            .get(&user_id)
            .map(|meals| {
                meals
                    .values()
                    .filter(|m| is_between_half_open(m.date_time, start, end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(newest_first(meals))
    }
}
