//! Demo accounts and meals loaded into the in-memory store at start-up.

use anyhow::Context;
use time::macros::datetime;
use tracing::info;

use crate::auth::password::hash_password;
use crate::meals::model::Meal;
use crate::state::AppState;
use crate::users::model::{Role, User};

pub const USER_EMAIL: &str = "user@yandex.ru";
pub const USER_PASSWORD: &str = "password";
pub const ADMIN_EMAIL: &str = "admin@gmail.com";
pub const ADMIN_PASSWORD: &str = "admin";

pub fn user_meals() -> Vec<Meal> {
    vec![
        Meal::new(datetime!(2020-01-30 10:00), "Breakfast", 500),
        Meal::new(datetime!(2020-01-30 13:00), "Lunch", 1000),
        Meal::new(datetime!(2020-01-30 20:00), "Dinner", 500),
        Meal::new(datetime!(2020-01-31 0:00), "Food at the boundary", 100),
        Meal::new(datetime!(2020-01-31 10:00), "Breakfast", 1000),
        Meal::new(datetime!(2020-01-31 13:00), "Lunch", 500),
        Meal::new(datetime!(2020-01-31 20:00), "Dinner", 410),
    ]
}

pub fn admin_meals() -> Vec<Meal> {
    vec![
        Meal::new(datetime!(2020-01-31 14:00), "Admin lunch", 510),
        Meal::new(datetime!(2020-01-31 21:00), "Admin dinner", 1500),
    ]
}

pub async fn load(state: &AppState) -> anyhow::Result<()> {
    let calories = state.config.default_calories_per_day;
    let user = User::new(
        "User",
        USER_EMAIL,
        hash_password(USER_PASSWORD)?,
        calories,
        [Role::User],
    );
    let admin = User::new(
        "Admin",
        ADMIN_EMAIL,
        hash_password(ADMIN_PASSWORD)?,
        calories,
        [Role::User, Role::Admin],
    );

    for (owner, meals) in [(user, user_meals()), (admin, admin_meals())] {
        let owner = state
            .users
            .save(owner)
            .await
            .context("seed user")?;
        for meal in meals {
            state
                .meals
                .save(owner.id, meal)
                .await
                .context("seed meal")?;
        }
    }

    info!("demo users and meals loaded");
    Ok(())
}
