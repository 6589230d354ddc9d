use std::sync::Arc;

use crate::config::AppConfig;
use crate::meals::repo::{InMemoryMealRepository, MealRepository};
use crate::seed;
use crate::users::repo::{InMemoryUserRepository, UserRepository};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub meals: Arc<dyn MealRepository>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let state = Self::in_memory(config);
        if state.config.seed_demo_data {
            seed::load(&state).await?;
        }
        Ok(state)
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(
            Arc::new(config),
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryMealRepository::new()),
        )
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepository>,
        meals: Arc<dyn MealRepository>,
    ) -> Self {
        Self {
            config,
            users,
            meals,
        }
    }

    #[cfg(test)]
    pub async fn fake() -> Self {
        let state = Self::in_memory(AppConfig::test());
        seed::load(&state).await.expect("seed demo data");
        state
    }
}
