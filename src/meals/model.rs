use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

time::serde::format_description!(
    pub(crate) local_date_time,
    PrimitiveDateTime,
    "[year]-[month]-[day]T[hour]:[minute]:[second]"
);
time::serde::format_description!(ui_date_time, PrimitiveDateTime, "[year]-[month]-[day] [hour]:[minute]");

/// A recorded meal. The owning user is tracked by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    #[serde(with = "local_date_time")]
    pub date_time: PrimitiveDateTime,
    pub description: String,
    pub calories: i32,
}

impl Meal {
    pub fn new(date_time: PrimitiveDateTime, description: impl Into<String>, calories: i32) -> Self {
        Self::with_id(Uuid::new_v4(), date_time, description, calories)
    }

    pub fn with_id(
        id: Uuid,
        date_time: PrimitiveDateTime,
        description: impl Into<String>,
        calories: i32,
    ) -> Self {
        Self {
            id,
            date_time,
            description: description.into(),
            calories,
        }
    }

    pub fn date(&self) -> Date {
        self.date_time.date()
    }

    pub fn time(&self) -> Time {
        self.date_time.time()
    }
}

/// A meal annotated with whether its day went over the calorie threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealTo {
    pub id: Uuid,
    #[serde(with = "local_date_time")]
    pub date_time: PrimitiveDateTime,
    pub description: String,
    pub calories: i32,
    pub excess: bool,
}

impl MealTo {
    pub fn new(meal: &Meal, excess: bool) -> Self {
        Self {
            id: meal.id,
            date_time: meal.date_time,
            description: meal.description.clone(),
            calories: meal.calories,
            excess,
        }
    }
}

pub trait Timestamped {
    fn date_time(&self) -> PrimitiveDateTime;
}

impl Timestamped for Meal {
    fn date_time(&self) -> PrimitiveDateTime {
        self.date_time
    }
}

impl Timestamped for MealTo {
    fn date_time(&self) -> PrimitiveDateTime {
        self.date_time
    }
}

/// UI rendering of a timestamped value: the regular fields plus `date_time_ui`.
#[derive(Debug, Serialize)]
pub struct UiView<T: Serialize> {
    #[serde(flatten)]
    pub inner: T,
    #[serde(serialize_with = "ui_date_time::serialize")]
    pub date_time_ui: PrimitiveDateTime,
}

impl<T: Serialize + Timestamped> UiView<T> {
    pub fn new(inner: T) -> Self {
        let date_time_ui = inner.date_time();
        Self { inner, date_time_ui }
    }
}
