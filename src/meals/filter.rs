//! Per-day calorie threshold filter.
//!
//! Meals are first folded into per-date calorie sums, then the meals whose
//! time of day falls into a half-open window are projected into [`MealTo`]
//! carrying the flag for their date. Time filtering never affects the sums.

use std::collections::HashMap;

use thiserror::Error;
use time::{Date, Time};
use tracing::debug;

use super::model::{Meal, MealTo};

pub const DEFAULT_CALORIES_PER_DAY: i32 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Windows crossing midnight are not supported.
    #[error("invalid time window: start {start} is after end {end}")]
    InvertedWindow { start: Time, end: Time },
    #[error("invalid calories per day: {0} is negative")]
    NegativeCaloriesPerDay(i32),
}

/// `start <= value < end`; a missing bound leaves that side open.
pub fn is_between_half_open<T: PartialOrd>(value: T, start: Option<T>, end: Option<T>) -> bool {
    start.map_or(true, |s| value >= s) && end.map_or(true, |e| value < e)
}

/// Half-open time-of-day window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    start: Option<Time>,
    end: Option<Time>,
}

impl TimeWindow {
    pub const UNBOUNDED: Self = Self {
        start: None,
        end: None,
    };

    pub fn new(start: Option<Time>, end: Option<Time>) -> Result<Self, FilterError> {
        match (start, end) {
            (Some(start), Some(end)) => Self::between(start, end),
            _ => Ok(Self { start, end }),
        }
    }

    pub fn between(start: Time, end: Time) -> Result<Self, FilterError> {
        if start > end {
            return Err(FilterError::InvertedWindow { start, end });
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    pub fn contains(&self, time: Time) -> bool {
        is_between_half_open(time, self.start, self.end)
    }
}

pub fn calories_by_date(meals: &[Meal]) -> HashMap<Date, i64> {
    meals.iter().fold(HashMap::new(), |mut sums, meal| {
        *sums.entry(meal.date()).or_insert(0) += i64::from(meal.calories);
        sums
    })
}

/// Meals inside `window`, in input order, flagged with `excess` when the
/// calories of their whole date are strictly above `calories_per_day`.
pub fn filtered_tos(
    meals: &[Meal],
    window: TimeWindow,
    calories_per_day: i32,
) -> Result<Vec<MealTo>, FilterError> {
    if calories_per_day < 0 {
        return Err(FilterError::NegativeCaloriesPerDay(calories_per_day));
    }
    let threshold = i64::from(calories_per_day);
    let sums = calories_by_date(meals);

    let tos: Vec<MealTo> = meals
        .iter()
        .filter(|meal| window.contains(meal.time()))
        .map(|meal| {
            let excess = sums.get(&meal.date()).copied().unwrap_or_default() > threshold;
            MealTo::new(meal, excess)
        })
        .collect();

    debug!(
        total = meals.len(),
        returned = tos.len(),
        days = sums.len(),
        calories_per_day,
        "meals filtered"
    );
    Ok(tos)
}

pub fn get_tos(meals: &[Meal], calories_per_day: i32) -> Result<Vec<MealTo>, FilterError> {
    filtered_tos(meals, TimeWindow::UNBOUNDED, calories_per_day)
}
