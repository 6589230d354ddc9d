use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date, PrimitiveDateTime, Time};

use super::model::local_date_time;
use crate::error::{AppError, Result};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const TIME_WITH_SECONDS_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

pub const DESCRIPTION_LEN: std::ops::RangeInclusive<usize> = 2..=120;
pub const CALORIES: std::ops::RangeInclusive<i32> = 10..=5000;

#[derive(Debug, Deserialize)]
pub struct MealRequest {
    #[serde(with = "local_date_time")]
    pub date_time: PrimitiveDateTime,
    pub description: String,
    pub calories: i32,
}

impl MealRequest {
    /// Trims the description and checks field ranges.
    pub fn validate(mut self) -> Result<Self> {
        self.description = self.description.trim().to_string();
        let len = self.description.chars().count();
        if !DESCRIPTION_LEN.contains(&len) {
            return Err(AppError::Validation(format!(
                "description must be {}..={} characters",
                DESCRIPTION_LEN.start(),
                DESCRIPTION_LEN.end()
            )));
        }
        if !CALORIES.contains(&self.calories) {
            return Err(AppError::Validation(format!(
                "calories must be in {}..={}",
                CALORIES.start(),
                CALORIES.end()
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedMealResponse {
    pub id: uuid::Uuid,
    #[serde(with = "local_date_time")]
    pub date_time: PrimitiveDateTime,
}

/// JSON rendering selected with `?view=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonView {
    #[default]
    Rest,
    Ui,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    #[serde(default)]
    pub view: JsonView,
}

/// Raw `/meals/filter` query. Blank values mean "unbounded".
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub view: JsonView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFilter {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub start_time: Option<Time>,
    pub end_time: Option<Time>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(name: &str, value: &Option<String>) -> Result<Option<Date>> {
    non_blank(value)
        .map(|s| {
            Date::parse(s, DATE_FORMAT)
                .map_err(|_| AppError::Validation(format!("{name} must be YYYY-MM-DD")))
        })
        .transpose()
}

fn parse_time(name: &str, value: &Option<String>) -> Result<Option<Time>> {
    non_blank(value)
        .map(|s| {
            Time::parse(s, TIME_FORMAT)
                .or_else(|_| Time::parse(s, TIME_WITH_SECONDS_FORMAT))
                .map_err(|_| AppError::Validation(format!("{name} must be HH:MM")))
        })
        .transpose()
}

impl FilterParams {
    pub fn parse(&self) -> Result<ParsedFilter> {
        let parsed = ParsedFilter {
            start_date: parse_date("start_date", &self.start_date)?,
            end_date: parse_date("end_date", &self.end_date)?,
            start_time: parse_time("start_time", &self.start_time)?,
            end_time: parse_time("end_time", &self.end_time)?,
        };
        if let (Some(start), Some(end)) = (parsed.start_date, parsed.end_date) {
            if start > end {
                return Err(AppError::Validation(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        Ok(parsed)
    }
}
