use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::model::Role;
use crate::error::{AppError, Result};

pub const NAME_LEN: RangeInclusive<usize> = 2..=120;
pub const PASSWORD_LEN: RangeInclusive<usize> = 5..=128;
pub const CALORIES_PER_DAY: RangeInclusive<i32> = 10..=10000;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_password(password: &str) -> Result<()> {
    if !PASSWORD_LEN.contains(&password.chars().count()) {
        return Err(AppError::Validation(format!(
            "password must be {}..={} characters",
            PASSWORD_LEN.start(),
            PASSWORD_LEN.end()
        )));
    }
    Ok(())
}

/// Body of admin create/update and of profile updates. `password` is write-only.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub calories_per_day: Option<i32>,
    #[serde(default)]
    pub roles: Option<BTreeSet<Role>>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl UserRequest {
    pub fn validate(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);

        if !NAME_LEN.contains(&self.name.chars().count()) {
            return Err(AppError::Validation(format!(
                "name must be {}..={} characters",
                NAME_LEN.start(),
                NAME_LEN.end()
            )));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::Validation("Invalid email".into()));
        }
        validate_password(&self.password)?;
        if let Some(calories) = self.calories_per_day {
            if !CALORIES_PER_DAY.contains(&calories) {
                return Err(AppError::Validation(format!(
                    "calories_per_day must be in {}..={}",
                    CALORIES_PER_DAY.start(),
                    CALORIES_PER_DAY.end()
                )));
            }
        }
        if matches!(&self.roles, Some(roles) if roles.is_empty()) {
            return Err(AppError::Validation("roles must not be empty".into()));
        }
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct EnabledQuery {
    pub enabled: bool,
}
