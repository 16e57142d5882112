//! Request-body validation.
//!
//! Handlers take `ValidatedJson<T>` instead of `Json<T>`: the body is deserialized, then
//! checked by `T::validate`, and any failure becomes a 400 with a field-level error map.

use std::collections::BTreeMap;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::errors::AppError;

pub const MAX_SHORT_TEXT: usize = 200;
pub const MAX_URL: usize = 2048;
pub const MAX_LONG_TEXT: usize = 20_000;

/// Field name → list of messages, serialized as a plain JSON object.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }

    /// Non-blank, at most `max` characters.
    pub fn required(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.add(field, "is required");
        } else {
            self.max_len(field, value, max);
        }
    }

    pub fn optional(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.max_len(field, value, max);
        }
    }

    pub fn optional_url(&mut self, field: &str, value: Option<&str>) {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            self.add(field, "must be an http(s) URL");
        }
        self.max_len(field, value, MAX_URL);
    }

    pub fn optional_email(&mut self, field: &str, value: Option<&str>) {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
        if !valid {
            self.add(field, "must be a valid email address");
        }
        self.max_len(field, value, MAX_SHORT_TEXT);
    }

    fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
    }
}

/// Implemented by every request body that has rules beyond its serde shape.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

/// `Json<T>` followed by `T::validate()`. Rejections never escape as non-JSON responses.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// `Path<T>` whose rejection is the JSON 400 envelope rather than axum's plain text.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParams<T>(pub T);

/// `Query<T>` with the same JSON 400 rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// Lets PATCH bodies tell "field omitted" (`None`) apart from "field set to null" (`Some(None)`).
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Empty or whitespace-only strings are stored as NULL.
pub fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
