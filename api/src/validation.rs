use std::collections::BTreeMap;

use axum::http::StatusCode;
use serde_json::Value;

use crate::error::ApiRequestError;

/// Field keyed input problems, reported together.
#[derive(thiserror::Error, Debug, Default, Clone, PartialEq)]
#[error("Validation failed")]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, msg: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| msg.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl ApiRequestError for ValidationErrors {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn code(&self) -> &'static str {
        "INVALID_INPUT"
    }

    fn details(&self) -> Option<Value> {
        serde_json::to_value(&self.0).ok()
    }
}

/// Length in characters, not bytes.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
