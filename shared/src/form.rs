use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AppError, ErrorKind};

/// Field name to message, one message per field. Empty means the form is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, String>);

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` for `field`, replacing an earlier message for the same field.
    pub fn set(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(value)` when no field failed, otherwise the collected errors.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

impl From<&FormErrors> for AppError {
    fn from(errors: &FormErrors) -> Self {
        let summary = errors
            .iter()
            .next()
            .map_or_else(|| "Invalid form".to_string(), |(_, m)| m.to_string());
        AppError::new(ErrorKind::Validation, summary).with_internal(errors.to_string())
    }
}
