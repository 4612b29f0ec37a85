// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side argument validation errors.
//!
//! These are returned before any HTTP request is made. The outer error is
//! built with [`invalid_argument`], the reason with one of the helpers below.

use std::fmt;
use thiserror::Error;

/// An error returned when validating arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ArgumentError(String);

impl ArgumentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Short type name used in messages, without the module path.
fn type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// `invalid argument '<name>' [<type>]: <reason>`
pub fn invalid_argument<T: ?Sized>(name: &str, _obj: &T, inner: ArgumentError) -> ArgumentError {
    ArgumentError(format!(
        "invalid argument '{name}' [{}]: {inner}",
        type_name::<T>()
    ))
}

pub fn empty_value(value: impl fmt::Display) -> ArgumentError {
    ArgumentError(format!("empty value '{value}'"))
}

pub fn invalid_value(value: impl fmt::Display) -> ArgumentError {
    ArgumentError(format!("invalid value '{value}'"))
}

pub fn missing_field<T: ?Sized>(_obj: &T, field: &str) -> ArgumentError {
    ArgumentError(format!(
        "missing field [{field}] in [{}]",
        type_name::<T>()
    ))
}

pub fn invalid_field_value<T: ?Sized>(
    _obj: &T,
    field: &str,
    value: impl fmt::Display,
) -> ArgumentError {
    ArgumentError(format!(
        "invalid value '{value}' for field [{field}] in [{}]",
        type_name::<T>()
    ))
}

pub fn missing_one_of_fields<T: ?Sized>(_obj: &T, fields: &[&str]) -> ArgumentError {
    ArgumentError(format!(
        "missing one of fields [{}] in [{}]",
        fields.join(", "),
        type_name::<T>()
    ))
}

pub fn mutually_exclusive_fields<T: ?Sized>(_obj: &T, fields: &[&str]) -> ArgumentError {
    ArgumentError(format!(
        "found mutually exclusive fields [{}] in [{}]",
        fields.join(", "),
        type_name::<T>()
    ))
}

pub fn missing_required_together_fields<T: ?Sized>(_obj: &T, fields: &[&str]) -> ArgumentError {
    ArgumentError(format!(
        "missing required together fields [{}] in [{}]",
        fields.join(", "),
        type_name::<T>()
    ))
}
