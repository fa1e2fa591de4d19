//! Shared validation helpers for inbound HTTP adapters.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::domain::Error;
use crate::domain::ports::PageRequest;

/// Validation error codes carried in `details.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidId,
    InvalidTimestamp,
    InvalidField,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidId => "invalid_id",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidField => "invalid_field",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: Option<&str>) -> Error {
    let mut details = json!({ "field": field.as_str(), "code": code.as_str() });
    if let Some(value) = value {
        details["value"] = json!(value);
    }
    Error::invalid_request(message).with_details(details)
}

/// Parse a path or body identifier, reporting the offending value.
pub(crate) fn parse_id<T>(value: &str, field: FieldName) -> Result<T, Error>
where
    T: FromStr,
{
    value.parse().map_err(|_| {
        field_error(
            field,
            format!("Invalid {}: {value}", field.as_str()),
            ErrorCode::InvalidId,
            Some(value),
        )
    })
}

pub(crate) fn parse_optional_id<T>(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<T>, Error>
where
    T: FromStr,
{
    value.map(|raw| parse_id(raw, field)).transpose()
}

pub(crate) fn parse_rfc3339_timestamp(
    value: &str,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| {
            field_error(
                field,
                format!("{} must be an RFC 3339 timestamp", field.as_str()),
                ErrorCode::InvalidTimestamp,
                Some(value),
            )
        })
}

/// Wrap a domain validation failure, keeping its message.
pub(crate) fn invalid_field(field: FieldName, err: impl Display) -> Error {
    field_error(field, err.to_string(), ErrorCode::InvalidField, None)
}

/// Convert a JSON integer into a bounded unsigned field.
pub(crate) fn non_negative(value: i64, field: FieldName) -> Result<u32, Error> {
    u32::try_from(value).map_err(|_| {
        field_error(
            field,
            format!("{} must be a non-negative number", field.as_str()),
            ErrorCode::InvalidField,
            Some(&value.to_string()),
        )
    })
}

/// `?page=&limit=` query shared by list endpoints.
#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number; defaults to 1.
    pub page: Option<u32>,
    /// Page size; defaults to and is capped at 100.
    pub limit: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        PageRequest::new(query.page, query.limit)
    }
}
