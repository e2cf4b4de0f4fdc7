//! Payload checks for the write endpoints. Every rule runs, so a single 400
//! response lists all problems grouped by field.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{CreatePollRequest, NewPoll, VoteRequest};

pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 300;
pub const PASSCODE_MAX: usize = 10;
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed timestamp: {0:?}")]
pub struct MalformedTimestamp(pub String);

/// Messages keyed by the offending field name.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Replaces this field's messages with `other`'s, field by field.
    fn override_with(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}

pub fn validate_create_poll(request: CreatePollRequest) -> Result<NewPoll, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = request.title.unwrap_or_default();
    if title.is_empty() {
        errors.add("title", "The title is required.");
    } else if title.chars().count() > TITLE_MAX {
        errors.add("title", format!("The title may not be longer than {TITLE_MAX} characters."));
    }

    if let Some(description) = &request.description {
        if description.chars().count() > DESCRIPTION_MAX {
            errors.add(
                "description",
                format!("The description may not be longer than {DESCRIPTION_MAX} characters."),
            );
        }
    }

    let expires_at = match request.expires_at.as_deref() {
        None => None,
        Some(raw) => match parse_timestamp(raw) {
            Ok(at) => Some(at),
            Err(e) => {
                errors.add("expires_at", format!("The expiry must be a valid date ({e})."));
                None
            }
        },
    };

    let options = request.options.unwrap_or_default();
    if options.len() < MIN_OPTIONS {
        errors.add("options", format!("At least {MIN_OPTIONS} options are required."));
    }
    if options.iter().any(String::is_empty) {
        errors.add("options", "Options may not be empty.");
    }

    if let Some(passcode) = &request.passcode {
        if passcode.chars().count() > PASSCODE_MAX {
            errors.add(
                "passcode",
                format!("The passcode may not be longer than {PASSCODE_MAX} characters."),
            );
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewPoll {
        title,
        description: request.description,
        expires_at,
        options,
        passcode: request.passcode,
    })
}

/// Reads a create-poll body. A field of the wrong JSON type is reported
/// under its own name rather than failing the whole body.
pub fn create_poll_from_json(body: Value) -> Result<NewPoll, ValidationErrors> {
    let mut fields = json_object(body)?;
    let mut type_errors = ValidationErrors::default();

    let request = CreatePollRequest {
        title: take_field(&mut fields, "title", &mut type_errors),
        description: take_field(&mut fields, "description", &mut type_errors),
        expires_at: take_field(&mut fields, "expires_at", &mut type_errors),
        options: take_field(&mut fields, "options", &mut type_errors),
        passcode: take_field(&mut fields, "passcode", &mut type_errors),
    };

    match validate_create_poll(request) {
        Ok(poll) if type_errors.is_empty() => Ok(poll),
        Ok(_) => Err(type_errors),
        Err(mut errors) => {
            errors.override_with(type_errors);
            Err(errors)
        }
    }
}

pub fn vote_from_json(body: Value) -> Result<i64, ValidationErrors> {
    let mut fields = json_object(body)?;
    let mut type_errors = ValidationErrors::default();

    let request = VoteRequest {
        poll_option_id: take_field(&mut fields, "poll_option_id", &mut type_errors),
    };

    if !type_errors.is_empty() {
        return Err(type_errors);
    }
    validate_vote(request)
}

fn json_object(body: Value) -> Result<Map<String, Value>, ValidationErrors> {
    match body {
        Value::Object(fields) => Ok(fields),
        _ => Err(ValidationErrors::single("body", "The request body must be a JSON object.")),
    }
}

// Missing and null both read as absent.
fn take_field<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    name: &str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    match fields.remove(name) {
        None | Some(Value::Null) => None,
        Some(value) => serde_json::from_value(value)
            .map_err(|e| errors.add(name, format!("The {name} field is invalid: {e}.")))
            .ok(),
    }
}

pub fn validate_vote(request: VoteRequest) -> Result<i64, ValidationErrors> {
    request
        .poll_option_id
        .ok_or_else(|| ValidationErrors::single("poll_option_id", "An option must be selected."))
}

/// Accepts RFC 3339, or a naive date / date-time read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, MalformedTimestamp> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| MalformedTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn request() -> CreatePollRequest {
        CreatePollRequest {
            title: Some("Lunch?".into()),
            description: None,
            expires_at: None,
            options: Some(vec!["Ramen".into(), "Curry".into()]),
            passcode: None,
        }
    }

    #[test]
    fn accepts_minimal_poll() {
        let poll = validate_create_poll(request()).unwrap();
        assert_eq!(poll.title, "Lunch?");
        assert_eq!(poll.options, vec!["Ramen", "Curry"]);
        assert!(poll.expires_at.is_none());
        assert!(poll.passcode.is_none());
    }

    #[test]
    fn reports_every_field() {
        let errors = validate_create_poll(CreatePollRequest {
            title: Some("x".repeat(101)),
            description: Some("d".repeat(301)),
            expires_at: Some("next tuesday".into()),
            options: Some(vec!["only".into()]),
            passcode: Some("12345678901".into()),
        })
        .unwrap_err();

        for field in ["title", "description", "expires_at", "options", "passcode"] {
            assert_eq!(errors.field(field).len(), 1, "{field}");
        }
    }

    #[test]
    fn missing_title_and_options() {
        let errors = validate_create_poll(CreatePollRequest::default()).unwrap_err();
        assert_eq!(errors.field("title"), ["The title is required."]);
        assert_eq!(errors.field("options"), ["At least 2 options are required."]);
    }

    #[test]
    fn empty_option_rejected() {
        let errors = validate_create_poll(CreatePollRequest {
            options: Some(vec!["A".into(), String::new()]),
            ..request()
        })
        .unwrap_err();
        assert_eq!(errors.field("options"), ["Options may not be empty."]);
    }

    #[test]
    fn limits_count_characters_not_bytes() {
        let poll = validate_create_poll(CreatePollRequest {
            title: Some("投".repeat(100)),
            passcode: Some("パスコード12345".into()),
            ..request()
        });
        assert!(poll.is_ok());
    }

    #[test]
    fn parses_supported_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-06-01T12:30:00Z"), Ok(expected));
        assert_eq!(parse_timestamp("2025-06-01T21:30:00+09:00"), Ok(expected));
        assert_eq!(parse_timestamp("2025-06-01T12:30:00"), Ok(expected));
        assert_eq!(parse_timestamp("2025-06-01 12:30:00"), Ok(expected));
        assert_eq!(
            parse_timestamp("2025-06-01"),
            Ok(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
        );
        assert!(parse_timestamp("2025-13-01").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn expiry_error_names_the_bad_value() {
        let errors = validate_create_poll(CreatePollRequest {
            expires_at: Some("next tuesday".into()),
            ..request()
        })
        .unwrap_err();
        assert!(errors.field("expires_at")[0].contains("next tuesday"));
    }

    #[test]
    fn wrong_typed_fields_are_reported_by_name() {
        let errors = create_poll_from_json(json!({
            "title": 5,
            "options": ["A", 2],
            "passcode": null
        }))
        .unwrap_err();

        assert_eq!(errors.field("title").len(), 1);
        assert!(errors.field("title")[0].starts_with("The title field is invalid"));
        assert_eq!(errors.field("options").len(), 1);
        assert!(errors.field("passcode").is_empty());
        assert!(errors.field("body").is_empty());
    }

    #[test]
    fn type_error_alone_still_rejects() {
        let errors = create_poll_from_json(json!({
            "title": "Lunch?",
            "options": ["A", "B"],
            "description": ["not", "a", "string"]
        }))
        .unwrap_err();
        assert_eq!(errors.field("description").len(), 1);
        assert_eq!(errors.field("title").len(), 0);
    }

    #[test]
    fn json_body_must_be_an_object() {
        let errors = create_poll_from_json(json!(["Lunch?"])).unwrap_err();
        assert_eq!(errors.field("body").len(), 1);
        assert_eq!(vote_from_json(json!(7)).unwrap_err().field("body").len(), 1);
    }

    #[test]
    fn reads_well_formed_json() {
        let poll = create_poll_from_json(json!({
            "title": "Lunch?",
            "description": null,
            "options": ["A", "B"],
            "expires_at": "2025-06-01"
        }))
        .unwrap();
        assert_eq!(poll.options, ["A", "B"]);
        assert!(poll.expires_at.is_some());

        assert_eq!(vote_from_json(json!({ "poll_option_id": 4 })), Ok(4));
        let errors = vote_from_json(json!({ "poll_option_id": "4" })).unwrap_err();
        assert_eq!(errors.field("poll_option_id").len(), 1);
    }

    #[test]
    fn vote_requires_option() {
        assert_eq!(validate_vote(VoteRequest { poll_option_id: Some(3) }), Ok(3));
        let errors = validate_vote(VoteRequest::default()).unwrap_err();
        assert_eq!(errors.field("poll_option_id").len(), 1);
    }
}
