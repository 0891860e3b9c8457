// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request schema validation.
//!
//! A [`Schema`] is a named, ordered list of field rules. Parsing never fails
//! with an error: violations come back as an ordered list of [`Issue`]s, one
//! per failed check, in field declaration order.

pub mod request;
pub mod routes;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::AppError;

pub use request::{AuthenticatedSession, RequestValidation, RequestValidator, ValidationInput};
pub use routes::{resolve, HttpMethod, RouteKey};

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_NAME_LENGTH: usize = 100;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
});

/// A single schema violation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Name of the offending field, empty for the input as a whole
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Outcome of parsing a value against a schema
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Success { data: Value },
    Failure { issues: Vec<Issue> },
}

impl ValidationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationResult::Success { .. })
    }

    /// Issues of a failed parse, empty on success
    pub fn issues(&self) -> &[Issue] {
        match self {
            ValidationResult::Success { .. } => &[],
            ValidationResult::Failure { issues } => issues,
        }
    }

    /// Turn a failure into [`AppError::SchemaValidation`]
    pub fn into_data(self) -> Result<Value, AppError> {
        match self {
            ValidationResult::Success { data } => Ok(data),
            ValidationResult::Failure { issues } => Err(AppError::SchemaValidation(issues)),
        }
    }

    /// Deserialize validated data into a typed payload
    pub fn parse_into<T: serde::de::DeserializeOwned>(self) -> Result<T, AppError> {
        Ok(serde_json::from_value(self.into_data()?)?)
    }
}

/// Constraint applied to a single string field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Email,
    Text { min: usize, max: usize },
    /// Length bounds plus at least one uppercase, one lowercase and one digit
    Password { min: usize, max: usize },
    /// Must equal the named field of the same input
    SameAs(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub rule: Rule,
}

impl FieldSpec {
    pub const fn required(name: &'static str, rule: Rule) -> Self {
        Self {
            name,
            required: true,
            rule,
        }
    }
}

/// Declarative object schema
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    name: &'static str,
    fields: &'static [FieldSpec],
}

/// Login credentials
pub static AUTHENTICATE_USER: Schema = Schema::object(
    "AuthenticateUser",
    &[
        FieldSpec::required("email", Rule::Email),
        FieldSpec::required(
            "password",
            Rule::Text {
                min: 1,
                max: MAX_PASSWORD_LENGTH,
            },
        ),
    ],
);

/// Registration form
pub static REGISTER_USER: Schema = Schema::object(
    "RegisterUser",
    &[
        FieldSpec::required("email", Rule::Email),
        FieldSpec::required(
            "name",
            Rule::Text {
                min: 1,
                max: MAX_NAME_LENGTH,
            },
        ),
        FieldSpec::required(
            "password",
            Rule::Password {
                min: MIN_PASSWORD_LENGTH,
                max: MAX_PASSWORD_LENGTH,
            },
        ),
        FieldSpec::required("confirm_password", Rule::SameAs("password")),
    ],
);

/// Accepts any object and keeps none of its keys
pub static EMPTY_OBJECT: Schema = Schema::object("EmptyObject", &[]);

impl Schema {
    pub const fn object(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { name, fields }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse `input` against this schema.
    ///
    /// On success the data holds exactly the declared fields that were present,
    /// with their values untouched. Unknown keys are stripped.
    pub fn safe_parse(&self, input: &Value) -> ValidationResult {
        let Some(object) = input.as_object() else {
            return ValidationResult::Failure {
                issues: vec![Issue::new(
                    "",
                    format!("Expected object, received {}", type_name(input)),
                )],
            };
        };

        let mut issues = Vec::new();
        let mut data = Map::new();

        for field in self.fields {
            match object.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        issues.push(Issue::new(field.name, "Required"));
                    }
                },
                Some(Value::String(value)) => {
                    let failed = check_rule(field.rule, value, object);
                    if failed.is_empty() {
                        data.insert(field.name.to_string(), Value::String(value.clone()));
                    }
                    issues.extend(failed.into_iter().map(|message| Issue::new(field.name, message)));
                },
                Some(other) => issues.push(Issue::new(
                    field.name,
                    format!("Expected string, received {}", type_name(other)),
                )),
            }
        }

        if issues.is_empty() {
            ValidationResult::Success {
                data: Value::Object(data),
            }
        } else {
            ValidationResult::Failure { issues }
        }
    }
}

/// Every failed check of `rule`, in check order
fn check_rule(rule: Rule, value: &str, object: &Map<String, Value>) -> Vec<String> {
    match rule {
        Rule::Email => {
            if value.len() > MAX_EMAIL_LENGTH || !EMAIL_REGEX.is_match(value) {
                vec!["Invalid email".to_string()]
            } else {
                Vec::new()
            }
        },
        Rule::Text { min, max } => check_length(value, min, max).into_iter().collect(),
        Rule::Password { min, max } => {
            let has_uppercase = value.chars().any(char::is_uppercase);
            let has_lowercase = value.chars().any(char::is_lowercase);
            let has_digit = value.chars().any(|c| c.is_ascii_digit());
            let complexity = (!(has_uppercase && has_lowercase && has_digit)).then(|| {
                "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                    .to_string()
            });
            check_length(value, min, max).into_iter().chain(complexity).collect()
        },
        Rule::SameAs(other) => match object.get(other).and_then(Value::as_str) {
            Some(expected) if expected == value => Vec::new(),
            _ => vec![format!("Must match {other}")],
        },
    }
}

fn check_length(value: &str, min: usize, max: usize) -> Option<String> {
    let len = value.chars().count();
    if len < min {
        Some(format!("String must contain at least {min} character(s)"))
    } else if len > max {
        Some(format!("String must contain at most {max} character(s)"))
    } else {
        None
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
