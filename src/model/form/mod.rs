//! Validation of user-submitted forms.
//!
//! Every form has a validator implementing [`Validate`], which either yields
//! the cleaned value or the full set of per-field errors.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

mod email;
pub mod petition;
pub mod registration;

pub use email::is_valid_email;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// A form that can be checked and cleaned into `Self::Valid`.
pub trait Validate {
    type Valid;

    fn validate(&self) -> Result<Self::Valid, FieldErrors>;
}

/// Error messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages raised against `field`, possibly none.
    pub fn for_field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// The `{field: [messages]}` shape returned by the JSON API.
    pub fn to_map(&self) -> BTreeMap<&'static str, Vec<String>> {
        self.0.clone()
    }

    /// `Ok(valid)` if no error was raised.
    pub fn or_valid<T>(self, valid: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(valid())
        } else {
            Err(self)
        }
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Trim a submitted value, recording an error if nothing is left.
pub fn required(errors: &mut FieldErrors, field: &'static str, value: Option<&str>) -> String {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
    value.to_string()
}

/// Like [`required`], additionally checking the value is an email address.
pub fn required_email(errors: &mut FieldErrors, field: &'static str, value: Option<&str>) -> String {
    let value = required(errors, field, value);
    if !value.is_empty() && !is_valid_email(&value) {
        errors.add(field, INVALID_EMAIL);
    }
    value
}
