//! Value objects shared by the aggregates.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Declares a validated, non-blank text value object.
///
/// The generated type serializes as a plain string and re-validates on decode.
macro_rules! text_value {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates the value, rejecting empty or blank text.
            pub fn new(value: impl Into<String>) -> Result<Self, $crate::error::ValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err($crate::error::ValidationError::Empty { field: $field });
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::error::ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

pub(crate) use text_value;

text_value!(
    /// Subject line of an issue.
    Subject,
    "subject"
);

text_value!(
    /// Text describing how an issue or a negligence report was resolved.
    Solution,
    "solution"
);

text_value!(
    /// Identifier of a physical drone.
    DroneId,
    "drone id"
);

/// Login name of a courier or maintainer.
///
/// Must be non-empty and may not contain digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: "username" });
        }
        if value.chars().any(|c| c.is_ascii_digit()) {
            return Err(ValidationError::UsernameHasDigits(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}
