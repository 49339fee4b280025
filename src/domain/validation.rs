use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    InvalidIddCode { input: String },
    InvalidPhoneNumber { input: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::InvalidIddCode { input } => write!(f, "invalid IDD code: {input}"),
            Self::InvalidPhoneNumber { input } => write!(f, "invalid phone number: {input}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trim `value` and reject it when nothing is left.
pub(crate) fn non_empty(
    field: &'static str,
    value: impl Into<String>,
) -> Result<String, ValidationError> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_human_readable() {
        let err = ValidationError::Empty {
            field: "access_key_id",
        };
        assert_eq!(err.to_string(), "access_key_id must not be empty");

        let err = ValidationError::InvalidIddCode {
            input: "iddcode86".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid IDD code: iddcode86");

        let err = ValidationError::InvalidPhoneNumber {
            input: "bad".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid phone number: bad");
    }

    #[test]
    fn non_empty_trims_and_rejects_blank() {
        assert_eq!(non_empty("api_key", "  key ").unwrap(), "key");
        assert_eq!(
            non_empty("api_key", "   "),
            Err(ValidationError::Empty { field: "api_key" })
        );
    }
}
