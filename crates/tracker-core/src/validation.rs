//! Input validation for caller-supplied fields.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty value where one is required.
    Empty(String),
    /// Value too long.
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },
    /// Numeric value outside the accepted range.
    OutOfRange {
        field: String,
        min: u32,
        max: u32,
        actual: u32,
    },
    /// File name contains a path separator or other rejected character.
    InvalidFileName(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(f, "{} must be between {} and {}, got {}", field, min, max, actual),
            ValidationError::InvalidFileName(msg) => write!(f, "invalid file name: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for profile names.
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum allowed length for exchange notes.
pub const MAX_NOTES_LENGTH: usize = 2000;

/// Maximum allowed length for attachment file names.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Maximum allowed plan cadence, in days.
pub const MAX_CADENCE_DAYS: u32 = 365;

/// Validate a profile display name.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Empty("name".to_string()));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
            actual: name.len(),
        });
    }

    Ok(())
}

/// Validate a plan cadence. Must be a positive number of days, at most a year.
pub fn validate_cadence(days: u32) -> Result<(), ValidationError> {
    if days == 0 || days > MAX_CADENCE_DAYS {
        return Err(ValidationError::OutOfRange {
            field: "planCadenceDays".to_string(),
            min: 1,
            max: MAX_CADENCE_DAYS,
            actual: days,
        });
    }

    Ok(())
}

/// Validate exchange notes.
pub fn validate_notes(notes: &str) -> Result<(), ValidationError> {
    if notes.len() > MAX_NOTES_LENGTH {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LENGTH,
            actual: notes.len(),
        });
    }

    Ok(())
}

/// Validate an attachment file name.
pub fn validate_file_name(file_name: &str) -> Result<(), ValidationError> {
    let file_name = file_name.trim();

    if file_name.is_empty() {
        return Err(ValidationError::Empty("file name".to_string()));
    }

    if file_name.len() > MAX_FILE_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "file name".to_string(),
            max: MAX_FILE_NAME_LENGTH,
            actual: file_name.len(),
        });
    }

    if file_name.contains('/') || file_name.contains('\\') {
        return Err(ValidationError::InvalidFileName(
            "must not contain path separators".to_string(),
        ));
    }

    Ok(())
}
