//! Validated text primitives shared by the EHR crates.
//!
//! Patient names, external identifiers and free-text clinical fields all arrive as raw strings
//! from the gateway, the CLI or direct gRPC callers. These types make the trimming and length
//! rules explicit so every entry point applies them identically.

/// Why a piece of text was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// Nothing left after trimming.
    #[error("Text cannot be empty")]
    Empty,
    /// The trimmed input exceeded the permitted number of characters
    #[error("Text exceeds maximum length of {max} characters")]
    TooLong { max: usize },
}

/// Trimmed text with at least one character, such as a patient name or external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trims `input` and rejects it with [`TextError::Empty`] if nothing remains.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        match input.as_ref().trim() {
            "" => Err(TextError::Empty),
            trimmed => Ok(Self(trimmed.to_owned())),
        }
    }

    /// Creates a new `NonEmptyText` whose trimmed content is at most `max` characters long.
    ///
    /// Length is counted in Unicode scalar values, not bytes, so `"Zoë"` is three characters.
    pub fn bounded(input: impl AsRef<str>, max: usize) -> Result<Self, TextError> {
        let text = Self::new(input)?;
        if text.0.chars().count() > max {
            return Err(TextError::TooLong { max });
        }
        Ok(text)
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Checks that optional free text (which may be empty) stays within `max` characters.
pub fn check_max_len(input: &str, max: usize) -> Result<(), TextError> {
    if input.chars().count() > max {
        return Err(TextError::TooLong { max });
    }
    Ok(())
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
