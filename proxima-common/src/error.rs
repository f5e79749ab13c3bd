//! Error types shared by the Proxima crates.

use thiserror::Error;

/// Result type alias using the Proxima error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Proxima.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid input, such as a malformed ticker symbol
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = Error::InvalidInput("empty ticker symbol".into());
        assert_eq!(err.to_string(), "Invalid input: empty ticker symbol");
    }
}
