//! Error types for the Neritic buffer core.

use thiserror::Error;

/// Main error type for buffer operations.
///
/// All variants are programming errors at this layer: they are surfaced to
/// the immediate caller and never retried or logged internally. Entries
/// aging out of the buffer is not an error; `expire` returns them as a
/// normal result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// `top` or `pop` was called on a sub-buffer holding no entries
    #[error("sub-buffer is empty")]
    EmptyBuffer,

    /// No sub-buffer is eligible for selection: every one is either empty
    /// or still inside its blackout interval
    #[error("no sub-buffer is eligible for selection")]
    NothingAvailable,

    /// An operation referenced a sub-buffer name that was never created
    #[error("unknown sub-buffer: {name}")]
    UnknownSubBuffer {
        /// The name the caller supplied
        name: String,
    },

    /// A configuration failed validation at create or merge time
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What rule the configuration violated
        reason: String,
    },
}

/// Result type alias for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings_name_the_offender() {
        let err = BufferError::UnknownSubBuffer { name: "ctd".to_string() };
        assert_eq!(err.to_string(), "unknown sub-buffer: ctd");

        let err = BufferError::InvalidConfig { reason: "ttl must be positive".to_string() };
        assert!(err.to_string().contains("ttl must be positive"));
    }

    #[test]
    fn errors_are_comparable() {
        assert_eq!(BufferError::EmptyBuffer, BufferError::EmptyBuffer);
        assert_ne!(BufferError::EmptyBuffer, BufferError::NothingAvailable);
    }
}
