//! Error types for the medals engine.

use crate::{CounterName, EntityId};
use thiserror::Error;

/// All possible errors from the medals engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("unknown counter: {0}")]
    UnknownCounter(CounterName),

    // Store invariants
    #[error("entity already exists: {0}")]
    DuplicateEntity(EntityId),

    #[error("entity {id} has an incomplete counter set: missing '{missing}'")]
    IncompleteCounters { id: EntityId, missing: CounterName },

    // Decoding
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    // Configuration
    #[error("invalid counter kinds: {0}")]
    InvalidCounterKinds(String),
}

impl Error {
    /// Whether this error only says the target is absent.
    ///
    /// Absent targets are expected when remote events race with local
    /// deletes and are never fatal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::EntityNotFound(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::EntityNotFound(7);
        assert_eq!(err.to_string(), "entity not found: 7");

        let err = Error::IncompleteCounters {
            id: 3,
            missing: "bronze".into(),
        };
        assert_eq!(
            err.to_string(),
            "entity 3 has an incomplete counter set: missing 'bronze'"
        );

        let err = Error::MalformedEvent("missing id".into());
        assert_eq!(err.to_string(), "malformed event: missing id");
    }

    #[test]
    fn not_found_is_benign() {
        assert!(Error::EntityNotFound(1).is_not_found());
        assert!(!Error::UnknownCounter("tin".into()).is_not_found());
    }
}
