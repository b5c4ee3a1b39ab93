//! Error types for map construction and transient editing.
//!
//! Lookups and removals of absent keys are not errors: they are ordinary
//! results (`None`, or an unchanged map). The errors here are reported by the
//! operations that refuse to proceed:
//!
//! - [`DuplicateKeyError`]: an insertion that must not overwrite an existing key
//! - [`StaleTransientError`]: a transient used after it has been finalized
//! - [`MalformedInputError`]: bulk construction from unpaired keys and values
//!
//! [`LeanMapError`] unifies the three and is what every fallible API returns.

use std::fmt;

/// Represents an attempt to insert a key that is already present.
///
/// Returned by the "insert only if absent" operations and by duplicate-checked
/// bulk construction. A plain `insert` never produces this error.
///
/// # Examples
///
/// ```rust
/// use leanmap::DuplicateKeyError;
///
/// let error = DuplicateKeyError {
///     operation: "LeanMap::try_insert",
/// };
/// assert_eq!(format!("{error}"), "LeanMap::try_insert: key already present");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateKeyError {
    /// The operation that rejected the key.
    pub operation: &'static str,
}

impl fmt::Display for DuplicateKeyError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: key already present", self.operation)
    }
}

impl std::error::Error for DuplicateKeyError {}

/// Represents a call on a transient map after it was finalized.
///
/// Finalizing retires the transient's edit token. From then on the nodes it
/// built belong to a published map, and the handle refuses every operation.
///
/// # Examples
///
/// ```rust
/// use leanmap::StaleTransientError;
///
/// let error = StaleTransientError {
///     operation: "TransientLeanMap::insert",
/// };
/// assert_eq!(
///     format!("{error}"),
///     "TransientLeanMap::insert: transient used after finalize"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleTransientError {
    /// The operation that was attempted on the stale handle.
    pub operation: &'static str,
}

impl fmt::Display for StaleTransientError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}: transient used after finalize",
            self.operation
        )
    }
}

impl std::error::Error for StaleTransientError {}

/// Represents bulk input in which keys and values do not pair up.
///
/// `keys` and `values` record how many of each were supplied; for a flat
/// alternating sequence `values` is one short of `keys`.
///
/// # Examples
///
/// ```rust
/// use leanmap::MalformedInputError;
///
/// let error = MalformedInputError {
///     operation: "LeanMap::from_flat",
///     keys: 2,
///     values: 1,
/// };
/// assert_eq!(
///     format!("{error}"),
///     "LeanMap::from_flat: 2 keys but 1 values"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedInputError {
    /// The constructor that received the input.
    pub operation: &'static str,
    /// Number of keys supplied.
    pub keys: usize,
    /// Number of values supplied.
    pub values: usize,
}

impl fmt::Display for MalformedInputError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}: {} keys but {} values",
            self.operation, self.keys, self.values
        )
    }
}

impl std::error::Error for MalformedInputError {}

/// Errors reported by [`LeanMap`](crate::LeanMap) and
/// [`TransientLeanMap`](crate::TransientLeanMap).
///
/// # Examples
///
/// ```rust
/// use leanmap::{LeanMap, LeanMapError};
///
/// let map = LeanMap::new().insert("a", 1);
/// let error = map.try_insert("a", 2).unwrap_err();
/// assert!(matches!(error, LeanMapError::DuplicateKey(_)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeanMapError {
    /// The key was already present.
    DuplicateKey(DuplicateKeyError),
    /// The transient was already finalized.
    StaleTransient(StaleTransientError),
    /// Keys and values did not pair up.
    MalformedInput(MalformedInputError),
}

impl fmt::Display for LeanMapError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(error) => write!(formatter, "{error}"),
            Self::StaleTransient(error) => write!(formatter, "{error}"),
            Self::MalformedInput(error) => write!(formatter, "{error}"),
        }
    }
}

impl std::error::Error for LeanMapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DuplicateKey(error) => Some(error),
            Self::StaleTransient(error) => Some(error),
            Self::MalformedInput(error) => Some(error),
        }
    }
}

impl From<DuplicateKeyError> for LeanMapError {
    fn from(error: DuplicateKeyError) -> Self {
        Self::DuplicateKey(error)
    }
}

impl From<StaleTransientError> for LeanMapError {
    fn from(error: StaleTransientError) -> Self {
        Self::StaleTransient(error)
    }
}

impl From<MalformedInputError> for LeanMapError {
    fn from(error: MalformedInputError) -> Self {
        Self::MalformedInput(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::error::Error;

    #[rstest]
    fn test_duplicate_key_error_display() {
        let error = DuplicateKeyError {
            operation: "LeanMap::try_insert",
        };
        assert_eq!(format!("{error}"), "LeanMap::try_insert: key already present");
    }

    #[rstest]
    fn test_stale_transient_error_display() {
        let error = StaleTransientError {
            operation: "TransientLeanMap::remove",
        };
        assert_eq!(
            format!("{error}"),
            "TransientLeanMap::remove: transient used after finalize"
        );
    }

    #[rstest]
    fn test_malformed_input_error_display() {
        let error = MalformedInputError {
            operation: "LeanMap::from_keys_and_values",
            keys: 3,
            values: 2,
        };
        assert_eq!(
            format!("{error}"),
            "LeanMap::from_keys_and_values: 3 keys but 2 values"
        );
    }

    #[rstest]
    #[case(LeanMapError::from(DuplicateKeyError { operation: "op" }), "op: key already present")]
    #[case(
        LeanMapError::from(StaleTransientError { operation: "op" }),
        "op: transient used after finalize"
    )]
    #[case(
        LeanMapError::from(MalformedInputError { operation: "op", keys: 1, values: 0 }),
        "op: 1 keys but 0 values"
    )]
    fn test_lean_map_error_display_delegates(#[case] error: LeanMapError, #[case] expected: &str) {
        assert_eq!(format!("{error}"), expected);
    }

    #[rstest]
    fn test_lean_map_error_source_is_the_wrapped_error() {
        let error = LeanMapError::from(StaleTransientError {
            operation: "TransientLeanMap::len",
        });
        let source = error.source().map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("TransientLeanMap::len: transient used after finalize")
        );
    }

    #[rstest]
    fn test_wrapped_errors_have_no_source() {
        let error = DuplicateKeyError { operation: "op" };
        assert!(error.source().is_none());
    }

    #[rstest]
    fn test_lean_map_error_equality() {
        let first = LeanMapError::from(DuplicateKeyError { operation: "op" });
        let second = LeanMapError::from(DuplicateKeyError { operation: "op" });
        let third = LeanMapError::from(StaleTransientError { operation: "op" });
        assert_eq!(first, second);
        assert_ne!(first, third);
    }
}
