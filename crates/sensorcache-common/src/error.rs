//! Error types for the content cache
//!
//! One error enum is shared by the store, the update actions and the
//! controller. Parallel batches and pipeline phases collect the failures of
//! their sub-tasks into [`Error::Aggregate`] instead of stopping at the first.

use thiserror::Error;

/// Common result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for cache operations
#[derive(Debug, Error)]
pub enum Error {
    // Data source errors
    #[error("data access error: {0}")]
    DataAccess(String),

    // Programming errors
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Startup errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("{} cache update(s) failed: [{}]", .0.len(), join_messages(.0))]
    Aggregate(Vec<Error>),
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a data access error
    pub fn data_access(msg: impl Into<String>) -> Self {
        Self::DataAccess(msg.into())
    }

    /// Create an invariant violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Turn a list of collected failures into a result.
    ///
    /// An empty list is success; anything else becomes [`Error::Aggregate`].
    pub fn from_errors(errors: Vec<Error>) -> Result<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Aggregate(errors))
        }
    }

    /// Flatten nested aggregates into the leaf errors they carry
    #[must_use]
    pub fn errors(&self) -> Vec<&Error> {
        match self {
            Self::Aggregate(inner) => inner.iter().flat_map(Error::errors).collect(),
            other => vec![other],
        }
    }

    /// Check if this error (or any error it aggregates) came from the data source
    #[must_use]
    pub fn is_data_access(&self) -> bool {
        self.errors()
            .iter()
            .any(|e| matches!(e, Self::DataAccess(_)))
    }

    /// Check if this error signals a programming error rather than a runtime failure
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
