use std::error::Error as StdError;

/// A store call that failed while the facade was serving an operation.
///
/// Covers anything the backend raises: lost connectivity, a malformed
/// query, a timeout. `operation` names what the facade was doing, e.g.
/// `"searching documents"`.
#[derive(Debug, thiserror::Error)]
#[error("error {operation}: {source}")]
pub struct StoreFailure {
    operation: &'static str,
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl StoreFailure {
    pub fn new(operation: &'static str, cause: anyhow::Error) -> Self {
        Self {
            operation,
            source: cause.into(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}
