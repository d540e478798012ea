use thiserror::Error;

/// Rejected input at a type boundary (ticker, look-back, fund name, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(pub String);

impl InvalidArgument {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
