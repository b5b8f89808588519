use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Must connect to collection before {0}.")]
    NotConnected(String),

    #[error("Not supported filter condition: {0}")]
    UnsupportedFilterCondition(String),

    #[error("Not supported filter operator: {0}")]
    UnsupportedFilterOperator(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn missing_config(msg: impl Into<String>) -> Self {
        Self::MissingConfig(msg.into())
    }

    pub fn not_connected(action: impl Into<String>) -> Self {
        Self::NotConnected(action.into())
    }

    pub fn unsupported_condition(condition: impl Into<String>) -> Self {
        Self::UnsupportedFilterCondition(condition.into())
    }

    pub fn unsupported_operator(operator: impl Into<String>) -> Self {
        Self::UnsupportedFilterOperator(operator.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}
