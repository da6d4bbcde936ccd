use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Invalid policy: ACL '{acl}' entry {ace}: {reason}")]
    InvalidPolicy {
        acl: String,
        ace: usize,
        reason: String,
    },

    #[error("Unknown evaluator: {0}")]
    UnknownEvaluator(String),

    #[error("Evaluator '{attribute}' failed: {detail}")]
    EvaluatorFailure { attribute: String, detail: String },

    #[error("Duplicate evaluator: '{0}' is already registered")]
    DuplicateEvaluator(String),

    #[error("Invalid resource pattern: {0}")]
    InvalidPattern(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PolicyError {
    /// Build an `EvaluatorFailure` for the given attribute
    pub fn evaluator_failure(attribute: impl Into<String>, detail: impl Into<String>) -> Self {
        PolicyError::EvaluatorFailure {
            attribute: attribute.into(),
            detail: detail.into(),
        }
    }

    /// Build an `InvalidPolicy` for one ACE
    pub fn invalid_policy(acl: impl Into<String>, ace: usize, reason: impl Into<String>) -> Self {
        PolicyError::InvalidPolicy {
            acl: acl.into(),
            ace,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PolicyError>;
