use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("invalid input for {field}: {message}")]
    InvalidInput {
        field: String,
        message: String,
    },

    #[error("unknown loan type: {loan_type}")]
    UnknownType {
        loan_type: String,
    },

    #[error("apr unavailable: no root found after {iterations} iterations")]
    AprUnavailable {
        iterations: u32,
    },

    #[error("calculation error: {message}")]
    Calculation {
        message: String,
    },
}

impl LoanError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        LoanError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn calculation(message: impl Into<String>) -> Self {
        LoanError::Calculation {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
